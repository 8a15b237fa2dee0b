//! Signal handling using signal-hook.
//!
//! Graceful shutdown with double Ctrl+C support:
//! - First signal: sets the shutdown flag; the driver stops between iterations
//! - Second signal: immediate process exit. Nothing is torn down; the store
//!   keeps whatever the engine last committed and mounts again normally.
//!
//! Handles SIGINT, SIGTERM and SIGHUP.

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[cfg(unix)]
use signal_hook::consts::signal::SIGHUP;

static SHUTDOWN: OnceLock<Arc<AtomicBool>> = OnceLock::new();

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Process-wide shutdown flag set by the signal handler.
pub fn shutdown_flag() -> Arc<AtomicBool> {
    Arc::clone(SHUTDOWN.get_or_init(|| Arc::new(AtomicBool::new(false))))
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn install_signal_handler() -> Result<(), std::io::Error> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let shutdown = shutdown_flag();

    for &sig in TERM_SIGNALS {
        // Registered first so it sees the flag before the second handler sets it
        flag::register_conditional_shutdown(sig, 1, Arc::clone(&shutdown))?;
        flag::register(sig, Arc::clone(&shutdown))?;
    }

    #[cfg(unix)]
    {
        flag::register_conditional_shutdown(SIGHUP, 1, Arc::clone(&shutdown))?;
        flag::register(SIGHUP, Arc::clone(&shutdown))?;
    }

    tracing::debug!("Signal handlers installed");
    Ok(())
}

/// Check if shutdown was requested.
pub fn shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::SeqCst)
}

/// Clear the shutdown flag.
pub fn clear_shutdown() {
    shutdown_flag().store(false, Ordering::SeqCst);
}
