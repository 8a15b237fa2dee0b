//! Exit codes for the CLI.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// Any failure
pub const FAILURE: u8 = 1;

/// Stopped by SIGINT/SIGTERM (128 + SIGINT)
pub const INTERRUPTED: u8 = 130;

/// Returned when a shutdown signal arrived while a command ran.
#[derive(Debug, thiserror::Error)]
#[error("interrupted by signal")]
pub struct Interrupted;

/// Exit code for an error, looking through its context chain.
pub fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.chain().any(|cause| cause.downcast_ref::<Interrupted>().is_some()) {
        INTERRUPTED
    } else {
        FAILURE
    }
}
