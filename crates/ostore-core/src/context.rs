//! Process-scoped engine context.
//!
//! Created once in `main` with [`EngineContext::init`] and closed with
//! [`EngineContext::shutdown`]. Stores receive the engine explicitly instead
//! of reaching for global state.

use crate::engine::{EngineConfig, SledEngine, StorageEngine};
use std::sync::Arc;
use std::time::Instant;

/// Owns the engine configuration and the engine instance for one process.
pub struct EngineContext {
    config: EngineConfig,
    engine: Arc<dyn StorageEngine>,
    started: Instant,
}

impl EngineContext {
    /// Build the reference engine from `config`.
    pub fn init(config: EngineConfig) -> Self {
        let engine: Arc<dyn StorageEngine> = Arc::new(SledEngine::new(config.clone()));
        Self::with_engine(config, engine)
    }

    /// Use a caller-supplied engine (tests, alternative engines).
    pub fn with_engine(config: EngineConfig, engine: Arc<dyn StorageEngine>) -> Self {
        tracing::debug!(engine = engine.name(), ?config, "Engine context initialised");
        Self {
            config,
            engine,
            started: Instant::now(),
        }
    }

    pub fn engine(&self) -> Arc<dyn StorageEngine> {
        Arc::clone(&self.engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `tracing` filter directives for the engine's internal crates.
    ///
    /// The engine is silent unless engine debugging was asked for.
    pub fn log_directives(&self) -> Vec<String> {
        log_directives(&self.config)
    }

    /// Close the context. Stores created from it must already be torn down.
    pub fn shutdown(self) {
        tracing::debug!(
            engine = self.engine.name(),
            uptime_ms = self.started.elapsed().as_millis(),
            "Engine context shut down"
        );
    }
}

/// Directives for `config` without building a context (logging is set up first).
pub fn log_directives(config: &EngineConfig) -> Vec<String> {
    if config.debug {
        vec!["sled=debug".to_string()]
    } else {
        vec!["sled=off".to_string()]
    }
}
