//! Benchmark execution driver.

use crate::bench::{BenchmarkReport, SizeFailure, SizeOutcome, object_name};
use crate::config::BenchmarkConfig;
use crate::results::LiveProgress;
use crate::results::stats::{OperationKind, TimingSample};
use crate::signal;
use ostore_core::{ObjectClient, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Runs the (size x iteration) matrix against one client.
///
/// Strictly sequential: each write and read completes before the next starts,
/// so samples measure solo-operation cost. A failure ends only the current
/// size; the next size starts fresh.
pub struct BenchmarkDriver {
    config: BenchmarkConfig,
    color: bool,
    stop: Arc<AtomicBool>,
}

impl BenchmarkDriver {
    /// Driver that stops on the process shutdown signal.
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            color: false,
            stop: signal::shutdown_flag(),
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Replace the stop flag (tests, embedding).
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Run every configured size in order. `on_size` is called once per
    /// finished size, before the next one starts.
    pub fn run<F>(&self, client: &mut ObjectClient, mut on_size: F) -> BenchmarkReport
    where
        F: FnMut(&SizeOutcome),
    {
        tracing::info!(
            total = self.config.total_iterations(),
            "Running {} sizes x {} iterations ({} payload)",
            self.config.sizes.len(),
            self.config.iterations,
            self.config.payload
        );

        let mut outcomes = Vec::with_capacity(self.config.sizes.len());
        let mut interrupted = false;

        for &size in &self.config.sizes {
            if self.should_stop() {
                interrupted = true;
                break;
            }

            let (outcome, stopped) = self.run_size(client, size);
            on_size(&outcome);
            outcomes.push(outcome);

            if stopped {
                interrupted = true;
                break;
            }
        }

        if interrupted {
            tracing::warn!("Benchmark interrupted after {} sizes", outcomes.len());
        }

        BenchmarkReport {
            outcomes,
            iterations: self.config.iterations,
            interrupted,
        }
    }

    /// Measure one size. Returns the outcome and whether a stop was requested.
    fn run_size(&self, client: &mut ObjectClient, size: usize) -> (SizeOutcome, bool) {
        let iterations = self.config.iterations;
        let payload = self.config.payload.generate(size);
        let mut outcome = SizeOutcome::new(size);
        let mut progress = LiveProgress::new(size, iterations, self.config.progress, self.color);
        let mut stopped = false;

        for i in 0..iterations {
            if self.should_stop() {
                stopped = true;
                break;
            }

            let name = object_name(size, i);
            let data = payload.clone();

            let start = Instant::now();
            let written = client.write(&name, data);
            let write_elapsed = start.elapsed();

            if let Err(e) = written {
                progress.suspend(|| report_failure(OperationKind::Write, size, i, &e.to_string()));
                outcome.failure = Some(failure(OperationKind::Write, i, &e));
                break;
            }
            outcome.record(TimingSample::new(OperationKind::Write, size, write_elapsed));

            let start = Instant::now();
            let read = client.read(&name, size as u64);
            let read_elapsed = start.elapsed();

            let failed = match read {
                Ok(data) if self.config.verify && data != payload => Some(SizeFailure {
                    kind: OperationKind::Read,
                    iteration: i,
                    message: format!("read returned {} bytes that do not match the payload", data.len()),
                    code: None,
                }),
                Ok(_) => None,
                Err(e) => Some(failure(OperationKind::Read, i, &e)),
            };
            if let Some(failed) = failed {
                progress.suspend(|| report_failure(OperationKind::Read, size, i, &failed.message));
                outcome.failure = Some(failed);
                break;
            }
            outcome.record(TimingSample::new(OperationKind::Read, size, read_elapsed));

            progress.tick(write_elapsed + read_elapsed);
        }

        let estimate: Duration = progress.finish();
        tracing::debug!(
            size,
            writes = outcome.write_samples.len(),
            reads = outcome.read_samples.len(),
            last_estimate_us = estimate.as_micros(),
            "Size finished"
        );

        (outcome, stopped)
    }
}

fn failure(kind: OperationKind, iteration: usize, error: &StoreError) -> SizeFailure {
    SizeFailure {
        kind,
        iteration,
        message: error.to_string(),
        code: error.code(),
    }
}

fn report_failure(kind: OperationKind, size: usize, iteration: usize, message: &str) {
    tracing::error!("{kind} failed for object size {size}, iteration {iteration}: {message}");
}
