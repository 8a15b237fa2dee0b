//! Benchmark execution and per-size results.

mod driver;

pub use driver::BenchmarkDriver;

use crate::results::stats::{MetricSummary, OperationKind, TimingSample, summarize};
use serde::Serialize;

/// Name of the object written in iteration `iteration` of size `size`.
pub fn object_name(size: usize, iteration: usize) -> String {
    format!("obj_{size}_{iteration}")
}

/// The operation that ended a size early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeFailure {
    pub kind: OperationKind,
    pub iteration: usize,
    pub message: String,
    /// Engine error code, when the failure came from the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl std::fmt::Display for SizeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed at iteration {}: {}", self.kind, self.iteration, self.message)
    }
}

/// Samples collected for one object size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeOutcome {
    pub size: usize,
    /// Write latencies in microseconds, in iteration order.
    pub write_samples: Vec<f64>,
    /// Read latencies in microseconds, in iteration order.
    pub read_samples: Vec<f64>,
    pub failure: Option<SizeFailure>,
}

impl SizeOutcome {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            write_samples: Vec::new(),
            read_samples: Vec::new(),
            failure: None,
        }
    }

    /// Add a sample to the bucket of its operation kind.
    pub fn record(&mut self, sample: TimingSample) {
        debug_assert_eq!(sample.size, self.size);
        match sample.kind {
            OperationKind::Write => self.write_samples.push(sample.elapsed_us),
            OperationKind::Read => self.read_samples.push(sample.elapsed_us),
        }
    }

    pub fn samples(&self, kind: OperationKind) -> &[f64] {
        match kind {
            OperationKind::Write => &self.write_samples,
            OperationKind::Read => &self.read_samples,
        }
    }

    pub fn write_summary(&self) -> MetricSummary {
        summarize(self.size, &self.write_samples)
    }

    pub fn read_summary(&self) -> MetricSummary {
        summarize(self.size, &self.read_samples)
    }

    /// True unless at least one write and one read succeeded.
    pub fn is_failed(&self) -> bool {
        self.write_samples.is_empty() || self.read_samples.is_empty()
    }

    /// A failed operation ended this size before all iterations ran.
    pub fn was_aborted(&self) -> bool {
        self.failure.is_some()
    }
}

/// Result of a full benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    /// One entry per size that was started, in configuration order.
    pub outcomes: Vec<SizeOutcome>,
    pub iterations: usize,
    /// A shutdown signal stopped the run early.
    pub interrupted: bool,
}

impl BenchmarkReport {
    /// Sizes with no measurements or cut short by a failed operation.
    pub fn failed_outcomes(&self) -> impl Iterator<Item = &SizeOutcome> + '_ {
        self.outcomes.iter().filter(|o| o.is_failed() || o.was_aborted())
    }

    /// Every size ran all its iterations and the run was not interrupted.
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.outcomes.iter().all(|o| !o.is_failed() && !o.was_aborted())
    }
}
