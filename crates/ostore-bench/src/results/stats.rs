//! Statistics computation for benchmark samples.
//!
//! Samples are elapsed microseconds as `f64`. Every function returns `None`
//! for an empty input instead of dividing by zero.

// Sample counts and ranks are converted between usize and f64 throughout.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use serde::Serialize;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Kind of timed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Write,
    Read,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Write => "Write",
            Self::Read => "Read",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One successful, timed operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingSample {
    pub kind: OperationKind,
    /// Object size in bytes.
    pub size: usize,
    pub elapsed_us: f64,
}

impl TimingSample {
    pub fn new(kind: OperationKind, size: usize, elapsed: Duration) -> Self {
        Self {
            kind,
            size,
            elapsed_us: elapsed.as_secs_f64() * MICROS_PER_SEC,
        }
    }
}

/// Latency and throughput of one (operation, size) bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub sample_count: usize,
    pub mean_us: f64,
    pub std_dev_us: f64,
    pub min_us: f64,
    pub max_us: f64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    /// MB/s (1 MB = 1,048,576 bytes) derived from the mean latency.
    pub throughput_mbps: f64,
}

/// Summary of a bucket; `NoData` when nothing succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricSummary {
    NoData,
    Measured(LatencySummary),
}

impl MetricSummary {
    pub fn measured(&self) -> Option<&LatencySummary> {
        match self {
            Self::Measured(summary) => Some(summary),
            Self::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Arithmetic mean.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    let mean = mean(samples)?;
    let variance = samples
        .iter()
        .map(|&s| {
            let diff = s - mean;
            diff * diff
        })
        .sum::<f64>()
        / samples.len() as f64;
    Some(variance.sqrt())
}

/// Nearest-rank percentile: sorted ascending, index `floor(p/100 * N)`
/// clamped to `[0, N-1]`. No interpolation.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = ((p.max(0.0) / 100.0) * sorted.len() as f64).floor() as usize;
    Some(sorted[rank.min(sorted.len() - 1)])
}

/// MB/s for moving `size` bytes in `mean_us` microseconds.
///
/// A zero mean (below timer resolution) gives `f64::INFINITY`.
pub fn throughput_mbps(size: usize, mean_us: f64) -> f64 {
    if mean_us <= 0.0 {
        return f64::INFINITY;
    }
    (size as f64 / BYTES_PER_MB) / (mean_us / MICROS_PER_SEC)
}

/// Summarize the samples of one bucket of objects of `size` bytes.
pub fn summarize(size: usize, samples: &[f64]) -> MetricSummary {
    let (Some(mean_us), Some(std_dev_us)) = (mean(samples), std_dev(samples)) else {
        return MetricSummary::NoData;
    };

    let min_us = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max_us = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let rank = |p| percentile(samples, p).unwrap_or(mean_us);

    MetricSummary::Measured(LatencySummary {
        sample_count: samples.len(),
        mean_us,
        std_dev_us,
        min_us,
        max_us,
        p50_us: rank(50.0),
        p95_us: rank(95.0),
        p99_us: rank(99.0),
        throughput_mbps: throughput_mbps(size, mean_us),
    })
}
