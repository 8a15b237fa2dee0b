//! JSON export of benchmark results.

use crate::bench::{BenchmarkReport, SizeFailure};
use crate::config::BenchmarkConfig;
use crate::results::report::format_size;
use crate::results::stats::MetricSummary;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

/// JSON document written by [`export_json`].
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub metadata: ReportMetadata,
    pub results: Vec<SizeResultJson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub platform: String,
    pub ostore_version: String,
    pub iterations: usize,
    pub payload: String,
    pub verify: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub interrupted: bool,
}

/// One object size.
#[derive(Debug, Clone, Serialize)]
pub struct SizeResultJson {
    pub size_bytes: usize,
    pub size: String,
    pub write_count: usize,
    pub read_count: usize,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SizeFailure>,
    pub write: MetricSummary,
    pub read: MetricSummary,
    pub raw_write_us: Vec<f64>,
    pub raw_read_us: Vec<f64>,
}

impl JsonReport {
    pub fn new(report: &BenchmarkReport, config: &BenchmarkConfig) -> Self {
        let results = report
            .outcomes
            .iter()
            .map(|outcome| SizeResultJson {
                size_bytes: outcome.size,
                size: format_size(outcome.size),
                write_count: outcome.write_samples.len(),
                read_count: outcome.read_samples.len(),
                failed: outcome.is_failed(),
                failure: outcome.failure.clone(),
                write: outcome.write_summary(),
                read: outcome.read_summary(),
                raw_write_us: outcome.write_samples.clone(),
                raw_read_us: outcome.read_samples.clone(),
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                timestamp: chrono::Utc::now().to_rfc3339(),
                platform: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
                ostore_version: env!("CARGO_PKG_VERSION").to_string(),
                iterations: report.iterations,
                payload: config.payload.to_string(),
                verify: config.verify,
                interrupted: report.interrupted,
            },
            results,
        }
    }
}

/// Write `report` to `path` as pretty-printed JSON.
pub fn export_json(report: &BenchmarkReport, config: &BenchmarkConfig, path: &Path) -> anyhow::Result<()> {
    let document = JsonReport::new(report, config);
    let json = serde_json::to_string_pretty(&document).context("Failed to serialize benchmark results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Results exported to {}", path.display());
    Ok(())
}
