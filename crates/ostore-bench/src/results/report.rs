//! Fixed-width tabular report.
//!
//! ```text
//! Size          Write (us)   Write (MB/s)   Read (us)    Read (MB/s)
//! ----------------------------------------------------------------------
//! 4 KB               85.31          45.79       12.04         324.42
//! 16 KB              FAILED — no successful operations
//! ```

use crate::bench::{BenchmarkReport, SizeOutcome};
use crate::results::stats::LatencySummary;
use owo_colors::OwoColorize;
use std::fmt::Write as _;

const BANNER_WIDTH: usize = 90;
const SEPARATOR_WIDTH: usize = 142;
const TITLE: &str = "Object Store Performance Benchmark";

const SIZE_WIDTH: usize = 12;
const LATENCY_WIDTH: usize = 12;
const THROUGHPUT_WIDTH: usize = 15;
const PERCENTILE_WIDTH: usize = 12;

/// Human-readable size with integer truncation: `B` below 1024, `KB` below
/// 1 MiB, `MB` otherwise.
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{} MB", bytes / MB)
    }
}

/// Renders benchmark results as a fixed-width table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFormatter {
    /// Add P50/P95/P99 columns after each mean latency.
    pub percentiles: bool,
    pub color: bool,
}

impl ReportFormatter {
    pub fn new(percentiles: bool, color: bool) -> Self {
        Self { percentiles, color }
    }

    pub fn banner(&self, iterations: usize) -> String {
        let rule = "=".repeat(BANNER_WIDTH);
        let title = format!("{:>width$}", TITLE, width = TITLE.len() + 11);
        let title = if self.color {
            title.bold().to_string()
        } else {
            title
        };
        format!("\n{rule}\n{title}\n{rule}\n\nIterations per size: {iterations}\n\n")
    }

    pub fn header(&self) -> String {
        let mut line = format!("{:<SIZE_WIDTH$}", "Size");
        for op in ["Write", "Read"] {
            let _ = write!(line, "{:>LATENCY_WIDTH$}", format!("{op} (us)"));
            if self.percentiles {
                for p in ["P50", "P95", "P99"] {
                    let _ = write!(line, "{p:>PERCENTILE_WIDTH$}");
                }
            }
            let _ = write!(line, "{:>THROUGHPUT_WIDTH$}", format!("{op} (MB/s)"));
        }
        line.push('\n');
        line
    }

    pub fn separator(&self) -> String {
        let mut line = "-".repeat(SEPARATOR_WIDTH);
        line.push('\n');
        line
    }

    /// One row for a size, or a FAILED row when it has no complete sample pair.
    pub fn row(&self, outcome: &SizeOutcome) -> String {
        let size = format!("{:<SIZE_WIDTH$}", format_size(outcome.size));

        let write = outcome.write_summary();
        let read = outcome.read_summary();
        let (Some(write), Some(read)) = (write.measured(), read.measured()) else {
            let failed = "FAILED — no successful operations";
            return if self.color {
                format!("{size} {}\n", failed.red())
            } else {
                format!("{size} {failed}\n")
            };
        };

        let mut line = size;
        self.push_group(&mut line, write);
        self.push_group(&mut line, read);
        line.push('\n');
        line
    }

    fn push_group(&self, line: &mut String, summary: &LatencySummary) {
        let _ = write!(line, "{:>LATENCY_WIDTH$.2}", summary.mean_us);
        if self.percentiles {
            for value in [summary.p50_us, summary.p95_us, summary.p99_us] {
                let _ = write!(line, "{value:>PERCENTILE_WIDTH$.2}");
            }
        }
        let _ = write!(line, "{:>THROUGHPUT_WIDTH$.2}", summary.throughput_mbps);
    }

    pub fn footer(&self, report: &BenchmarkReport) -> String {
        let message = if report.interrupted {
            "Benchmark interrupted."
        } else {
            "Benchmarks completed successfully."
        };
        format!("{}\n{message}\n\n", self.separator())
    }

    /// The whole report: banner, header, one row per size, footer.
    pub fn render(&self, report: &BenchmarkReport) -> String {
        let mut out = self.banner(report.iterations);
        out.push_str(&self.header());
        out.push_str(&self.separator());
        for outcome in &report.outcomes {
            out.push_str(&self.row(outcome));
        }
        out.push_str(&self.footer(report));
        out
    }
}
