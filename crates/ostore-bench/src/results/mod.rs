//! Results processing and output.
//!
//! - `stats`: percentile, mean and throughput over timing samples
//! - `report`: fixed-width table printed after (and during) a run
//! - `live`: progress bar while a size is measured
//! - `export`: JSON document for further analysis

pub mod export;
pub mod live;
pub mod report;
pub mod stats;

pub use export::{JsonReport, export_json};
pub use live::LiveProgress;
pub use report::{ReportFormatter, format_size};
pub use stats::{
    LatencySummary, MetricSummary, OperationKind, TimingSample, mean, percentile, summarize, throughput_mbps,
};
