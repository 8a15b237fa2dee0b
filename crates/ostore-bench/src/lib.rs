//! Write/read latency and throughput benchmark for ostore object stores.
//!
//! For each object size the driver writes `iterations` distinct objects, reads
//! each back immediately, and summarizes the timings per size:
//!
//! ```no_run
//! use ostore_bench::{BenchmarkConfig, BenchmarkDriver, ReportFormatter};
//! # fn run(client: &mut ostore_core::ObjectClient) {
//! let config = BenchmarkConfig { sizes: vec![4096, 16384], iterations: 3, ..Default::default() };
//! let report = BenchmarkDriver::new(config).run(client, |_| {});
//! print!("{}", ReportFormatter::default().render(&report));
//! # }
//! ```

pub mod bench;
pub mod config;
pub mod results;
pub mod signal;

pub use bench::{BenchmarkDriver, BenchmarkReport, SizeFailure, SizeOutcome, object_name};
pub use config::{BenchmarkConfig, ConfigError, PayloadPattern};
pub use results::{ReportFormatter, export_json};
