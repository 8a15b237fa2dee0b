//! Benchmark mode: runs when no subcommand is given.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use ostore_bench::config::{DEFAULT_ITERATIONS, DEFAULT_SIZES, parse_sizes};
use ostore_bench::{BenchmarkConfig, BenchmarkDriver, BenchmarkReport, PayloadPattern, ReportFormatter, export_json};
use ostore_core::{ObjectClient, ObjectStore};
use tracing::instrument;

use super::{CommandContext, finish};
use crate::exit_code::Interrupted;

#[derive(ClapArgs, Debug, Default)]
pub struct Args {
    /// Store used for the run; removed and recreated first
    #[arg(long, value_name = "NAME", default_value = "bench_test")]
    pub store: String,

    /// Object sizes in bytes, comma separated (K and M suffixes accepted)
    #[arg(long, value_name = "LIST")]
    pub sizes: Option<String>,

    /// Iterations per object size
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub iterations: Option<u32>,

    /// Add P50/P95/P99 latency columns
    #[arg(long)]
    pub percentiles: bool,

    /// Check that every read returns the written payload
    #[arg(long)]
    pub verify: bool,

    /// Payload pattern: fill[:<char>] or random[:<seed>]
    #[arg(long, value_name = "PATTERN")]
    pub payload: Option<PayloadPattern>,

    /// Also write results as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Disable the live progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Force colored output
    #[arg(long, overrides_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long, overrides_with = "color")]
    pub no_color: bool,
}

impl Args {
    /// Merge flags over the `[bench]` section of the config file.
    pub fn benchmark_config(&self, ctx: &CommandContext) -> Result<BenchmarkConfig> {
        let defaults = &ctx.config.bench;

        let sizes = match &self.sizes {
            Some(list) => parse_sizes(list).with_context(|| format!("Invalid --sizes '{list}'"))?,
            None => defaults.sizes.clone().unwrap_or_else(|| DEFAULT_SIZES.to_vec()),
        };
        if sizes.iter().any(|&size| size == 0) {
            anyhow::bail!("Object sizes must be greater than zero");
        }

        let iterations = match self.iterations {
            Some(n) => n as usize,
            None => defaults.iterations.unwrap_or(DEFAULT_ITERATIONS),
        };
        if iterations == 0 {
            anyhow::bail!("Iterations must be at least 1");
        }

        Ok(BenchmarkConfig {
            sizes,
            iterations,
            payload: self.payload.or(defaults.payload).unwrap_or_default(),
            verify: self.verify,
            progress: !self.no_progress,
        })
    }

    /// `--color` / `--no-color`, else color only on a terminal without `NO_COLOR`.
    pub fn use_color(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

#[instrument(level = "info", name = "cmd::bench", skip_all, fields(store = %args.store))]
pub fn execute(ctx: &CommandContext, args: &Args) -> Result<()> {
    let config = args.benchmark_config(ctx)?;
    let color = args.use_color();

    let path = ctx.store_path(&args.store)?;
    ObjectStore::destroy(&path)
        .with_context(|| format!("Failed to remove previous benchmark store at {}", path.display()))?;

    let store_config = ctx.config.store.clone().with_block_size(ctx.config.bench.block_size);
    let mut store = ObjectStore::new(&path, store_config, ctx.engine());
    if let Err(e) = store.create() {
        let result = Err(e).with_context(|| format!("Failed to create benchmark store at {}", path.display()));
        return finish(result, &mut store, &path);
    }

    tracing::info!(
        sizes = ?config.sizes,
        iterations = config.iterations,
        payload = %config.payload,
        "Starting benchmark"
    );

    let formatter = ReportFormatter::new(args.percentiles, color);
    let driver = BenchmarkDriver::new(config.clone()).with_color(color);
    let mut client = ObjectClient::new(store);

    let result = run_and_print(&driver, &formatter, &mut client, &mut io::stdout().lock());
    let report = finish(result, client.store_mut(), &path)?;

    if let Some(json_path) = &args.json {
        export_json(&report, &config, json_path)?;
        tracing::info!(path = %json_path.display(), "Results exported");
    }

    if report.is_complete() {
        tracing::info!(sizes = report.outcomes.len(), "All object sizes fully measured");
    }
    for outcome in report.failed_outcomes() {
        match &outcome.failure {
            Some(failure) if !outcome.is_failed() => tracing::warn!(
                size = outcome.size,
                measured = outcome.read_samples.len(),
                "Object size only partially measured: {failure}"
            ),
            _ => tracing::warn!(size = outcome.size, "No successful operations for object size"),
        }
    }

    if report.interrupted {
        return Err(Interrupted.into());
    }
    Ok(())
}

/// Print banner and header, one row per finished size, then the footer.
fn run_and_print<W: Write>(
    driver: &BenchmarkDriver,
    formatter: &ReportFormatter,
    client: &mut ObjectClient,
    out: &mut W,
) -> Result<BenchmarkReport> {
    write!(out, "{}", formatter.banner(driver.config().iterations))?;
    write!(out, "{}", formatter.header())?;
    write!(out, "{}", formatter.separator())?;
    out.flush()?;

    let mut write_error = None;
    let report = driver.run(client, |outcome| {
        if write_error.is_none() {
            let row = formatter.row(outcome);
            if let Err(e) = out.write_all(row.as_bytes()).and_then(|()| out.flush()) {
                write_error = Some(e);
            }
        }
    });
    if let Some(e) = write_error {
        return Err(e).context("Failed to write report");
    }

    write!(out, "{}", formatter.footer(&report))?;
    out.flush()?;
    Ok(report)
}
