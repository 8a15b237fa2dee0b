#![deny(unsafe_code)]

// Use mimalloc for reduced allocation latency (enabled by default).
// Disable with `--no-default-features` if debugging allocator issues.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;
mod config;
mod exit_code;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ostore_bench::signal;
use ostore_core::EngineContext;
use ostore_core::context::log_directives;
use ostore_core::engine::EngineConfig;
use tracing_subscriber::EnvFilter;

use crate::commands::{CommandContext, bench, create, delete, list, read, write};
use crate::config::Config;
use crate::exit_code::{Interrupted, categorize_error};

/// Create, use and benchmark object stores
#[derive(Parser)]
#[command(name = "ostore")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Run the default benchmark matrix
    ostore

    # Quick benchmark with percentiles and a JSON copy of the results
    ostore --sizes 4K,64K,1M --iterations 20 --percentiles --json results.json

    # Store and fetch an object
    ostore create mystore
    echo hello | ostore write mystore greeting
    ostore read mystore greeting
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Directory holding the stores [default: ~/ostore_images]
    #[arg(long, value_name = "DIR", env = "OSTORE_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Configuration file [default: ~/.config/ostore/config.toml]
    #[arg(long, value_name = "FILE", env = "OSTORE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    bench: bench::Args,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new store
    Create(create::Args),

    /// Write stdin to an object
    Write(write::Args),

    /// Write an object's content to stdout
    Read(read::Args),

    /// Delete an object
    Delete(delete::Args),

    /// List the objects in a store
    List(list::Args),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let _ = e.print();
            let code = if e.use_stderr() { exit_code::FAILURE } else { exit_code::SUCCESS };
            return ExitCode::from(code);
        }
    };
    let quiet = cli.quiet;

    match run(&cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            if !quiet {
                eprintln!("error: {e:#}");
            }
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Installed before anything is mounted so a signal ends the command
    // through its normal teardown instead of killing the process.
    signal::install_signal_handler().context("Failed to install signal handlers")?;

    let config = Config::load(cli.config.as_deref())?;
    setup_tracing(cli.verbose, cli.quiet, &config.engine);

    let root = config.resolve_root(cli.root.as_deref())?;
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create store root {}", root.display()))?;
    tracing::debug!(root = %root.display(), "Using store root");

    let engine_ctx = EngineContext::init(config.engine.clone());
    let ctx = CommandContext {
        root,
        config,
        engine: engine_ctx.engine(),
    };

    let result = match &cli.command {
        None => bench::execute(&ctx, &cli.bench),
        Some(Commands::Create(args)) => create::execute(&ctx, args, cli.quiet),
        Some(Commands::Write(args)) => write::execute(&ctx, args),
        Some(Commands::Read(args)) => read::execute(&ctx, args),
        Some(Commands::Delete(args)) => delete::execute(&ctx, args),
        Some(Commands::List(args)) => list::execute(&ctx, args),
    };

    drop(ctx);
    engine_ctx.shutdown();
    result?;

    if signal::shutdown_requested() {
        return Err(Interrupted.into());
    }
    Ok(())
}

fn setup_tracing(verbose: u8, quiet: bool, engine: &EngineConfig) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = vec![level.to_string()];
        directives.extend(log_directives(engine));
        EnvFilter::new(directives.join(","))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
