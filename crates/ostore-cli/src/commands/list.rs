use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{CommandContext, with_client};

#[derive(ClapArgs)]
pub struct Args {
    /// Store name
    pub name: String,
}

/// Print one object name per line, sorted.
#[instrument(level = "info", name = "cmd::list", skip_all, fields(store = %args.name))]
pub fn execute(ctx: &CommandContext, args: &Args) -> Result<()> {
    let store = ctx.store(&args.name)?;

    let mut names = with_client(store, |client| {
        client
            .list()
            .with_context(|| format!("Failed to list objects in '{}'", args.name))
    })?;
    names.sort();

    let mut stdout = io::stdout().lock();
    for name in names {
        writeln!(stdout, "{name}")?;
    }
    stdout.flush()?;
    Ok(())
}
