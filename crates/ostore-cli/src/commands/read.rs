use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{CommandContext, with_client};

#[derive(ClapArgs)]
pub struct Args {
    /// Store name
    pub name: String,

    /// Object name
    pub object: String,
}

#[instrument(level = "info", name = "cmd::read", skip_all, fields(store = %args.name, object = %args.object))]
pub fn execute(ctx: &CommandContext, args: &Args) -> Result<()> {
    let store = ctx.store(&args.name)?;

    let content = with_client(store, |client| {
        client
            .read_all(&args.object)
            .with_context(|| format!("Failed to read object '{}'", args.object))
    })?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;
    Ok(())
}
