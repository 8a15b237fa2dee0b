use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use super::{CommandContext, finish};

#[derive(ClapArgs)]
pub struct Args {
    /// Name of the new store (a directory under the root)
    pub name: String,
}

#[instrument(level = "info", name = "cmd::create", skip_all, fields(store = %args.name))]
pub fn execute(ctx: &CommandContext, args: &Args, quiet: bool) -> Result<()> {
    let mut store = ctx.store(&args.name)?;
    let path = store.path().to_path_buf();

    let result = store
        .create()
        .with_context(|| format!("Failed to create store '{}'", args.name));
    finish(result, &mut store, &path)?;

    if !quiet {
        eprintln!("Created store '{}' at {}", args.name, path.display());
    }
    Ok(())
}
