use std::io::{self, Read};

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

#[instrument(level = "info", name = "cmd::write", skip_all, fields(store = %args.name, object = %args.object))]
pub fn execute(ctx: &CommandContext, args: &Args) -> Result<()> {
    let store = ctx.store(&args.name)?;

    let mut content = Vec::new();
    io::stdin()
        .read_to_end(&mut content)
        .context("Failed to read object content from stdin")?;

    with_client(store, |client| {
        client
            .write(&args.object, content)
            .with_context(|| format!("Failed to write object '{}'", args.object))?;
        Ok(())
    })
}
