//! config command - Inspect configuration

use anyhow::{Context as _, Result};

use super::open_session;
use crate::cli::args::VolumeArgs;
use crate::core::config::Config;
use crate::engine::Context;

/// Print the configuration file in use, or where one would be read from.
pub fn path(ctx: &Context) -> Result<()> {
    let config = ctx.load_config().context("Failed to load config")?;

    match config.loaded_from() {
        Some(path) => println!("{}", path.display()),
        None => {
            let fallback = Config::home_config_path()?;
            if ctx.quiet {
                println!("{}", fallback.display());
            } else {
                println!("{} (not present, using defaults)", fallback.display());
            }
        }
    }

    Ok(())
}

/// Print the repository location resolved for a volume.
pub fn repo(ctx: &Context, target: &VolumeArgs) -> Result<()> {
    let session = open_session(ctx, target)?;
    println!("{}", session.repo.location);
    Ok(())
}
