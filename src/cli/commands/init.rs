//! init command - Initialize a volume's repository

use anyhow::Result;

use super::{open_session, report};
use crate::cli::args::VolumeArgs;
use crate::engine::Context;

/// Run `borg init -e none` for the volume's repository.
pub fn init(ctx: &Context, target: &VolumeArgs) -> Result<()> {
    let session = open_session(ctx, target)?;
    let output = session.ops.init(&session.repo)?;
    report(ctx, "init", &session.repo, &output);
    Ok(())
}
