//! delete command - Delete an archive

use anyhow::Result;

use super::{open_session, report};
use crate::cli::args::VolumeArgs;
use crate::engine::Context;

/// Delete archive `name` from the volume's repository.
pub fn delete(ctx: &Context, target: &VolumeArgs, name: &str) -> Result<()> {
    let session = open_session(ctx, target)?;
    let output = session.ops.delete(&session.repo, name)?;
    report(ctx, "delete", &session.repo, &output);
    Ok(())
}
