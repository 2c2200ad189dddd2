//! restore command - Replace a folder's contents with an archive

use std::path::Path;

use anyhow::Result;

use super::{open_session, report};
use crate::cli::args::VolumeArgs;
use crate::engine::Context;

/// Clear `dest` and extract archive `name` into it.
pub fn restore(ctx: &Context, target: &VolumeArgs, name: &str, dest: &Path) -> Result<()> {
    let session = open_session(ctx, target)?;
    let output = session.ops.restore(&session.repo, name, dest)?;
    report(ctx, "extract", &session.repo, &output);
    Ok(())
}
