//! prune command - Apply the configured retention policy

use anyhow::Result;

use super::{open_session, report};
use crate::cli::args::VolumeArgs;
use crate::engine::Context;

/// Prune the volume's repository with the `[prune]` rules.
pub fn prune(ctx: &Context, target: &VolumeArgs) -> Result<()> {
    let session = open_session(ctx, target)?;
    let output = session
        .ops
        .prune(&session.repo, session.config.prune_options())?;
    report(ctx, "prune", &session.repo, &output);
    Ok(())
}
