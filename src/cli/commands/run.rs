//! run command - Prepare, create and prune in one go
//!
//! Steps run in order and stop at the first failure. Pruning is skipped
//! without error when no retention rule is configured.

use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::Utc;
use tracing::info;

use super::{default_archive_name, open_session, report};
use crate::cli::args::VolumeArgs;
use crate::engine::{Context, PrepareOutcome};

/// Back up `source` into the volume's repository.
pub fn run(
    ctx: &Context,
    target: &VolumeArgs,
    source: &Path,
    name: Option<&str>,
    no_prune: bool,
) -> Result<()> {
    let session = open_session(ctx, target)?;
    let repo = &session.repo;

    if let PrepareOutcome::Initialized(output) = session
        .ops
        .prepare(repo)
        .context("Failed to prepare repository")?
    {
        report(ctx, "init", repo, &output);
    }

    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| default_archive_name(&session.volume, Utc::now()));
    let output = session
        .ops
        .create(repo, &name, source)
        .context("Failed to create archive")?;
    report(ctx, "create", repo, &output);

    let prune_options = session.config.prune_options();
    if no_prune {
        info!("Skipping prune");
    } else if !prune_options.has_rules() {
        info!("No retention rules configured, skipping prune");
    } else {
        let output = session
            .ops
            .prune(repo, prune_options)
            .context("Failed to prune repository")?;
        report(ctx, "prune", repo, &output);
    }

    Ok(())
}
