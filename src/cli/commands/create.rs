//! create command - Archive a folder into a volume's repository

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{open_session, report};
use crate::cli::args::VolumeArgs;
use crate::core::types::VolumeName;
use crate::engine::Context;

/// Default archive name: `<volume>-<UTC timestamp>`.
pub fn default_archive_name(volume: &VolumeName, now: DateTime<Utc>) -> String {
    format!("{}-{}", volume, now.format("%Y-%m-%dT%H:%M:%S"))
}

/// Archive `source` into the volume's repository.
pub fn create(ctx: &Context, target: &VolumeArgs, source: &Path, name: Option<&str>) -> Result<()> {
    let session = open_session(ctx, target)?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| default_archive_name(&session.volume, Utc::now()));

    let output = session.ops.create(&session.repo, &name, source)?;
    report(ctx, "create", &session.repo, &output);
    Ok(())
}
