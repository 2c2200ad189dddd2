//! list command - List archives in a volume's repository

use anyhow::Result;

use super::open_session;
use crate::cli::args::VolumeArgs;
use crate::engine::Context;

/// Print archive names, one per line.
pub fn list(ctx: &Context, target: &VolumeArgs) -> Result<()> {
    let session = open_session(ctx, target)?;
    let archives = session.ops.list_archives(&session.repo)?;

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "repository": session.repo.identity(),
                "archives": archives,
            })
        );
        return Ok(());
    }

    if archives.is_empty() && !ctx.quiet {
        println!("No archives in {}", session.repo.location);
    }
    for name in &archives {
        println!("{}", name);
    }

    Ok(())
}
