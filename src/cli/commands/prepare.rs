//! prepare command - Make sure a volume's repository exists

use anyhow::Result;

use super::{open_session, report};
use crate::cli::args::VolumeArgs;
use crate::engine::{Context, PrepareOutcome};

/// Prepare a volume's repository, initializing it when `borg list` fails.
pub fn prepare(ctx: &Context, target: &VolumeArgs) -> Result<()> {
    let session = open_session(ctx, target)?;

    match session.ops.prepare(&session.repo)? {
        PrepareOutcome::Ready => {
            if ctx.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "operation": "prepare",
                        "repository": session.repo.identity(),
                        "initialized": false,
                    })
                );
            } else if !ctx.quiet {
                println!("Repository {} is ready", session.repo.location);
            }
        }
        PrepareOutcome::Initialized(output) => {
            report(ctx, "init", &session.repo, &output);
            if !ctx.json && !ctx.quiet {
                println!("Initialized repository {}", session.repo.location);
            }
        }
    }

    Ok(())
}
