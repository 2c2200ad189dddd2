//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves the volume's repository from configuration
//! 2. Calls [`RepoOps`] to run borg
//! 3. Formats and displays output
//!
//! Handlers never spawn borg directly.

mod completion;
mod config_cmd;
mod create;
mod delete;
mod init;
mod list;
mod prepare;
mod prune;
mod restore;
mod run;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use config_cmd::{path as config_path, repo as config_repo};
pub use create::{create, default_archive_name};
pub use delete::delete;
pub use init::init;
pub use list::list;
pub use prepare::prepare;
pub use prune::prune;
pub use restore::restore;
pub use run::run;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde_json::json;

use crate::cli::args::{Command, ConfigAction, VolumeArgs};
use crate::core::config::Config;
use crate::core::ops::LockRegistry;
use crate::core::repository::RepoDescriptor;
use crate::core::types::VolumeName;
use crate::engine::{self, Context, ExecOutput, RepoOps, SystemRunner};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Prepare { target } => prepare::prepare(ctx, &target),
        Command::Init { target } => init::init(ctx, &target),
        Command::List { target } => list::list(ctx, &target),
        Command::Create {
            target,
            source,
            name,
        } => create::create(ctx, &target, &source, name.as_deref()),
        Command::Restore { target, name, dest } => restore::restore(ctx, &target, &name, &dest),
        Command::Delete { target, name } => delete::delete(ctx, &target, &name),
        Command::Prune { target } => prune::prune(ctx, &target),
        Command::Run {
            target,
            source,
            name,
            no_prune,
        } => run::run(ctx, &target, &source, name.as_deref(), no_prune),
        Command::Config { action } => match action {
            ConfigAction::Path => config_cmd::path(ctx),
            ConfigAction::Repo { target } => config_cmd::repo(ctx, &target),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Everything a handler needs to run borg against one volume.
pub(crate) struct Session {
    pub config: Config,
    pub volume: VolumeName,
    pub repo: RepoDescriptor,
    pub ops: RepoOps<SystemRunner>,
}

/// Load configuration and resolve `target` to a repository.
pub(crate) fn open_session(ctx: &Context, target: &VolumeArgs) -> Result<Session> {
    let config = ctx.load_config().context("Failed to load config")?;
    let volume = VolumeName::new(target.volume.as_str())?;
    let repo = config
        .repository(&target.pool, &volume)
        .with_context(|| format!("Cannot back up volume '{}'", volume))?;

    // One process, one registry: commands that run several borg steps still
    // serialize on the same repository.
    let ops = engine::ops_from_config(&config, Arc::new(LockRegistry::new()));

    Ok(Session {
        config,
        volume,
        repo,
        ops,
    })
}

/// Print the result of one borg run.
///
/// Human mode echoes borg's own output unless `--quiet`; JSON mode prints a
/// single object per run.
pub(crate) fn report(ctx: &Context, operation: &str, repo: &RepoDescriptor, output: &ExecOutput) {
    if ctx.json {
        let value = json!({
            "operation": operation,
            "repository": repo.identity(),
            "outcome": output.outcome.as_str(),
            "stdout": output.stdout,
            "stderr": output.stderr,
        });
        println!("{}", value);
        return;
    }

    if ctx.quiet {
        return;
    }

    let stdout = output.stdout.trim_end();
    if !stdout.is_empty() {
        println!("{}", stdout);
    }
    let stderr = output.stderr.trim_end();
    if !stderr.is_empty() {
        eprintln!("{}", stderr);
    }
    if output.is_warning() {
        eprintln!("{} finished with warnings", operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RepoLocation;
    use crate::engine::Outcome;
    use std::io::Write;

    fn volume(name: &str) -> VolumeArgs {
        VolumeArgs {
            pool: "default".to_string(),
            volume: name.to_string(),
        }
    }

    #[test]
    fn open_session_resolves_repository() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[pools.default]\nenabled = true\nrepo = \"ssh://backup@host/srv/borg/\"\n"
        )
        .unwrap();

        let ctx = Context {
            config_path: Some(file.path().to_path_buf()),
            ..Context::default()
        };
        let session = open_session(&ctx, &volume("web")).unwrap();
        assert_eq!(session.repo.identity(), "ssh://backup@host/srv/borg/web");
        assert_eq!(session.volume.as_str(), "web");
    }

    #[test]
    fn open_session_rejects_disabled_pool() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pools.default]\nenabled = false\nrepo = \"/srv/borg\"\n").unwrap();

        let ctx = Context {
            config_path: Some(file.path().to_path_buf()),
            ..Context::default()
        };
        let err = open_session(&ctx, &volume("web")).err().unwrap();
        assert!(format!("{:#}", err).contains("not enabled"));
    }

    #[test]
    fn open_session_rejects_bad_volume() {
        let ctx = Context::default();
        assert!(open_session(&ctx, &volume("a/b")).is_err());
    }

    #[test]
    fn report_is_silent_when_quiet() {
        let ctx = Context {
            quiet: true,
            ..Context::default()
        };
        let repo = RepoDescriptor::new(RepoLocation::new("/srv/borg/web").unwrap());
        let output = ExecOutput {
            outcome: Outcome::Warning,
            stdout: String::new(),
            stderr: "warning: file vanished".to_string(),
        };
        report(&ctx, "create", &repo, &output);
    }
}
