//! engine::operations
//!
//! Public repository operations built on the [`Executor`].
//!
//! # Operations
//!
//! - [`RepoOps::prepare`] - `list`, falling back to `init` on any failure
//! - [`RepoOps::init`] - unencrypted `init -e none`
//! - [`RepoOps::list`] / [`RepoOps::list_archives`]
//! - [`RepoOps::create`] - archive a source folder
//! - [`RepoOps::restore`] - wipe a destination folder, then extract into it
//! - [`RepoOps::delete`] - delete one archive
//! - [`RepoOps::prune`] - apply a retention policy
//!
//! Archive names are sanitized to their last path segment before use.
//!
//! # Known risk: prepare
//!
//! `prepare` cannot tell "repository never initialized" from "repository
//! unreachable". Any `list` failure, including a network partition, leads to
//! an `init` attempt. Against an existing repository that `init` fails and
//! its error is returned, so the caller sees the failure; it never replaces
//! the repository.
//!
//! # Per-repository state
//!
//! ```text
//! Unknown --list ok--> Ready
//! Unknown --list fails--> Initializing --init ok--> Ready
//!                                      --init fails--> Failed
//! ```
//!
//! Nothing is remembered between calls.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::command::BorgOperation;
use super::exec::{ExecOutput, ExecuteError, Executor};
use super::runner::ProcessRunner;
use crate::core::config::{CreateOptions, PruneOptions};
use crate::core::paths::{self, PathError};
use crate::core::repository::RepoDescriptor;
use crate::core::types::{ArchiveName, TypeError};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Borg failed or could not be started.
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    /// The archive name has no usable segment.
    #[error(transparent)]
    InvalidArchiveName(#[from] TypeError),

    /// The restore destination could not be cleared.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Prune was requested without any retention rule.
    #[error("no retention rules configured; refusing to prune")]
    NoPruneRules,
}

impl OpsError {
    /// Check if this is a refused delete of an empty or root path.
    pub fn is_unsafe_delete_path(&self) -> bool {
        matches!(self, OpsError::Path(PathError::UnsafeDeletePath(_)))
    }
}

/// How [`RepoOps::prepare`] left the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// `list` succeeded; the repository already existed.
    Ready,
    /// `list` failed and `init` succeeded.
    Initialized(ExecOutput),
}

/// Repository operations over one executor.
pub struct RepoOps<R: ProcessRunner> {
    executor: Executor<R>,
    create_options: CreateOptions,
}

impl<R: ProcessRunner> RepoOps<R> {
    /// Wrap an executor with default create options.
    pub fn new(executor: Executor<R>) -> Self {
        Self {
            executor,
            create_options: CreateOptions::default(),
        }
    }

    /// Set the options applied to every `create`.
    pub fn with_create_options(mut self, options: CreateOptions) -> Self {
        self.create_options = options;
        self
    }

    /// The underlying executor.
    pub fn executor(&self) -> &Executor<R> {
        &self.executor
    }

    /// Make sure the repository exists, initializing it if `list` fails.
    ///
    /// # Errors
    ///
    /// Returns the `init` error if `list` fails and `init` fails too.
    pub fn prepare(&self, repo: &RepoDescriptor) -> Result<PrepareOutcome, OpsError> {
        info!("Check {}", repo.location);

        match self.executor.run(repo, &BorgOperation::List) {
            Ok(_) => Ok(PrepareOutcome::Ready),
            Err(list_err) => {
                info!(reason = %list_err, "Must init {}", repo.location);
                let output = self.init(repo)?;
                Ok(PrepareOutcome::Initialized(output))
            }
        }
    }

    /// Initialize an unencrypted repository.
    pub fn init(&self, repo: &RepoDescriptor) -> Result<ExecOutput, OpsError> {
        info!("Init {}", repo.location);
        Ok(self.executor.run(repo, &BorgOperation::Init)?)
    }

    /// Run `borg list` and return its output.
    pub fn list(&self, repo: &RepoDescriptor) -> Result<ExecOutput, OpsError> {
        Ok(self.executor.run(repo, &BorgOperation::List)?)
    }

    /// Archive names in the repository, oldest first as borg prints them.
    pub fn list_archives(&self, repo: &RepoDescriptor) -> Result<Vec<String>, OpsError> {
        let output = self.list(repo)?;
        Ok(parse_archive_names(&output.stdout))
    }

    /// Archive `source_folder` into `name`.
    pub fn create(
        &self,
        repo: &RepoDescriptor,
        name: &str,
        source_folder: &Path,
    ) -> Result<ExecOutput, OpsError> {
        let archive = ArchiveName::sanitize(name)?;

        info!(
            "Create {} on {} from {}",
            archive,
            repo.location,
            source_folder.display()
        );

        let op = BorgOperation::Create {
            archive,
            source: source_folder.to_path_buf(),
            options: self.create_options.clone(),
        };
        Ok(self.executor.run(repo, &op)?)
    }

    /// Replace the contents of `dest_folder` with archive `name`.
    ///
    /// The destination is cleared first; if that fails, borg is never run.
    ///
    /// # Errors
    ///
    /// - [`PathError::UnsafeDeletePath`] (via [`OpsError::Path`]) for an
    ///   empty or root destination, before anything is touched
    /// - [`OpsError::Execute`] if extraction fails
    pub fn restore(
        &self,
        repo: &RepoDescriptor,
        name: &str,
        dest_folder: &Path,
    ) -> Result<ExecOutput, OpsError> {
        let archive = ArchiveName::sanitize(name)?;

        info!("Clear up {}", dest_folder.display());
        paths::clear_dir(dest_folder)?;

        info!("Extract {} into {}", archive, dest_folder.display());
        let op = BorgOperation::Extract {
            archive,
            dest: dest_folder.to_path_buf(),
        };
        Ok(self.executor.run(repo, &op)?)
    }

    /// Delete archive `name`.
    pub fn delete(&self, repo: &RepoDescriptor, name: &str) -> Result<ExecOutput, OpsError> {
        let archive = ArchiveName::sanitize(name)?;

        info!("Delete {} on {}", archive, repo.location);

        Ok(self.executor.run(repo, &BorgOperation::Delete { archive })?)
    }

    /// Apply `options` as a retention policy.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::NoPruneRules`] without running borg when no
    /// `--keep-*` rule is set.
    pub fn prune(
        &self,
        repo: &RepoDescriptor,
        options: &PruneOptions,
    ) -> Result<ExecOutput, OpsError> {
        if !options.has_rules() {
            return Err(OpsError::NoPruneRules);
        }

        info!("Prune {}", repo.location);

        let op = BorgOperation::Prune {
            options: options.clone(),
        };
        Ok(self.executor.run(repo, &op)?)
    }
}

/// Archive names from `borg list` output: the first token of each line.
pub fn parse_archive_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
