//! engine::exec
//!
//! The single borg executor.
//!
//! # Architecture
//!
//! Every borg invocation flows through [`Executor::run`]. The executor owns
//! a [`ProcessRunner`], a [`CommandComposer`] and a shared
//! [`LockRegistry`], and is the only component that spawns borg.
//!
//! # Executor Contract
//!
//! The executor MUST:
//! 1. Acquire the repository's guard before composing or spawning
//! 2. Compose environment and arguments for the operation
//! 3. Spawn borg synchronously, capturing stdout and stderr separately
//! 4. Classify the result:
//!    - exit 0: success
//!    - exit 1: warning; both streams logged at warn level, not an error
//!    - any other exit, signal or timeout: fatal; stderr logged at error level
//!    - spawn failure: the I/O error, uninterpreted
//! 5. Release the guard on every path (RAII)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use volborg::core::ops::LockRegistry;
//! use volborg::engine::command::{BorgOperation, CommandComposer};
//! use volborg::engine::exec::Executor;
//! use volborg::engine::runner::SystemRunner;
//!
//! let executor = Executor::new(
//!     SystemRunner::new(),
//!     CommandComposer::default(),
//!     Arc::new(LockRegistry::new()),
//! );
//! let output = executor.run(&repo, &BorgOperation::List)?;
//! println!("{}", output.stdout);
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::command::{BorgOperation, CommandComposer, ComposerSettings};
use super::runner::{ProcessOutput, ProcessRunner, SystemRunner};
use crate::core::config::Config;
use crate::core::ops::lock::LockRegistry;
use crate::core::repository::RepoDescriptor;

/// Exit code borg uses for warnings.
pub const WARNING_EXIT_CODE: i32 = 1;

/// Errors from executing a borg operation.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Borg could not be started.
    #[error(transparent)]
    Spawn(#[from] std::io::Error),

    /// Borg exited with a code other than 0 or 1, or was killed by a signal.
    #[error("borg {operation} failed ({}): {}", exit_label(.code), .stderr.trim())]
    FatalExit {
        /// Borg subcommand that failed.
        operation: &'static str,
        /// Exit code; `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Borg ran past its deadline and was killed.
    #[error("borg {operation} timed out and was killed: {}", .stderr.trim())]
    TimedOut {
        /// Borg subcommand that timed out.
        operation: &'static str,
        /// Standard output captured before the kill.
        stdout: String,
        /// Standard error captured before the kill.
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// How a non-fatal borg run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit code 0.
    Success,
    /// Exit code 1: borg hit a recoverable condition and carried on.
    Warning,
}

impl Outcome {
    /// Lowercase label for output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Warning => "warning",
        }
    }
}

/// Captured output of a non-fatal borg run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Success or warning.
    pub outcome: Outcome,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ExecOutput {
    /// Check if borg exited with a warning.
    pub fn is_warning(&self) -> bool {
        self.outcome == Outcome::Warning
    }
}

/// Classify a finished process for `operation`.
///
/// # Errors
///
/// Returns [`ExecuteError::TimedOut`] if the process was killed at its
/// deadline, and [`ExecuteError::FatalExit`] for any exit other than 0 or 1.
pub fn classify(
    operation: &'static str,
    output: ProcessOutput,
) -> Result<ExecOutput, ExecuteError> {
    let ProcessOutput {
        code,
        stdout,
        stderr,
        timed_out,
    } = output;

    if timed_out {
        error!(operation, stderr = %stderr.trim(), "borg timed out");
        return Err(ExecuteError::TimedOut {
            operation,
            stdout,
            stderr,
        });
    }

    match code {
        Some(0) => Ok(ExecOutput {
            outcome: Outcome::Success,
            stdout,
            stderr,
        }),
        Some(WARNING_EXIT_CODE) => {
            warn!(operation, "borg warning {}", stdout.trim());
            warn!(operation, "borg warning {}", stderr.trim());
            Ok(ExecOutput {
                outcome: Outcome::Warning,
                stdout,
                stderr,
            })
        }
        code => {
            error!(operation, code = ?code, "{}", stderr.trim());
            Err(ExecuteError::FatalExit {
                operation,
                code,
                stdout,
                stderr,
            })
        }
    }
}

/// Runs borg operations under per-repository locks.
pub struct Executor<R: ProcessRunner> {
    runner: R,
    composer: CommandComposer,
    locks: Arc<LockRegistry>,
}

impl Executor<SystemRunner> {
    /// Build an executor that spawns real processes, configured from `config`.
    pub fn from_config(config: &Config, locks: Arc<LockRegistry>) -> Self {
        Self::new(
            SystemRunner::with_timeout(config.timeout()),
            CommandComposer::new(ComposerSettings::from_config(config)),
            locks,
        )
    }
}

impl<R: ProcessRunner> Executor<R> {
    /// Create an executor.
    pub fn new(runner: R, composer: CommandComposer, locks: Arc<LockRegistry>) -> Self {
        Self {
            runner,
            composer,
            locks,
        }
    }

    /// The process runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `op` against `repo`.
    ///
    /// Blocks until the repository's guard is free, then for the full
    /// duration of the borg process.
    ///
    /// # Errors
    ///
    /// - [`ExecuteError::Spawn`] if borg could not be started
    /// - [`ExecuteError::FatalExit`] for exits other than 0 and 1
    /// - [`ExecuteError::TimedOut`] if borg was killed at its deadline
    pub fn run(
        &self,
        repo: &RepoDescriptor,
        op: &BorgOperation,
    ) -> Result<ExecOutput, ExecuteError> {
        let _guard = self.locks.acquire(repo.identity());

        let invocation = self.composer.compose(repo, op);
        debug!(
            repo = %repo.location,
            command = %invocation.command_line(),
            cwd = ?invocation.cwd,
            "running borg"
        );

        let output = self.runner.run(&invocation)?;
        classify(op.name(), output)
    }
}
