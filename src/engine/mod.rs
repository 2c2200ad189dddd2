//! engine
//!
//! Runs borg against per-volume repositories.
//!
//! # Architecture
//!
//! ```text
//! RepoOps -> Executor -> [LockRegistry guard] -> CommandComposer -> ProcessRunner
//! ```
//!
//! 1. **Operations** ([`operations`]): sanitize names, clear restore targets,
//!    pick the borg operation
//! 2. **Executor** ([`exec`]): lock the repository, compose, spawn, classify
//! 3. **Composer** ([`command`]): environment and argument vector
//! 4. **Runner** ([`runner`]): the process-spawning seam
//!
//! # Invariants
//!
//! - Only the executor spawns borg
//! - At most one borg process per repository location at any instant
//! - Exit code 1 is a warning, never an error
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use volborg::core::config::Config;
//! use volborg::core::ops::LockRegistry;
//! use volborg::core::types::VolumeName;
//! use volborg::engine;
//!
//! let config = Config::load(None).unwrap();
//! let ops = engine::ops_from_config(&config, Arc::new(LockRegistry::new()));
//! let repo = config.repository("default", &VolumeName::new("web").unwrap()).unwrap();
//! ops.prepare(&repo).unwrap();
//! ```

pub mod command;
pub mod exec;
pub mod operations;
pub mod runner;

pub use command::{BorgOperation, CommandComposer, ComposerSettings, Invocation};
pub use exec::{classify, ExecOutput, ExecuteError, Executor, Outcome};
pub use operations::{OpsError, PrepareOutcome, RepoOps};
pub use runner::{ProcessOutput, ProcessRunner, SystemRunner};

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{Config, ConfigError};
use crate::core::ops::LockRegistry;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Machine-readable output.
    pub json: bool,
}

impl Context {
    /// Load configuration honoring `--config`.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        Config::load(self.config_path.as_deref())
    }
}

/// Build repository operations that spawn real borg processes.
pub fn ops_from_config(config: &Config, locks: Arc<LockRegistry>) -> RepoOps<SystemRunner> {
    RepoOps::new(Executor::from_config(config, locks))
        .with_create_options(config.create_options().clone())
}
