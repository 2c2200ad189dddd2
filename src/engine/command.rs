//! engine::command
//!
//! Composition of borg invocations.
//!
//! # Architecture
//!
//! The [`CommandComposer`] turns a [`RepoDescriptor`] and a
//! [`BorgOperation`] into an [`Invocation`]: program, argument vector,
//! environment and working directory. Composition is pure; nothing here
//! touches the filesystem or spawns a process.
//!
//! # Environment
//!
//! Always set:
//! - `BORG_REPO` - the repository location
//! - `BORG_RSH` - `ssh -o StrictHostKeyChecking=no`, plus `-i <key>` when the
//!   descriptor has a key
//!
//! Conditionally set:
//! - `SSH_PASS` - the descriptor's SSH password helper
//! - `BORG_PASSPHRASE` / `BORG_PASSCOMMAND` - only with passphrase forwarding
//! - `BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK` and
//!   `BORG_RELOCATED_REPO_ACCESS_IS_OK` - for operations that would
//!   otherwise prompt (list, init, delete)
//! - configured extra environment, merged last; it wins on collision
//!
//! # Arguments
//!
//! | Operation | Arguments |
//! |-----------|-----------|
//! | list      | `list` |
//! | init      | `init -e none` |
//! | create    | `create --stats [create options] ::<archive> .` |
//! | extract   | `extract ::<archive>` |
//! | delete    | `delete ::<archive> --force` |
//! | prune     | `prune --list --stats [--keep-* ...] [extra args]` |
//!
//! # Example
//!
//! ```
//! use volborg::core::repository::RepoDescriptor;
//! use volborg::core::types::{ArchiveName, RepoLocation};
//! use volborg::engine::command::{BorgOperation, CommandComposer, ComposerSettings};
//!
//! let composer = CommandComposer::new(ComposerSettings::default());
//! let repo = RepoDescriptor::new(RepoLocation::new("/srv/borg/web").unwrap());
//! let op = BorgOperation::Delete {
//!     archive: ArchiveName::sanitize("old/web-1").unwrap(),
//! };
//!
//! let inv = composer.compose(&repo, &op);
//! assert_eq!(inv.args, ["delete", "::web-1", "--force"]);
//! assert_eq!(inv.env["BORG_REPO"], "/srv/borg/web");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::config::{Config, CreateOptions, PruneOptions, DEFAULT_BINARY};
use crate::core::repository::RepoDescriptor;
use crate::core::types::ArchiveName;

pub const BORG_REPO: &str = "BORG_REPO";
pub const BORG_RSH: &str = "BORG_RSH";
pub const BORG_PASSPHRASE: &str = "BORG_PASSPHRASE";
pub const BORG_PASSCOMMAND: &str = "BORG_PASSCOMMAND";
pub const SSH_PASS: &str = "SSH_PASS";

const BASE_RSH: &str = "ssh -o StrictHostKeyChecking=no";

/// Answers borg would otherwise ask for on stdin.
const PROMPT_ANSWERS: [(&str, &str); 2] = [
    ("BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK", "yes"),
    ("BORG_RELOCATED_REPO_ACCESS_IS_OK", "yes"),
];

/// One borg operation with its operation-specific inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorgOperation {
    /// List archives.
    List,
    /// Initialize an unencrypted repository.
    Init,
    /// Archive `source` (used as the working directory) as `archive`.
    Create {
        archive: ArchiveName,
        source: PathBuf,
        options: CreateOptions,
    },
    /// Extract `archive` into `dest` (used as the working directory).
    Extract { archive: ArchiveName, dest: PathBuf },
    /// Delete one archive.
    Delete { archive: ArchiveName },
    /// Apply a retention policy.
    Prune { options: PruneOptions },
}

impl BorgOperation {
    /// The borg subcommand name.
    pub fn name(&self) -> &'static str {
        match self {
            BorgOperation::List => "list",
            BorgOperation::Init => "init",
            BorgOperation::Create { .. } => "create",
            BorgOperation::Extract { .. } => "extract",
            BorgOperation::Delete { .. } => "delete",
            BorgOperation::Prune { .. } => "prune",
        }
    }

    /// Directory borg must run in.
    pub fn working_dir(&self) -> Option<&Path> {
        match self {
            BorgOperation::Create { source, .. } => Some(source),
            BorgOperation::Extract { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// Whether borg may stop to ask a question during this operation.
    fn may_prompt(&self) -> bool {
        matches!(
            self,
            BorgOperation::List | BorgOperation::Init | BorgOperation::Delete { .. }
        )
    }

    /// Positional arguments for this operation.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];

        match self {
            BorgOperation::List => {}
            BorgOperation::Init => {
                args.extend(["-e".to_string(), "none".to_string()]);
            }
            BorgOperation::Create {
                archive, options, ..
            } => {
                args.push("--stats".to_string());
                for pattern in &options.exclude {
                    args.push("--exclude".to_string());
                    args.push(pattern.clone());
                }
                if options.exclude_caches {
                    args.push("--exclude-caches".to_string());
                }
                args.extend(options.extra_args.iter().cloned());
                args.push(archive.to_arg());
                args.push(".".to_string());
            }
            BorgOperation::Extract { archive, .. } => {
                args.push(archive.to_arg());
            }
            BorgOperation::Delete { archive } => {
                args.push(archive.to_arg());
                args.push("--force".to_string());
            }
            BorgOperation::Prune { options } => {
                args.extend(["--list".to_string(), "--stats".to_string()]);
                args.extend(prune_flags(options));
            }
        }

        args
    }
}

/// Translate a retention policy into `--keep-*` flags, in a fixed order.
pub fn prune_flags(options: &PruneOptions) -> Vec<String> {
    let mut flags = Vec::new();

    if let Some(within) = &options.keep_within {
        flags.push("--keep-within".to_string());
        flags.push(within.clone());
    }

    let counts = [
        ("--keep-last", options.keep_last),
        ("--keep-secondly", options.keep_secondly),
        ("--keep-minutely", options.keep_minutely),
        ("--keep-hourly", options.keep_hourly),
        ("--keep-daily", options.keep_daily),
        ("--keep-weekly", options.keep_weekly),
        ("--keep-monthly", options.keep_monthly),
        ("--keep-yearly", options.keep_yearly),
    ];
    for (flag, value) in counts {
        if let Some(n) = value {
            flags.push(flag.to_string());
            flags.push(n.to_string());
        }
    }

    flags.extend(options.extra_args.iter().cloned());
    flags
}

/// A fully composed process invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to spawn.
    pub program: String,
    /// Arguments after the program name.
    pub args: Vec<String>,
    /// Environment added on top of the inherited one.
    pub env: BTreeMap<String, String>,
    /// Working directory, if the operation needs one.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    /// Program and arguments joined for display. Contains no environment.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

// Environment values can hold secrets; only the keys are shown.
impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .field("cwd", &self.cwd)
            .finish()
    }
}

/// Settings shared by every composed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    /// Program to spawn.
    pub binary: String,
    /// Export `BORG_PASSPHRASE` / `BORG_PASSCOMMAND` from the descriptor.
    pub forward_passphrase: bool,
    /// Extra environment, merged last.
    pub extra_env: BTreeMap<String, String>,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            forward_passphrase: false,
            extra_env: BTreeMap::new(),
        }
    }
}

impl ComposerSettings {
    /// Take composer settings from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.binary().to_string(),
            forward_passphrase: config.forward_passphrase(),
            extra_env: config.extra_env().clone(),
        }
    }
}

/// Builds environment and arguments for borg operations.
#[derive(Debug, Clone, Default)]
pub struct CommandComposer {
    settings: ComposerSettings,
}

impl CommandComposer {
    /// Create a composer.
    pub fn new(settings: ComposerSettings) -> Self {
        Self { settings }
    }

    /// Compose the full invocation for `op` against `repo`.
    pub fn compose(&self, repo: &RepoDescriptor, op: &BorgOperation) -> Invocation {
        Invocation {
            program: self.settings.binary.clone(),
            args: op.args(),
            env: self.environment(repo, op),
            cwd: op.working_dir().map(Path::to_path_buf),
        }
    }

    /// Environment for `op` against `repo`.
    pub fn environment(
        &self,
        repo: &RepoDescriptor,
        op: &BorgOperation,
    ) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        env.insert(BORG_REPO.to_string(), repo.location.to_string());
        env.insert(BORG_RSH.to_string(), remote_shell(repo.key.as_deref()));

        if let Some(helper) = &repo.ssh_password_helper {
            env.insert(SSH_PASS.to_string(), helper.clone());
        }

        if self.settings.forward_passphrase {
            if let Some(passphrase) = &repo.passphrase {
                env.insert(BORG_PASSPHRASE.to_string(), passphrase.clone());
            }
            if let Some(passcommand) = &repo.passcommand {
                env.insert(BORG_PASSCOMMAND.to_string(), passcommand.clone());
            }
        }

        if op.may_prompt() {
            for (key, value) in PROMPT_ANSWERS {
                env.insert(key.to_string(), value.to_string());
            }
        }

        for (key, value) in &self.settings.extra_env {
            env.insert(key.clone(), value.clone());
        }

        env
    }
}

/// The `BORG_RSH` value, with an identity file when a key is configured.
fn remote_shell(key: Option<&Path>) -> String {
    match key {
        Some(key) => format!("{} -i {}", BASE_RSH, shell_quote(&key.to_string_lossy())),
        None => BASE_RSH.to_string(),
    }
}

/// Quote a word for borg's shlex-style splitting of `BORG_RSH`.
fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:@,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
