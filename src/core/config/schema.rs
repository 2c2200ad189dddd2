//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Layout
//!
//! ```toml
//! [borg]
//! binary = "borg"
//! timeout_secs = 3600
//! forward_passphrase = false
//!
//! [borg.env]
//! BORG_HOSTNAME_IS_UNIQUE = "yes"
//!
//! [pools.default]
//! enabled = true
//! repo = "ssh://backup@host/./volumes"
//! ssh_key = "/root/.ssh/id_ed25519"
//!
//! [create]
//! exclude = ["*.tmp"]
//! exclude_caches = true
//!
//! [prune]
//! keep_daily = 7
//! keep_weekly = 4
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing; see [`FileConfig::validate`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// How borg is invoked.
    pub borg: BorgSettings,

    /// Storage pools by name.
    pub pools: BTreeMap<String, PoolConfig>,

    /// Options for `borg create`.
    pub create: CreateOptions,

    /// Retention policy for `borg prune`.
    pub prune: PruneOptions,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.borg.validate()?;

        for (name, pool) in &self.pools {
            pool.validate(name)?;
        }

        validate_args("create.extra_args", &self.create.extra_args)?;
        for pattern in &self.create.exclude {
            if pattern.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "create.exclude cannot contain empty patterns".to_string(),
                ));
            }
        }

        validate_args("prune.extra_args", &self.prune.extra_args)?;
        if let Some(within) = &self.prune.keep_within {
            if within.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "prune.keep_within cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Settings for spawning borg.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BorgSettings {
    /// Program to spawn (default: "borg").
    pub binary: Option<String>,

    /// Deadline for one invocation, in seconds. No deadline when unset.
    pub timeout_secs: Option<u64>,

    /// Export the pool's passphrase settings to borg.
    pub forward_passphrase: Option<bool>,

    /// Extra environment for every invocation. Overrides computed values.
    pub env: BTreeMap<String, String>,
}

impl BorgSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(binary) = &self.binary {
            if binary.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "borg.binary cannot be empty".to_string(),
                ));
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "borg.timeout_secs must be greater than zero".to_string(),
            ));
        }

        for key in self.env.keys() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid environment variable name '{}' in borg.env",
                    key
                )));
            }
        }

        Ok(())
    }
}

/// One storage pool: the base location its volumes' repositories live under.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Whether backups are enabled for this pool.
    pub enabled: Option<bool>,

    /// Base repository location; each volume gets `<repo>/<volume>`.
    pub repo: Option<String>,

    /// SSH private key used for remote repositories.
    pub ssh_key: Option<String>,

    /// Exported as `SSH_PASS` for the SSH layer.
    pub ssh_password_helper: Option<String>,

    /// Repository passphrase (needs `borg.forward_passphrase`).
    pub passphrase: Option<String>,

    /// Command printing the passphrase (needs `borg.forward_passphrase`).
    pub passcommand: Option<String>,
}

impl PoolConfig {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "pool name cannot be empty".to_string(),
            ));
        }

        if self.enabled.unwrap_or(false) {
            let repo = self.repo.as_deref().unwrap_or("");
            if repo.trim_end_matches('/').trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "pool '{}' is enabled but has no repo",
                    name
                )));
            }
        }

        if let Some(key) = &self.ssh_key {
            if key.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "pool '{}': ssh_key cannot be empty",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Options for `borg create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CreateOptions {
    /// Patterns passed as `--exclude <pattern>`.
    pub exclude: Vec<String>,

    /// Pass `--exclude-caches`.
    pub exclude_caches: bool,

    /// Appended verbatim before the archive argument.
    pub extra_args: Vec<String>,
}

/// Retention policy for `borg prune`.
///
/// Each set field becomes a `--keep-*` flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PruneOptions {
    pub keep_within: Option<String>,
    pub keep_last: Option<u32>,
    pub keep_secondly: Option<u32>,
    pub keep_minutely: Option<u32>,
    pub keep_hourly: Option<u32>,
    pub keep_daily: Option<u32>,
    pub keep_weekly: Option<u32>,
    pub keep_monthly: Option<u32>,
    pub keep_yearly: Option<u32>,

    /// Appended verbatim after the `--keep-*` flags.
    pub extra_args: Vec<String>,
}

impl PruneOptions {
    /// Whether any retention rule is configured.
    ///
    /// Borg refuses to prune without at least one rule.
    pub fn has_rules(&self) -> bool {
        self.keep_within.is_some()
            || [
                self.keep_last,
                self.keep_secondly,
                self.keep_minutely,
                self.keep_hourly,
                self.keep_daily,
                self.keep_weekly,
                self.keep_monthly,
                self.keep_yearly,
            ]
            .iter()
            .any(Option::is_some)
    }
}

fn validate_args(field: &str, args: &[String]) -> Result<(), ConfigError> {
    if args.iter().any(|a| a.is_empty()) {
        return Err(ConfigError::InvalidValue(format!(
            "{} cannot contain empty arguments",
            field
        )));
    }
    Ok(())
}
