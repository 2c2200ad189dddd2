//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The configuration store describes, per storage pool, whether backups are
//! enabled and where the pool's repositories live. A volume's repository is
//! `<pool.repo>/<volume>`.
//!
//! # Locations
//!
//! Searched in order (first existing file wins):
//! 1. Explicit path (`--config`); must exist
//! 2. `$VOLBORG_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/volborg/config.toml`
//! 4. `~/.volborg/config.toml`
//!
//! Missing files are not an error; defaults are used and no pool is
//! configured.
//!
//! # Example
//!
//! ```no_run
//! use volborg::core::config::Config;
//! use volborg::core::types::VolumeName;
//!
//! let config = Config::load(None).unwrap();
//! let volume = VolumeName::new("web").unwrap();
//! let repo = config.repository("default", &volume).unwrap();
//! println!("repository: {}", repo.location);
//! ```

pub mod schema;

pub use schema::{BorgSettings, CreateOptions, FileConfig, PoolConfig, PruneOptions};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::core::repository::RepoDescriptor;
use crate::core::types::{RepoLocation, TypeError, VolumeName};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "VOLBORG_CONFIG";

/// Default program spawned for borg operations.
pub const DEFAULT_BINARY: &str = "borg";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("storage pool '{0}' is not configured")]
    PoolNotFound(String),

    #[error("backups are not enabled for storage pool '{0}'")]
    PoolDisabled(String),

    #[error("storage pool '{0}' has no repo configured")]
    MissingRepo(String),

    #[error("invalid repository for pool '{pool}': {source}")]
    InvalidRepository { pool: String, source: TypeError },

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents (or defaults).
    pub file: FileConfig,
    /// Path the configuration was loaded from, if any.
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the standard locations are
    /// searched and defaults are used when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed or
    /// validated, or if `explicit` points at a missing file.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => Self::find_default(),
        };

        let Some(path) = path else {
            debug!("no config file found, using defaults");
            return Ok(Self::default());
        };

        let file = Self::read(&path)?;
        file.validate()?;
        debug!(path = %path.display(), pools = file.pools.len(), "loaded config");

        Ok(Self {
            file,
            path: Some(path),
        })
    }

    /// Build a configuration from already-parsed contents.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if validation fails.
    pub fn from_file(file: FileConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self { file, path: None })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        Self::from_file(file)
    }

    fn find_default() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("volborg/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        let home_path = Self::home_config_path().ok()?;
        home_path.exists().then_some(home_path)
    }

    fn read(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Canonical per-user config path, `~/.volborg/config.toml`.
    pub fn home_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".volborg/config.toml"))
    }

    /// Path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    /// Program spawned for borg operations. Defaults to "borg".
    pub fn binary(&self) -> &str {
        self.file.borg.binary.as_deref().unwrap_or(DEFAULT_BINARY)
    }

    /// Deadline for one invocation. `None` means wait forever.
    pub fn timeout(&self) -> Option<Duration> {
        self.file.borg.timeout_secs.map(Duration::from_secs)
    }

    /// Whether passphrase settings are exported. Defaults to `false`.
    pub fn forward_passphrase(&self) -> bool {
        self.file.borg.forward_passphrase.unwrap_or(false)
    }

    /// Extra environment merged into every invocation.
    pub fn extra_env(&self) -> &BTreeMap<String, String> {
        &self.file.borg.env
    }

    /// Options for `borg create`.
    pub fn create_options(&self) -> &CreateOptions {
        &self.file.create
    }

    /// Retention policy for `borg prune`.
    pub fn prune_options(&self) -> &PruneOptions {
        &self.file.prune
    }

    /// Whether backups are enabled for `pool`. Unknown pools are disabled.
    pub fn is_enabled(&self, pool: &str) -> bool {
        self.file
            .pools
            .get(pool)
            .and_then(|p| p.enabled)
            .unwrap_or(false)
    }

    /// Resolve the repository descriptor for a volume in a pool.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::PoolNotFound`] if the pool is not configured
    /// - [`ConfigError::PoolDisabled`] if backups are disabled for it
    /// - [`ConfigError::MissingRepo`] if it has no base location
    pub fn repository(
        &self,
        pool: &str,
        volume: &VolumeName,
    ) -> Result<RepoDescriptor, ConfigError> {
        let pool_config = self
            .file
            .pools
            .get(pool)
            .ok_or_else(|| ConfigError::PoolNotFound(pool.to_string()))?;

        if !pool_config.enabled.unwrap_or(false) {
            return Err(ConfigError::PoolDisabled(pool.to_string()));
        }

        let base = pool_config
            .repo
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRepo(pool.to_string()))?;

        let location = RepoLocation::for_volume(base, volume).map_err(|source| {
            ConfigError::InvalidRepository {
                pool: pool.to_string(),
                source,
            }
        })?;

        let mut repo = RepoDescriptor::new(location);
        if let Some(key) = &pool_config.ssh_key {
            repo = repo.with_key(key);
        }
        if let Some(helper) = &pool_config.ssh_password_helper {
            repo = repo.with_ssh_password_helper(helper);
        }
        if let Some(passphrase) = &pool_config.passphrase {
            repo = repo.with_passphrase(passphrase);
        }
        if let Some(passcommand) = &pool_config.passcommand {
            repo = repo.with_passcommand(passcommand);
        }
        Ok(repo)
    }
}
