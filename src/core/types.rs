//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`VolumeName`] - Validated storage volume name
//! - [`ArchiveName`] - Sanitized borg archive name
//! - [`RepoLocation`] - Repository location string (the repository identity)
//!
//! # Validation
//!
//! These types enforce validity at construction time. An [`ArchiveName`]
//! never contains a path separator, so it can be embedded into a `::<name>`
//! argument without escaping into another namespace.
//!
//! # Examples
//!
//! ```
//! use volborg::core::types::{ArchiveName, VolumeName};
//!
//! let archive = ArchiveName::sanitize("daily/web-2024-01-01").unwrap();
//! assert_eq!(archive.as_str(), "web-2024-01-01");
//! assert_eq!(archive.to_arg(), "::web-2024-01-01");
//!
//! assert!(VolumeName::new("web").is_ok());
//! assert!(VolumeName::new("../etc").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid volume name: {0}")]
    InvalidVolumeName(String),

    #[error("invalid archive name: {0}")]
    InvalidArchiveName(String),

    #[error("invalid repository location: {0}")]
    InvalidLocation(String),
}

/// A validated storage volume name.
///
/// Volume names become the last segment of a repository location, so they
/// must be a single non-empty path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VolumeName(String);

impl VolumeName {
    /// Create a new validated volume name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidVolumeName` if the name is empty, is `.` or
    /// `..`, or contains a `/` or a control character.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidVolumeName(
                "volume name cannot be empty".into(),
            ));
        }
        if name == "." || name == ".." {
            return Err(TypeError::InvalidVolumeName(format!(
                "'{}' is not a volume name",
                name
            )));
        }
        if name.contains('/') {
            return Err(TypeError::InvalidVolumeName(format!(
                "'{}' cannot contain '/'",
                name
            )));
        }
        if name.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidVolumeName(
                "volume name cannot contain control characters".into(),
            ));
        }
        Ok(())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VolumeName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VolumeName> for String {
    fn from(name: VolumeName) -> Self {
        name.0
    }
}

/// A borg archive name with any path-like prefix stripped.
///
/// Only the trailing path segment of the input is kept: `"foo/bar"` becomes
/// `"bar"`. The result is never empty and never contains `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveName(String);

impl ArchiveName {
    /// Sanitize a caller-supplied archive name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidArchiveName` if nothing is left after the
    /// last `/` (e.g. `""` or `"snapshots/"`), or if the name contains a
    /// control character.
    pub fn sanitize(name: &str) -> Result<Self, TypeError> {
        let last = name.rsplit('/').next().unwrap_or_default();

        if last.is_empty() {
            return Err(TypeError::InvalidArchiveName(format!(
                "'{}' has no archive segment",
                name
            )));
        }
        if last.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidArchiveName(
                "archive name cannot contain control characters".into(),
            ));
        }

        Ok(Self(last.to_string()))
    }

    /// Get the sanitized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format as the `::<archive>` token borg expects.
    pub fn to_arg(&self) -> String {
        format!("::{}", self.0)
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a repository's archives are stored.
///
/// Either a local path or an SSH-reachable path. Two repositories are the
/// same repository iff their locations are byte-identical; no normalization
/// is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoLocation(String);

impl RepoLocation {
    /// Create a repository location.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLocation` if the location is empty or
    /// contains a control character.
    pub fn new(location: impl Into<String>) -> Result<Self, TypeError> {
        let location = location.into();
        if location.trim().is_empty() {
            return Err(TypeError::InvalidLocation(
                "repository location cannot be empty".into(),
            ));
        }
        if location.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidLocation(
                "repository location cannot contain control characters".into(),
            ));
        }
        Ok(Self(location))
    }

    /// Location of a volume's repository under a base location.
    ///
    /// Trailing slashes on `base` are trimmed before joining.
    pub fn for_volume(base: &str, volume: &VolumeName) -> Result<Self, TypeError> {
        let trimmed = base.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(TypeError::InvalidLocation(format!(
                "base location '{}' is empty",
                base
            )));
        }
        Self::new(format!("{}/{}", trimmed, volume))
    }

    /// Get the location as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RepoLocation {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepoLocation> for String {
    fn from(location: RepoLocation) -> Self {
        location.0
    }
}
