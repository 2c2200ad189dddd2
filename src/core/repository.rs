//! core::repository
//!
//! The repository descriptor: everything needed to address one borg
//! repository.
//!
//! # Identity
//!
//! A descriptor's identity is its [`RepoLocation`]. Credentials do not take
//! part in identity: two descriptors with the same location but different
//! keys still serialize against each other.

use std::fmt;
use std::path::PathBuf;

use super::types::RepoLocation;

/// Immutable description of one repository for the duration of a call.
#[derive(Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    /// Where archives are stored.
    pub location: RepoLocation,
    /// Repository passphrase. Only exported when passphrase forwarding is on.
    pub passphrase: Option<String>,
    /// Command printing the passphrase. Only exported when forwarding is on.
    pub passcommand: Option<String>,
    /// SSH private key appended to the remote shell command.
    pub key: Option<PathBuf>,
    /// Value handed to the SSH layer for password authentication.
    pub ssh_password_helper: Option<String>,
}

impl RepoDescriptor {
    /// Create a descriptor with no credentials.
    pub fn new(location: RepoLocation) -> Self {
        Self {
            location,
            passphrase: None,
            passcommand: None,
            key: None,
            ssh_password_helper: None,
        }
    }

    /// Set the SSH identity file.
    pub fn with_key(mut self, key: impl Into<PathBuf>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the SSH password helper.
    pub fn with_ssh_password_helper(mut self, helper: impl Into<String>) -> Self {
        self.ssh_password_helper = Some(helper.into());
        self
    }

    /// Set the repository passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Set the passphrase command.
    pub fn with_passcommand(mut self, passcommand: impl Into<String>) -> Self {
        self.passcommand = Some(passcommand.into());
        self
    }

    /// The repository identity used for locking.
    pub fn identity(&self) -> &str {
        self.location.as_str()
    }
}

// Secrets stay out of Debug output so descriptors can be logged.
impl fmt::Debug for RepoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoDescriptor")
            .field("location", &self.location)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("passcommand", &self.passcommand.as_ref().map(|_| "<redacted>"))
            .field("key", &self.key)
            .field(
                "ssh_password_helper",
                &self.ssh_password_helper.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
