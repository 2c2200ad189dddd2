//! core::paths
//!
//! Guarded filesystem mutation for restore targets.
//!
//! # Hard rule
//!
//! A restore wipes its destination before extracting. [`clear_dir`] refuses
//! to touch an empty path or a path that resolves lexically to the root
//! (`/`, `//`, `/.`) or to the bare current directory. That check runs before
//! any filesystem call, so an unsafe path never reaches `remove_*`.
//!
//! # Semantics
//!
//! The directory itself is kept; only its contents are removed. Symlinks are
//! removed as links and never followed. A missing directory is created, so a
//! restore into a fresh location works.
//!
//! # Example
//!
//! ```
//! use volborg::core::paths::{check_delete_target, PathError};
//! use std::path::Path;
//!
//! assert!(matches!(
//!     check_delete_target(Path::new("/")),
//!     Err(PathError::UnsafeDeletePath(_))
//! ));
//! assert!(check_delete_target(Path::new("/srv/restore/web")).is_ok());
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from guarded path operations.
#[derive(Debug, Error)]
pub enum PathError {
    /// Refused to recursively delete an empty or root path.
    #[error("refusing to delete contents of unsafe path '{}'", .0.display())]
    UnsafeDeletePath(PathBuf),

    /// Removing or creating an entry failed.
    #[error("failed to clear '{}': {source}", path.display())]
    ClearFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Reject paths that must never be recursively cleared.
///
/// # Errors
///
/// Returns [`PathError::UnsafeDeletePath`] for an empty path or a path made
/// only of root, prefix and `.` components.
pub fn check_delete_target(path: &Path) -> Result<(), PathError> {
    if path.as_os_str().is_empty() {
        return Err(PathError::UnsafeDeletePath(path.to_path_buf()));
    }

    let has_named_component = path
        .components()
        .any(|c| matches!(c, Component::Normal(_) | Component::ParentDir));
    if !has_named_component {
        return Err(PathError::UnsafeDeletePath(path.to_path_buf()));
    }

    Ok(())
}

/// Remove everything inside `dir`, keeping `dir` itself.
///
/// # Errors
///
/// - [`PathError::UnsafeDeletePath`] if `dir` fails [`check_delete_target`]
/// - [`PathError::ClearFailed`] on the first entry that cannot be removed
pub fn clear_dir(dir: &Path) -> Result<(), PathError> {
    check_delete_target(dir)?;

    let failed = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| PathError::ClearFailed { path, source }
    };

    if !dir.exists() {
        debug!(dir = %dir.display(), "restore target missing, creating");
        return fs::create_dir_all(dir).map_err(failed(dir));
    }

    let entries = fs::read_dir(dir).map_err(failed(dir))?;
    for entry in entries {
        let entry = entry.map_err(failed(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(failed(&path))?;

        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(failed(&path))?;
        } else {
            fs::remove_file(&path).map_err(failed(&path))?;
        }
    }

    debug!(dir = %dir.display(), "cleared");
    Ok(())
}
