//! volborg - borg backups for storage volumes
//!
//! volborg runs the borg backup tool against one repository per storage
//! volume: preparing the repository, creating archives, restoring them into
//! a folder, deleting them and applying retention rules.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Composes, spawns and classifies borg invocations
//! - [`core`] - Domain types, configuration, path guards and repository locks
//! - [`logging`] - tracing subscriber setup
//!
//! # Correctness Invariants
//!
//! 1. At most one borg process runs per repository location at a time
//! 2. Archive names never carry a path prefix into borg's arguments
//! 3. A restore never clears the filesystem root
//! 4. Exit code 1 from borg is a warning, not a failure

pub mod cli;
pub mod core;
pub mod engine;
pub mod logging;
