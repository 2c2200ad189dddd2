//! core::ops
//!
//! Coordination primitives for repository operations.
//!
//! # Modules
//!
//! - [`lock`] - Per-repository exclusive lock registry
//!
//! # Architecture
//!
//! Every borg invocation:
//! 1. Acquires the repository's guard from the shared [`LockRegistry`]
//! 2. Spawns and waits for the process
//! 3. Drops the guard, whatever the outcome

pub mod lock;

pub use lock::{LockRegistry, RepoGuard};
