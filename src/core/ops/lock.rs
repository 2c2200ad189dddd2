//! core::ops::lock
//!
//! Per-repository exclusive locks for borg invocations.
//!
//! # Architecture
//!
//! Borg itself refuses concurrent writers on one repository, and a second
//! invocation against a locked repository fails instead of waiting. The
//! [`LockRegistry`] serializes our own invocations up front: at most one
//! operation runs against a given repository location at a time, across all
//! threads that share the registry.
//!
//! The registry is an explicit object, owned by whoever builds the
//! executor, and shared via `Arc`. It maps a location string to a slot. The
//! create-if-absent step goes through a sharded [`DashMap`], so unrelated
//! repositories never contend on one global lock, and the map shard is
//! released before waiting on a slot.
//!
//! # Invariants
//!
//! - Slots are created on first use and never removed
//! - The guard is held for one whole executor invocation
//! - The guard is released on drop (RAII), including on error and panic paths
//! - Locations are compared byte-for-byte; no normalization
//!
//! # Example
//!
//! ```
//! use volborg::core::ops::lock::LockRegistry;
//!
//! let registry = LockRegistry::new();
//! {
//!     let guard = registry.acquire("/srv/borg/web");
//!     assert_eq!(guard.location(), "/srv/borg/web");
//!     assert!(registry.try_acquire("/srv/borg/web").is_none());
//!     // a different repository is not blocked
//!     assert!(registry.try_acquire("/srv/borg/db").is_some());
//! }
//! // released on drop
//! assert!(registry.try_acquire("/srv/borg/web").is_some());
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// Lock state for one repository location.
#[derive(Debug, Default)]
struct RepoSlot {
    /// True while a guard for this location is alive.
    held: Mutex<bool>,
    /// Signalled when the guard is dropped.
    released: Condvar,
}

/// Process-wide map from repository location to its exclusive lock.
#[derive(Debug, Default)]
pub struct LockRegistry {
    slots: DashMap<String, Arc<RepoSlot>>,
}

impl LockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Get or create the slot, returning an Arc so the map shard is released.
    fn slot(&self, location: &str) -> Arc<RepoSlot> {
        if let Some(slot) = self.slots.get(location) {
            return Arc::clone(slot.value());
        }
        let slot = self
            .slots
            .entry(location.to_string())
            .or_insert_with(|| Arc::new(RepoSlot::default()));
        Arc::clone(slot.value())
    }

    /// Block until the lock for `location` is free, then take it.
    pub fn acquire(&self, location: &str) -> RepoGuard {
        let slot = self.slot(location);
        {
            let mut held = slot.held.lock();
            while *held {
                trace!(%location, "waiting for repository lock");
                slot.released.wait(&mut held);
            }
            *held = true;
        }
        RepoGuard::new(location, slot)
    }

    /// Take the lock for `location` if nobody holds it.
    pub fn try_acquire(&self, location: &str) -> Option<RepoGuard> {
        let slot = self.slot(location);
        {
            let mut held = slot.held.lock();
            if *held {
                return None;
            }
            *held = true;
        }
        Some(RepoGuard::new(location, slot))
    }

    /// Check whether a guard for `location` is currently alive.
    pub fn is_locked(&self, location: &str) -> bool {
        self.slots
            .get(location)
            .map(|slot| *slot.held.lock())
            .unwrap_or(false)
    }
}

/// Exclusive hold on one repository.
///
/// The lock is released when this guard is dropped.
#[derive(Debug)]
pub struct RepoGuard {
    location: String,
    slot: Arc<RepoSlot>,
}

impl RepoGuard {
    fn new(location: &str, slot: Arc<RepoSlot>) -> Self {
        trace!(%location, "repository lock acquired");
        Self {
            location: location.to_string(),
            slot,
        }
    }

    /// The location this guard locks.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Drop for RepoGuard {
    fn drop(&mut self) {
        *self.slot.held.lock() = false;
        self.slot.released.notify_one();
        trace!(location = %self.location, "repository lock released");
    }
}
