//! Per-register wait entries: one lock plus condition per name.
//!
//! Every operation on a register — read, CAS write, long-poll — serializes
//! through that register's [`WaitEntry`]. Entries are created on first
//! reference and retained for the life of the process; the map only grows
//! with the count of distinct names ever referenced, which is bounded by the
//! 32-character alphanumeric name format, not by request volume.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, MutexGuard, Notify};

/// The lock+condition pair synchronizing all operations on one register.
#[derive(Debug, Default)]
pub struct WaitEntry {
    lock: Mutex<()>,
    changed: Notify,
}

impl WaitEntry {
    /// Acquire the register's lock. Released when the guard drops, on every
    /// exit path including cancellation.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Future resolving on the next [`WaitRegistry::notify_all`] for this
    /// register.
    ///
    /// The caller must pin the future and call `enable` on it *before*
    /// dropping the lock, so a notification fired between the predicate
    /// check and the suspension is not missed. `Notify::notify_waiters`
    /// wakes registered waiters only.
    pub fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }
}

/// Owns the unique [`WaitEntry`] for each register name.
///
/// Created once at startup and shared; exposes only `entry_for` and
/// `notify_all` so no caller can touch a condition outside its entry.
#[derive(Debug, Default)]
pub struct WaitRegistry {
    entries: SyncMutex<HashMap<String, Arc<WaitEntry>>>,
}

impl WaitRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The unique entry for `name`, created on first reference.
    ///
    /// Concurrent first references to a new name observe the same entry:
    /// the insert happens under the registry's internal lock.
    pub fn entry_for(&self, name: &str) -> Arc<WaitEntry> {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(name.to_owned()).or_default())
    }

    /// Wake every task currently suspended in a wait on `name`.
    pub fn notify_all(&self, name: &str) {
        self.entry_for(name).changed.notify_waiters();
    }
}
