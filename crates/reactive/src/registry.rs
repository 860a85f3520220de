//! Store watcher registry.
//!
//! This module provides `WatchRegistry`, which tracks the live observable
//! queries of a client and routes store diffs to the ones that read the
//! changed records.

use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use weft_storage::StoreDiff;

/// Unique identifier for a registered watcher.
pub type WatchId = u64;

/// A query that reacts to store changes.
pub trait StoreWatcher {
    /// Returns true if the diff touches a record this watcher last read.
    fn is_affected_by(&self, diff: &StoreDiff) -> bool;

    /// Called after a write changed records this watcher depends on.
    fn on_store_change(&self);

    /// Called after the store was cleared.
    fn on_store_reset(&self);
}

/// A registry of store watchers, held weakly.
///
/// Watchers are returned in registration order. The registry never calls
/// back into a watcher beyond `is_affected_by`, so callers can release their
/// borrow of the registry before notifying.
pub struct WatchRegistry {
    /// Watch ID -> watcher
    watchers: BTreeMap<WatchId, Weak<dyn StoreWatcher>>,
    /// Next watch ID to assign
    next_id: WatchId,
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchRegistry {
    /// Creates a new registry.
    pub fn new() -> Self {
        Self {
            watchers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Registers a watcher and returns its ID.
    pub fn register(&mut self, watcher: Weak<dyn StoreWatcher>) -> WatchId {
        let id = self.next_id;
        self.next_id += 1;
        self.watchers.insert(id, watcher);
        id
    }

    /// Unregisters a watcher by ID.
    ///
    /// Returns true if the watcher was found and removed.
    pub fn unregister(&mut self, id: WatchId) -> bool {
        if self.watchers.remove(&id).is_some() {
            // Clean up stale weak references
            self.cleanup();
            true
        } else {
            false
        }
    }

    /// Returns the live watchers affected by a diff.
    pub fn affected(&self, diff: &StoreDiff) -> Vec<Rc<dyn StoreWatcher>> {
        if diff.is_empty() {
            return Vec::new();
        }
        self.watchers
            .values()
            .filter_map(Weak::upgrade)
            .filter(|watcher| watcher.is_affected_by(diff))
            .collect()
    }

    /// Returns every live watcher.
    pub fn watchers(&self) -> Vec<Rc<dyn StoreWatcher>> {
        self.watchers.values().filter_map(Weak::upgrade).collect()
    }

    /// Cleans up stale weak references.
    pub fn cleanup(&mut self) {
        self.watchers.retain(|_, w| w.strong_count() > 0);
    }
}
