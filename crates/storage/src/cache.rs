//! Record cache for Weft.
//!
//! This module provides the `NormalizedCache` struct which holds every
//! normalized record, keyed by data id.

use crate::record::{DataId, NormalizedRecord};
use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::vec::Vec;

/// Record map backend: HashMap (O(1) lookup) or BTreeMap (O(log n) lookup).
#[cfg(feature = "hash-store")]
type RecordMap = hashbrown::HashMap<DataId, NormalizedRecord>;
#[cfg(not(feature = "hash-store"))]
type RecordMap = BTreeMap<DataId, NormalizedRecord>;

/// A serializable copy of every record, used for extract/restore.
pub type CacheSnapshot = BTreeMap<DataId, NormalizedRecord>;

/// Cache of normalized records.
#[derive(Default)]
pub struct NormalizedCache {
    /// Data id → record mapping.
    records: RecordMap,
}

impl NormalizedCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self {
            records: RecordMap::default(),
        }
    }

    /// Gets a record by id.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&NormalizedRecord> {
        self.records.get(id)
    }

    /// Gets a record for update, creating it if missing.
    ///
    /// The flag is true if the record was created by this call.
    pub fn entry(&mut self, id: &str) -> (&mut NormalizedRecord, bool) {
        let created = !self.records.contains_key(id);
        let record = self.records.entry(id.to_string()).or_default();
        (record, created)
    }

    /// Removes a record.
    pub fn remove(&mut self, id: &str) -> Option<NormalizedRecord> {
        self.records.remove(id)
    }

    /// Checks if a record exists.
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns all record ids.
    pub fn ids(&self) -> Vec<&str> {
        self.records.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the total field count across all records.
    pub fn total_field_count(&self) -> usize {
        self.records.values().map(|r| r.len()).sum()
    }

    /// Removes all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Copies every record into an ordered snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.records
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    /// Replaces all records with the snapshot contents.
    pub fn replace(&mut self, snapshot: CacheSnapshot) {
        self.records = snapshot.into_iter().collect();
    }
}
