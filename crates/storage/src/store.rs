//! The normalized store.

use crate::cache::{CacheSnapshot, NormalizedCache};
use crate::config::StoreConfig;
use crate::journal::StoreDiff;
use crate::reader::{DiffResult, Reader};
use crate::record::NormalizedRecord;
use crate::writer::Writer;
use weft_core::{QueryDocument, Result, Value, Variables};

/// Normalized cache of query results.
///
/// Results are split into per-entity records on write and reassembled on
/// read, so overlapping queries observe each other's updates.
#[derive(Default)]
pub struct Store {
    cache: NormalizedCache,
    config: StoreConfig,
}

impl Store {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            cache: NormalizedCache::new(),
            config,
        }
    }

    /// Reads the document's result shape from the store.
    ///
    /// Never fails: missing records or fields yield an incomplete result.
    pub fn diff(&self, document: &QueryDocument, variables: &Variables, return_partial: bool) -> DiffResult {
        Reader::new(&self.cache, document, variables).read(document, return_partial)
    }

    /// Normalizes `data` into the store.
    ///
    /// Returns the ids of records whose stored fields changed. On error the
    /// store is unchanged.
    pub fn write(&mut self, document: &QueryDocument, variables: &Variables, data: &Value) -> Result<StoreDiff> {
        let diff = Writer::new(&self.config, document, variables)
            .stage(document, data)?
            .apply(&mut self.cache);
        if !diff.is_empty() {
            log::debug!("store write changed {} record(s)", diff.len());
        }
        Ok(diff)
    }

    /// Gets a record by id.
    #[inline]
    pub fn record(&self, id: &str) -> Option<&NormalizedRecord> {
        self.cache.get(id)
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if the store holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Copies every record out of the store.
    pub fn extract(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    /// Replaces the store contents with a snapshot.
    ///
    /// Every id present before or after the restore is reported as changed.
    pub fn restore(&mut self, snapshot: CacheSnapshot) -> StoreDiff {
        let mut diff: StoreDiff = self.cache.ids().into_iter().collect();
        for id in snapshot.keys() {
            diff.mark(id);
        }
        self.cache.replace(snapshot);
        diff
    }

    /// Returns the store configuration.
    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
