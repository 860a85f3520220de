//! Change tracking for store writes.
//!
//! This module provides `StoreDiff`, the set of records whose stored fields
//! were changed by a write. The query manager routes it to the observers that
//! read those records.

use crate::record::DataId;
use alloc::collections::btree_set::{self, BTreeSet};
use alloc::string::ToString;

/// Ids of records changed by one store operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreDiff {
    changed: BTreeSet<DataId>,
}

impl StoreDiff {
    /// Creates an empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change to a record.
    pub fn mark(&mut self, id: &str) {
        if !self.changed.contains(id) {
            self.changed.insert(id.to_string());
        }
    }

    /// Returns true if the record changed.
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.changed.contains(id)
    }

    /// Returns true if any of the given records changed.
    pub fn intersects(&self, ids: &BTreeSet<DataId>) -> bool {
        // Iterate the smaller set.
        if self.changed.len() <= ids.len() {
            self.changed.iter().any(|id| ids.contains(id))
        } else {
            ids.iter().any(|id| self.changed.contains(id))
        }
    }

    /// Folds another diff into this one.
    pub fn merge(&mut self, other: StoreDiff) {
        self.changed.extend(other.changed);
    }

    /// Iterates changed ids in order.
    pub fn ids(&self) -> btree_set::Iter<'_, DataId> {
        self.changed.iter()
    }

    /// Returns the number of changed records.
    #[inline]
    pub fn len(&self) -> usize {
        self.changed.len()
    }

    /// Returns true if nothing changed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for StoreDiff {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut diff = StoreDiff::new();
        for id in iter {
            diff.mark(id);
        }
        diff
    }
}
