//! Normalized records.
//!
//! A record holds the stored fields of one logical entity. Object-valued
//! fields are stored as references to other records, so several queries
//! reading the same entity share a single copy of its fields.

use alloc::collections::btree_map::{self, BTreeMap};
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a normalized record.
pub type DataId = String;

/// Id of the record holding root query fields.
pub const ROOT_QUERY: &str = "ROOT_QUERY";

/// A stored field value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreValue {
    /// Leaf value, or null in place of an object
    Scalar(Value),
    /// Link to another record
    Reference(DataId),
    /// List of object fields
    List(Vec<StoreValue>),
}

impl StoreValue {
    /// Returns the referenced id if this is a reference.
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            StoreValue::Reference(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Returns the scalar if this is a scalar.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            StoreValue::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

/// Stored fields of one entity, keyed by store field name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, StoreValue>,
}

impl NormalizedRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a field by store field name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&StoreValue> {
        self.fields.get(name)
    }

    /// Sets a field. Returns true if the stored value changed.
    pub fn set(&mut self, name: String, value: StoreValue) -> bool {
        match self.fields.get(&name) {
            Some(existing) if *existing == value => false,
            _ => {
                self.fields.insert(name, value);
                true
            }
        }
    }

    /// Removes a field.
    pub fn remove(&mut self, name: &str) -> Option<StoreValue> {
        self.fields.remove(name)
    }

    /// Returns the number of stored fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in name order.
    pub fn fields(&self) -> btree_map::Iter<'_, String, StoreValue> {
        self.fields.iter()
    }
}
