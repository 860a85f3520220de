//! Reads a query's result shape out of the normalized records.

use crate::cache::NormalizedCache;
use crate::record::{DataId, StoreValue, ROOT_QUERY};
use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde_json::{Map, Value};
use weft_core::{empty_data, Field, QueryDocument, Variables};

/// Outcome of reading a query against the store.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffResult {
    /// True if every selected field was present
    pub complete: bool,
    /// Result-shaped data; `{}` when incomplete and partial data was not asked for
    pub data: Value,
    /// Ids of every record visited during the read
    pub dependencies: BTreeSet<DataId>,
}

/// Single-pass reader over a cache.
pub(crate) struct Reader<'a> {
    cache: &'a NormalizedCache,
    variables: Variables,
    complete: bool,
    dependencies: BTreeSet<DataId>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(cache: &'a NormalizedCache, document: &QueryDocument, variables: &Variables) -> Self {
        Self {
            cache,
            variables: document.with_defaults(variables),
            complete: true,
            dependencies: BTreeSet::new(),
        }
    }

    /// Reads the document's root selection.
    pub(crate) fn read(mut self, document: &QueryDocument, return_partial: bool) -> DiffResult {
        let data = self.read_record(ROOT_QUERY, document.selection());
        let data = if self.complete || return_partial {
            Value::Object(data)
        } else {
            empty_data()
        };
        DiffResult {
            complete: self.complete,
            data,
            dependencies: self.dependencies,
        }
    }

    fn read_record(&mut self, id: &str, selection: &[Field]) -> Map<String, Value> {
        self.dependencies.insert(id.to_string());
        let mut out = Map::new();
        let record = match self.cache.get(id) {
            Some(record) => record,
            None => {
                self.complete = false;
                return out;
            }
        };

        for field in selection {
            let store_name = field.store_field_name(&self.variables);
            match record.get(&store_name) {
                Some(value) => {
                    let value = self.read_value(value, field);
                    out.insert(field.response_key().to_string(), value);
                }
                None => {
                    log::trace!("missing field {} on {}", store_name, id);
                    self.complete = false;
                }
            }
        }
        out
    }

    fn read_value(&mut self, value: &StoreValue, field: &Field) -> Value {
        match value {
            StoreValue::Scalar(v) => v.clone(),
            StoreValue::Reference(id) => match field.selection() {
                Some(selection) => Value::Object(self.read_record(id, selection)),
                None => {
                    // A leaf selection cannot expand an object.
                    self.complete = false;
                    Value::Null
                }
            },
            StoreValue::List(items) => {
                let values: Vec<Value> = items.iter().map(|item| self.read_value(item, field)).collect();
                Value::Array(values)
            }
        }
    }
}
