//! Normalizes result data into records.
//!
//! Writes are staged first and applied in one pass, so a malformed result
//! leaves the cache untouched.

use crate::cache::NormalizedCache;
use crate::config::StoreConfig;
use crate::journal::StoreDiff;
use crate::record::{DataId, StoreValue, ROOT_QUERY};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use serde_json::{Map, Value};
use weft_core::{Error, Field, QueryDocument, Result, Variables};

type StagedRecords = BTreeMap<DataId, BTreeMap<String, StoreValue>>;

pub(crate) struct Writer<'a> {
    config: &'a StoreConfig,
    variables: Variables,
    staged: StagedRecords,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(config: &'a StoreConfig, document: &QueryDocument, variables: &Variables) -> Self {
        Self {
            config,
            variables: document.with_defaults(variables),
            staged: StagedRecords::new(),
        }
    }

    /// Stages `data` for the document's root selection.
    pub(crate) fn stage(mut self, document: &QueryDocument, data: &Value) -> Result<Self> {
        match data {
            Value::Null => Ok(self),
            Value::Object(root) => {
                self.stage_object(ROOT_QUERY, document.selection(), root);
                Ok(self)
            }
            other => Err(Error::malformed(format!(
                "expected an object as result data, got {}",
                type_name(other)
            ))),
        }
    }

    /// Applies staged fields, returning the ids whose fields changed.
    pub(crate) fn apply(self, cache: &mut NormalizedCache) -> StoreDiff {
        let mut diff = StoreDiff::new();
        for (id, fields) in self.staged {
            let (record, created) = cache.entry(&id);
            let mut changed = created;
            for (name, value) in fields {
                changed |= record.set(name, value);
            }
            if changed {
                diff.mark(&id);
            }
        }
        diff
    }

    fn stage_object(&mut self, id: &str, selection: &[Field], object: &Map<String, Value>) {
        // Touch the record so an empty selection still materializes it.
        self.staged.entry(id.into()).or_default();

        for field in selection {
            let value = match object.get(field.response_key()) {
                Some(value) => value,
                None => {
                    log::trace!("result for {} has no field {}", id, field.response_key());
                    continue;
                }
            };
            let store_name = field.store_field_name(&self.variables);
            let stored = self.stage_value(id, &store_name, field, value);
            self.staged
                .entry(id.into())
                .or_default()
                .insert(store_name, stored);
        }
    }

    fn stage_value(&mut self, parent: &str, path: &str, field: &Field, value: &Value) -> StoreValue {
        let selection = match field.selection() {
            Some(selection) => selection,
            None => return StoreValue::Scalar(value.clone()),
        };
        match value {
            Value::Object(object) => {
                let child = self
                    .config
                    .identify(object)
                    .unwrap_or_else(|| generated_id(parent, path));
                self.stage_object(&child, selection, object);
                StoreValue::Reference(child)
            }
            Value::Array(items) => {
                let base = generated_id(parent, path);
                let stored: Vec<StoreValue> = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let item_path = format!("{}", index);
                        self.stage_value(&base, &item_path, field, item)
                    })
                    .collect();
                StoreValue::List(stored)
            }
            other => StoreValue::Scalar(other.clone()),
        }
    }
}

/// Path id for objects without identity, e.g. `$ROOT_QUERY.viewer.friends.0`.
fn generated_id(parent: &str, path: &str) -> DataId {
    format!("${}.{}", parent.trim_start_matches('$'), path)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
