//! Store configuration and entity identity.

use crate::record::DataId;
use alloc::format;
use alloc::string::{String, ToString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Controls how result objects are mapped to record ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Field holding an object's identity
    pub id_field: String,
    /// Field holding an object's type name
    pub typename_field: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            typename_field: "__typename".to_string(),
        }
    }
}

impl StoreConfig {
    /// Derives the data id of a result object.
    ///
    /// `Type:id` when both type name and id are present, the bare id when only
    /// the id is present, `None` when the object has no usable identity.
    pub fn identify(&self, object: &Map<String, Value>) -> Option<DataId> {
        let id = match object.get(&self.id_field)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        match object.get(&self.typename_field) {
            Some(Value::String(typename)) => Some(format!("{}:{}", typename, id)),
            _ => Some(id),
        }
    }
}
