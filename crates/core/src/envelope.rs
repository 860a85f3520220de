//! Result envelopes delivered to subscribers.
//!
//! A `ResultEnvelope` is the unit handed to observers and returned by
//! synchronous reads: the data resolved so far, whether a fetch is still
//! outstanding, and any errors reported by the last fetch.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An error reported by the server (or synthesized from a transport failure).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphError {
    /// Human readable description
    pub message: String,
    /// Response path of the failing field, if known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    /// Server supplied extensions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Attaches a response path.
    pub fn with_path(mut self, path: Vec<Value>) -> Self {
        self.path = path;
        self
    }
}

/// A snapshot of a query result.
///
/// Two envelopes are equal iff `data`, `loading` and `errors` are deep-equal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Resolved data; an empty object when nothing can be surfaced
    pub data: Value,
    /// Whether a fetch for this query is still outstanding
    pub loading: bool,
    /// Errors from the last settled fetch, in server order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphError>,
}

impl Default for ResultEnvelope {
    fn default() -> Self {
        Self::ready(empty_data())
    }
}

impl ResultEnvelope {
    /// Creates a settled envelope.
    pub fn ready(data: Value) -> Self {
        Self {
            data,
            loading: false,
            errors: Vec::new(),
        }
    }

    /// Creates an envelope for a fetch that is still outstanding.
    pub fn loading(data: Value) -> Self {
        Self {
            data,
            loading: true,
            errors: Vec::new(),
        }
    }

    /// Replaces the error list.
    pub fn with_errors(mut self, errors: Vec<GraphError>) -> Self {
        self.errors = errors;
        self
    }

    /// Returns true if any errors are attached.
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if `data` carries no fields.
    pub fn is_empty(&self) -> bool {
        is_empty_data(&self.data)
    }
}

/// The `{}` value used when nothing can be surfaced.
#[inline]
pub fn empty_data() -> Value {
    Value::Object(Map::new())
}

/// Returns true for null and for an object with no fields.
pub fn is_empty_data(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
