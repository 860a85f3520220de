//! Network transport seam.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use weft_core::{Error, GraphError, QueryDocument, Result, Variables};

/// A response in the standard `{data, errors}` shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    /// Result data; absent when the server produced none
    #[serde(default)]
    pub data: Option<Value>,
    /// Server reported errors, in server order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphError>,
}

impl TransportResponse {
    /// Creates a response carrying only data.
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Creates a response carrying only errors.
    pub fn errors(errors: Vec<GraphError>) -> Self {
        Self { data: None, errors }
    }

    /// Parses a response body.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::malformed(e.to_string()))
    }
}

/// Executes query documents against a server.
///
/// Implementations resolve with `Err(Error::Transport)` on network failure.
/// Server reported errors belong in `TransportResponse::errors`.
pub trait Transport {
    fn execute(&self, document: &QueryDocument, variables: &Variables) -> LocalBoxFuture<'static, Result<TransportResponse>>;
}
