//! Client configuration.

use serde::Deserialize;
use weft_core::{Error, Result};
use weft_storage::StoreConfig;

/// Configuration of a `QueryManager`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Entity identity rules of the store
    pub store: StoreConfig,
    /// Collapse equivalent outstanding requests
    pub query_deduplication: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            query_deduplication: true,
        }
    }
}

impl ClientConfig {
    /// Parses a JSON configuration. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::configuration(format!("invalid client config: {}", e)))
    }
}
