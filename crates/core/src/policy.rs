//! Fetch policies.

use serde::{Deserialize, Serialize};

/// Cache-vs-network resolution strategy for a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Answer from the store when it holds a complete result, else fetch.
    #[default]
    CacheFirst,
    /// Always fetch, even when the store could answer (legacy `forceFetch`).
    ForceNetwork,
}

impl FetchPolicy {
    /// Returns true if the store may short-circuit the network.
    #[inline]
    pub fn uses_cache(self) -> bool {
        matches!(self, FetchPolicy::CacheFirst)
    }
}
