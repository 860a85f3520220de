//! Per-query options.

use serde::Deserialize;
use weft_core::{FetchPolicy, QueryDocument, Variables};

/// Options of a watched query.
#[derive(Clone, Debug, PartialEq)]
pub struct WatchOptions {
    /// The query to observe
    pub document: QueryDocument,
    /// Variables; empty by default
    pub variables: Variables,
    /// Poll interval in milliseconds; 0 disables polling
    pub poll_interval: u64,
    /// Cache-vs-network strategy
    pub fetch_policy: FetchPolicy,
    /// Surface incomplete store data instead of `{}`
    pub return_partial_data: bool,
}

impl WatchOptions {
    /// Creates options with defaults for everything but the document.
    pub fn new(document: QueryDocument) -> Self {
        Self {
            document,
            variables: Variables::new(),
            poll_interval: 0,
            fetch_policy: FetchPolicy::CacheFirst,
            return_partial_data: false,
        }
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval = ms;
        self
    }

    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    pub fn return_partial_data(mut self, enabled: bool) -> Self {
        self.return_partial_data = enabled;
        self
    }
}

/// A partial update of `WatchOptions`. Unset fields are left unchanged.
///
/// Deserializes from `{variables, pollInterval, fetchPolicy, returnPartialData}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsPatch {
    pub variables: Option<Variables>,
    pub poll_interval: Option<u64>,
    pub fetch_policy: Option<FetchPolicy>,
    pub return_partial_data: Option<bool>,
}

impl OptionsPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval = Some(ms);
        self
    }

    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = Some(policy);
        self
    }

    pub fn return_partial_data(mut self, enabled: bool) -> Self {
        self.return_partial_data = Some(enabled);
        self
    }

    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.variables.is_none()
            && self.poll_interval.is_none()
            && self.fetch_policy.is_none()
            && self.return_partial_data.is_none()
    }
}
