//! Request deduplication.
//!
//! At most one network request exists per `RequestKey`. Callers asking for a
//! key that is already outstanding join the existing request and observe the
//! same outcome.

use crate::transport::{Transport, TransportResponse};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use hashbrown::HashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use weft_core::{FetchPolicy, QueryDocument, Result, Variables};

/// Outcome of a settled request.
pub type FetchResult = Result<Rc<TransportResponse>>;

/// A shared handle to an outstanding request.
pub type InFlightRequest = Shared<LocalBoxFuture<'static, FetchResult>>;

/// Canonical identity of a network request.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    document: Rc<str>,
    variables: String,
    policy: FetchPolicy,
}

impl RequestKey {
    /// Builds a key from a printed document, the variables and the policy.
    ///
    /// Declared defaults are applied first, so omitting a defaulted variable
    /// and passing its default yield the same key.
    pub fn new(printed: Rc<str>, document: &QueryDocument, variables: &Variables, policy: FetchPolicy) -> Self {
        Self {
            document: printed,
            variables: document.with_defaults(variables).canonical(),
            policy,
        }
    }

    /// Returns the printed document.
    #[inline]
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Returns the canonical variables text.
    #[inline]
    pub fn variables(&self) -> &str {
        &self.variables
    }

    /// Returns the fetch policy.
    #[inline]
    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }
}

impl fmt::Debug for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{:?}]", self.document, self.variables, self.policy)
    }
}

type RequestTable = HashMap<RequestKey, InFlightRequest>;

/// Result of `Deduplicator::acquire`.
pub struct Acquisition {
    pub request: InFlightRequest,
    /// False when an outstanding request was joined
    pub created: bool,
}

/// Collapses equivalent outstanding requests into one transport call.
pub struct Deduplicator {
    transport: Rc<dyn Transport>,
    table: Rc<RefCell<RequestTable>>,
    enabled: bool,
}

impl Deduplicator {
    /// Creates a deduplicator over a transport.
    ///
    /// With `enabled` false every acquire starts a fresh request.
    pub fn new(transport: Rc<dyn Transport>, enabled: bool) -> Self {
        Self {
            transport,
            table: Rc::new(RefCell::new(RequestTable::new())),
            enabled,
        }
    }

    /// Joins the outstanding request for `key`, or starts one.
    ///
    /// When a request is started, `on_settle` runs exactly once with the
    /// transport outcome, after the entry has left the table, and its return
    /// value becomes the outcome seen by every joiner. Joiners never run their
    /// own `on_settle`.
    pub fn acquire<F>(&self, key: RequestKey, document: &QueryDocument, variables: &Variables, on_settle: F) -> Acquisition
    where
        F: FnOnce(FetchResult) -> FetchResult + 'static,
    {
        if self.enabled {
            if let Some(existing) = self.table.borrow().get(&key) {
                log::debug!("joined in-flight request {:?}", key);
                return Acquisition {
                    request: existing.clone(),
                    created: false,
                };
            }
        }

        log::debug!("starting request {:?}", key);
        let response = self.transport.execute(document, variables);
        let table = Rc::downgrade(&self.table);
        let settled_key = key.clone();
        let enabled = self.enabled;

        let request = async move {
            let outcome = response.await.map(Rc::new);
            if enabled {
                if let Some(table) = table.upgrade() {
                    table.borrow_mut().remove(&settled_key);
                }
            }
            match &outcome {
                Ok(_) => log::debug!("request {:?} settled", settled_key),
                Err(err) => log::debug!("request {:?} failed: {}", settled_key, err),
            }
            on_settle(outcome)
        }
        .boxed_local()
        .shared();

        if self.enabled {
            self.table.borrow_mut().insert(key, request.clone());
        }
        Acquisition { request, created: true }
    }

    /// Drops the table entry for `key` without settling it.
    ///
    /// Used when nothing will ever poll the request.
    pub fn forget(&self, key: &RequestKey) -> bool {
        self.table.borrow_mut().remove(key).is_some()
    }

    /// Returns true if a request for `key` is outstanding.
    pub fn is_in_flight(&self, key: &RequestKey) -> bool {
        self.table.borrow().contains_key(key)
    }

    /// Returns the number of outstanding requests.
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    /// Returns true if nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    /// Returns true if equivalent requests are collapsed.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
