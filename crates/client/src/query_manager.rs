//! Query manager.
//!
//! The `QueryManager` owns the normalized store, the request deduplicator and
//! the watch registry of one client instance. Every `ObservableQuery` it
//! creates shares them, so equivalent queries share one request and one
//! cache.

use crate::config::ClientConfig;
use crate::dedup::{Acquisition, Deduplicator, FetchResult, RequestKey};
use crate::observable::ObservableQuery;
use crate::options::WatchOptions;
use crate::transport::Transport;
use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use weft_core::{empty_data, Error, FetchPolicy, QueryDocument, Result, ResultEnvelope, Value, Variables};
use weft_reactive::{Scheduler, WatchRegistry};
use weft_storage::{CacheSnapshot, DiffResult, Store, StoreDiff};

/// State shared by a manager and its observable queries.
pub(crate) struct ManagerInner {
    pub(crate) store: RefCell<Store>,
    pub(crate) dedup: Deduplicator,
    pub(crate) registry: RefCell<WatchRegistry>,
    pub(crate) scheduler: Rc<dyn Scheduler>,
    spawner: Rc<dyn LocalSpawn>,
    config: ClientConfig,
}

impl ManagerInner {
    /// Printed form of a document, used in request keys.
    pub(crate) fn document_key(document: &QueryDocument) -> Rc<str> {
        Rc::from(document.to_string())
    }

    /// Acquires a request whose settlement writes into the store and
    /// broadcasts the changed records.
    pub(crate) fn fetch(self: &Rc<Self>, key: RequestKey, document: &QueryDocument, variables: &Variables) -> Acquisition {
        let manager = Rc::downgrade(self);
        let settle_document = document.clone();
        let settle_variables = variables.clone();
        self.dedup.acquire(key, document, variables, move |outcome| match manager.upgrade() {
            Some(manager) => manager.write_response(&settle_document, &settle_variables, outcome),
            None => outcome,
        })
    }

    fn write_response(&self, document: &QueryDocument, variables: &Variables, outcome: FetchResult) -> FetchResult {
        let response = outcome?;
        if let Some(data) = &response.data {
            let written = self.store.borrow_mut().write(document, variables, data);
            match written {
                Ok(diff) => self.broadcast(&diff),
                Err(err) => {
                    log::warn!("discarding response for {}: {}", document.operation_name().unwrap_or("<anonymous>"), err);
                    return Err(err);
                }
            }
        }
        Ok(response)
    }

    /// Notifies every watcher that read a changed record.
    pub(crate) fn broadcast(&self, diff: &StoreDiff) {
        let affected = self.registry.borrow().affected(diff);
        if !affected.is_empty() {
            log::trace!("store change reaches {} watcher(s)", affected.len());
        }
        for watcher in affected {
            watcher.on_store_change();
        }
    }

    pub(crate) fn spawn<F>(&self, task: F) -> Result<()>
    where
        F: Future<Output = ()> + 'static,
    {
        self.spawner
            .spawn_local(task)
            .map_err(|e| Error::executor(format!("failed to spawn fetch: {}", e)))
    }
}

/// Builds the envelope for a settled fetch.
///
/// Data comes from the store; when the store cannot satisfy the selection the
/// raw response data is used instead.
pub(crate) fn settled_envelope(diff: DiffResult, outcome: &FetchResult) -> ResultEnvelope {
    match outcome {
        Ok(response) => {
            let data = match (&response.data, diff.complete) {
                (Some(data), false) if !data.is_null() && is_empty_object(&diff.data) => data.clone(),
                _ => diff.data,
            };
            ResultEnvelope::ready(data).with_errors(response.errors.clone())
        }
        Err(err) => ResultEnvelope::ready(diff.data).with_errors(err.to_graph_errors()),
    }
}

fn is_empty_object(data: &Value) -> bool {
    matches!(data, Value::Object(map) if map.is_empty())
}

/// Coordinator of one client instance.
///
/// # Example
///
/// ```rust
/// use futures::executor::LocalPool;
/// use futures::future::{FutureExt, LocalBoxFuture};
/// use serde_json::json;
/// use std::rc::Rc;
/// use weft_client::{QueryManager, Transport, TransportResponse, WatchOptions};
/// use weft_core::{Field, QueryDocument, ResultEnvelope, Result, Variables};
/// use weft_reactive::ManualScheduler;
///
/// struct Static;
///
/// impl Transport for Static {
///     fn execute(&self, _: &QueryDocument, _: &Variables) -> LocalBoxFuture<'static, Result<TransportResponse>> {
///         async { Ok(TransportResponse::data(json!({"viewer": {"id": "1"}}))) }.boxed_local()
///     }
/// }
///
/// let mut pool = LocalPool::new();
/// let manager = QueryManager::new(Rc::new(Static), Rc::new(pool.spawner()), Rc::new(ManualScheduler::new()));
///
/// let doc = QueryDocument::query("Viewer").field(Field::new("viewer").select([Field::new("id")]));
/// let query = manager.watch_query(WatchOptions::new(doc)).unwrap();
/// let _subscription = query.subscribe(|env: &ResultEnvelope| println!("{:?}", env.data));
///
/// pool.run_until_stalled();
/// assert_eq!(query.current_result().data, json!({"viewer": {"id": "1"}}));
/// ```
pub struct QueryManager {
    inner: Rc<ManagerInner>,
}

impl QueryManager {
    /// Creates a manager with the default configuration.
    pub fn new(transport: Rc<dyn Transport>, spawner: Rc<dyn LocalSpawn>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_config(ClientConfig::default(), transport, spawner, scheduler)
    }

    /// Creates a manager.
    ///
    /// `spawner` drives settlement tasks and `scheduler` drives poll ticks.
    pub fn with_config(
        config: ClientConfig,
        transport: Rc<dyn Transport>,
        spawner: Rc<dyn LocalSpawn>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let inner = ManagerInner {
            store: RefCell::new(Store::new(config.store.clone())),
            dedup: Deduplicator::new(transport, config.query_deduplication),
            registry: RefCell::new(WatchRegistry::new()),
            scheduler,
            spawner,
            config,
        };
        Self { inner: Rc::new(inner) }
    }

    /// Resolves a query once.
    ///
    /// Missing required variables resolve to a configuration error. Transport
    /// and server errors are reported in the envelope's `errors`.
    pub fn query(
        &self,
        document: &QueryDocument,
        variables: &Variables,
        fetch_policy: FetchPolicy,
    ) -> LocalBoxFuture<'static, Result<ResultEnvelope>> {
        if let Err(err) = document.validate_variables(variables) {
            return future::ready(Err(err)).boxed_local();
        }
        let inner = self.inner.clone();
        let document = document.clone();
        let variables = variables.clone();

        async move {
            if fetch_policy.uses_cache() {
                let diff = inner.store.borrow().diff(&document, &variables, false);
                if diff.complete {
                    return Ok(ResultEnvelope::ready(diff.data));
                }
            }
            let key = RequestKey::new(ManagerInner::document_key(&document), &document, &variables, fetch_policy);
            let outcome = inner.fetch(key, &document, &variables).request.await;
            let diff = inner.store.borrow().diff(&document, &variables, false);
            Ok(settled_envelope(diff, &outcome))
        }
        .boxed_local()
    }

    /// Creates an observable query.
    ///
    /// Nothing is fetched until the first subscriber attaches.
    pub fn watch_query(&self, options: WatchOptions) -> Result<ObservableQuery> {
        options.document.validate_variables(&options.variables)?;
        Ok(ObservableQuery::new(self.inner.clone(), options))
    }

    /// Writes result data into the store and notifies affected queries.
    pub fn write_query(&self, document: &QueryDocument, variables: &Variables, data: &Value) -> Result<StoreDiff> {
        let diff = self.inner.store.borrow_mut().write(document, variables, data)?;
        self.inner.broadcast(&diff);
        Ok(diff)
    }

    /// Reads a query from the store without touching the network.
    pub fn read_query(&self, document: &QueryDocument, variables: &Variables) -> DiffResult {
        self.inner.store.borrow().diff(document, variables, false)
    }

    /// Clears the store and refetches every active query.
    pub fn reset_store(&self) {
        self.inner.store.borrow_mut().clear();
        let watchers = self.inner.registry.borrow().watchers();
        log::debug!("store reset, refetching {} watcher(s)", watchers.len());
        for watcher in watchers {
            watcher.on_store_reset();
        }
    }

    /// Copies every record out of the store.
    pub fn extract(&self) -> CacheSnapshot {
        self.inner.store.borrow().extract()
    }

    /// Replaces the store contents and notifies affected queries.
    pub fn restore(&self, snapshot: CacheSnapshot) {
        let diff = self.inner.store.borrow_mut().restore(snapshot);
        self.inner.broadcast(&diff);
    }

    /// Returns the number of outstanding requests.
    pub fn in_flight_count(&self) -> usize {
        self.inner.dedup.len()
    }

    /// Returns the number of live observable queries with subscribers.
    pub fn watcher_count(&self) -> usize {
        self.inner.registry.borrow().watchers().len()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

/// Envelope reported when a fetch was dropped before it settled.
pub(crate) fn dropped_envelope() -> ResultEnvelope {
    ResultEnvelope::ready(empty_data())
        .with_errors(Error::executor("query was dropped before its fetch settled").to_graph_errors())
}
