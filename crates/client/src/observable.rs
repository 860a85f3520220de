//! Observable queries.
//!
//! An `ObservableQuery` binds a document and its variables to a stream of
//! result envelopes. It moves along two independent axes: subscribed or not,
//! and idle or fetching. The first subscriber starts it, the last
//! unsubscribe tears it down.
//!
//! State lives in a `RefCell` that is never borrowed while observers run, so
//! observers may call back into the query. Envelopes produced by such calls
//! are queued and reach every subscriber in production order.

use crate::dedup::{Acquisition, FetchResult, RequestKey};
use crate::options::{OptionsPatch, WatchOptions};
use crate::query_manager::{dropped_envelope, settled_envelope, ManagerInner};
use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, VecDeque};
use std::rc::{Rc, Weak};
use weft_core::{empty_data, is_empty_data, FetchPolicy, GraphError, Result, ResultEnvelope, Value, Variables};
use weft_reactive::{
    Observer, PollScheduler, ResultNotifier, StoreWatcher, SubscriptionId, SubscriptionManager, WatchId,
};
use weft_storage::{DataId, DiffResult, StoreDiff};

/// Resolves with the envelope produced once a fetch settles.
pub type QueryFuture = LocalBoxFuture<'static, ResultEnvelope>;

struct QueryState {
    options: WatchOptions,
    /// Printed document, shared by every request key of this query
    document_key: Rc<str>,
    subscribers: SubscriptionManager,
    notifier: ResultNotifier,
    poll: PollScheduler,
    /// Key of the outstanding fetch; only its settlement is applied
    in_flight: Option<RequestKey>,
    /// Last settled envelope
    last_result: Option<ResultEnvelope>,
    last_errors: Vec<GraphError>,
    /// Records read by the last diff
    dependencies: BTreeSet<DataId>,
    watch_id: Option<WatchId>,
}

pub(crate) struct ObservableInner {
    manager: Rc<ManagerInner>,
    this: Weak<ObservableInner>,
    state: RefCell<QueryState>,
    /// Pending deliveries, `None` targets every subscriber
    outbox: RefCell<VecDeque<(Option<SubscriptionId>, ResultEnvelope)>>,
    delivering: Cell<bool>,
}

/// A live query.
///
/// Cloning yields another handle to the same query.
#[derive(Clone)]
pub struct ObservableQuery {
    inner: Rc<ObservableInner>,
}

/// Handle returned by `ObservableQuery::subscribe`.
///
/// Keeps the query alive. Dropping the handle does not unsubscribe.
pub struct Subscription {
    query: Rc<ObservableInner>,
    id: SubscriptionId,
}

impl Subscription {
    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Detaches the observer. The last unsubscribe stops the query.
    pub fn unsubscribe(self) -> bool {
        self.query.unsubscribe(self.id)
    }
}

impl ObservableQuery {
    pub(crate) fn new(manager: Rc<ManagerInner>, options: WatchOptions) -> Self {
        let mut poll = PollScheduler::new(manager.scheduler.clone());
        poll.set_interval(options.poll_interval);
        let state = QueryState {
            document_key: ManagerInner::document_key(&options.document),
            options,
            subscribers: SubscriptionManager::new(),
            notifier: ResultNotifier::new(),
            poll,
            in_flight: None,
            last_result: None,
            last_errors: Vec::new(),
            dependencies: BTreeSet::new(),
            watch_id: None,
        };
        let inner = Rc::new_cyclic(|this| ObservableInner {
            manager,
            this: this.clone(),
            state: RefCell::new(state),
            outbox: RefCell::new(VecDeque::new()),
            delivering: Cell::new(false),
        });
        Self { inner }
    }

    /// Attaches an observer.
    ///
    /// The first subscriber starts the query: a complete cached result is
    /// delivered at once, otherwise a fetch is issued. Later subscribers
    /// receive the current result immediately if one has been produced.
    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: Observer + 'static,
    {
        let id = self.inner.subscribe(Rc::new(observer));
        Subscription {
            query: self.inner.clone(),
            id,
        }
    }

    /// Returns the current result without touching the network.
    pub fn current_result(&self) -> ResultEnvelope {
        self.inner.current_result()
    }

    /// Applies a partial options update.
    ///
    /// Returns a future when the update started a fetch or changed the
    /// variables. Fails without changing anything if the new variables
    /// lack required values.
    pub fn set_options(&self, patch: OptionsPatch) -> Result<Option<QueryFuture>> {
        self.inner.set_options(patch)
    }

    /// Replaces the variables.
    ///
    /// Returns `None` when the variables are unchanged or the query has no
    /// subscribers.
    pub fn set_variables(&self, variables: Variables) -> Result<Option<QueryFuture>> {
        self.inner.set_variables(variables)
    }

    /// Fetches from the network, bypassing the store.
    pub fn refetch(&self, variables: Option<Variables>) -> Result<QueryFuture> {
        self.inner.refetch(variables)
    }

    /// Polls every `ms` milliseconds.
    pub fn start_polling(&self, ms: u64) {
        self.inner.set_poll_interval(ms);
    }

    pub fn stop_polling(&self) {
        self.inner.set_poll_interval(0);
    }

    /// Returns a copy of the current options.
    pub fn options(&self) -> WatchOptions {
        self.inner.state.borrow().options.clone()
    }

    pub fn variables(&self) -> Variables {
        self.inner.state.borrow().options.variables.clone()
    }

    pub fn poll_interval(&self) -> u64 {
        self.inner.state.borrow().poll.interval()
    }

    /// Returns true if a poll tick is pending.
    pub fn is_polling(&self) -> bool {
        self.inner.state.borrow().poll.is_armed()
    }

    /// Returns true while a fetch is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.inner.state.borrow().in_flight.is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.state.borrow().subscribers.len()
    }
}

impl ObservableInner {
    fn subscribe(&self, observer: Rc<dyn Observer>) -> SubscriptionId {
        let (id, first, produced) = {
            let mut state = self.state.borrow_mut();
            let first = state.subscribers.is_empty();
            let id = state.subscribers.subscribe_shared(observer);
            (id, first, state.last_result.is_some())
        };
        if first {
            self.start();
        } else if produced {
            let envelope = self.current_result();
            self.deliver_to(id, &envelope);
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let teardown = {
            let mut state = self.state.borrow_mut();
            if !state.subscribers.unsubscribe(id) {
                return false;
            }
            state.notifier.forget(id);
            if !state.subscribers.is_empty() {
                None
            } else {
                if state.poll.disarm() {
                    log::debug!("poll timer disarmed on last unsubscribe");
                }
                // A shared request keeps running; its settlement no longer applies here.
                state.in_flight = None;
                state.last_result = None;
                state.last_errors.clear();
                state.dependencies.clear();
                state.watch_id.take()
            }
        };
        if let Some(watch_id) = teardown {
            self.manager.registry.borrow_mut().unregister(watch_id);
        }
        true
    }

    fn start(&self) {
        let watcher: Weak<dyn StoreWatcher> = self.this.clone();
        let watch_id = self.manager.registry.borrow_mut().register(watcher);
        self.state.borrow_mut().watch_id = Some(watch_id);
        drop(self.resolve(None));
    }

    /// Answers from the store when possible, otherwise fetches.
    ///
    /// With `hold_over` set, a fetch is announced by a loading envelope
    /// carrying that data. Without it, only non-empty partial data is
    /// announced.
    fn resolve(&self, hold_over: Option<Value>) -> QueryFuture {
        let (diff, policy, partial) = {
            let mut state = self.state.borrow_mut();
            let diff = self.read_store(&mut state);
            (diff, state.options.fetch_policy, state.options.return_partial_data)
        };

        if diff.complete && policy.uses_cache() {
            let envelope = self.settle_from_store(diff.data);
            return future::ready(envelope).boxed_local();
        }

        let interim = match hold_over {
            Some(previous) => Some(ResultEnvelope::loading(previous)),
            None if partial && !is_empty_data(&diff.data) => Some(ResultEnvelope::loading(diff.data)),
            None => None,
        };
        let key = self.begin_fetch(policy);
        if let Some(interim) = interim {
            self.deliver(&interim);
        }
        self.dispatch(key)
    }

    fn read_store(&self, state: &mut QueryState) -> DiffResult {
        let diff = self.manager.store.borrow().diff(
            &state.options.document,
            &state.options.variables,
            state.options.return_partial_data,
        );
        state.dependencies = diff.dependencies.clone();
        diff
    }

    fn fetch(&self, policy: FetchPolicy) -> QueryFuture {
        let key = self.begin_fetch(policy);
        self.dispatch(key)
    }

    /// Marks a fetch as outstanding. A pending poll tick is dropped; the
    /// settlement re-arms it.
    fn begin_fetch(&self, policy: FetchPolicy) -> RequestKey {
        let mut state = self.state.borrow_mut();
        let key = RequestKey::new(
            state.document_key.clone(),
            &state.options.document,
            &state.options.variables,
            policy,
        );
        if state.poll.disarm() {
            log::trace!("poll tick deferred until {:?} settles", key);
        }
        state.in_flight = Some(key.clone());
        key
    }

    fn dispatch(&self, key: RequestKey) -> QueryFuture {
        let (document, variables) = {
            let state = self.state.borrow();
            if state.in_flight.as_ref() != Some(&key) {
                // Superseded by an observer callback in the meantime
                drop(state);
                return future::ready(self.current_result()).boxed_local();
            }
            (state.options.document.clone(), state.options.variables.clone())
        };

        let Acquisition { request, created } = self.manager.fetch(key.clone(), &document, &variables);
        let (tx, rx) = oneshot::channel();
        let query = self.this.clone();
        let settle_key = key.clone();
        let spawned = self.manager.spawn(async move {
            let outcome = request.await;
            if let Some(query) = query.upgrade() {
                let _ = tx.send(query.settle(&settle_key, outcome));
            }
        });

        if let Err(err) = spawned {
            log::warn!("{}", err);
            // A joined request is still driven by its creator.
            if created {
                self.manager.dedup.forget(&key);
            }
            let envelope = self.settle(&key, Err(err));
            return future::ready(envelope).boxed_local();
        }
        rx.map(|received| received.unwrap_or_else(|_| dropped_envelope()))
            .boxed_local()
    }

    /// Applies a settled fetch if it is still the outstanding one.
    fn settle(&self, key: &RequestKey, outcome: FetchResult) -> ResultEnvelope {
        let envelope = {
            let mut state = self.state.borrow_mut();
            if state.in_flight.as_ref() != Some(key) {
                log::debug!("dropping stale settlement of {:?}", key);
                drop(state);
                return self.current_result();
            }
            state.in_flight = None;
            let diff = self.read_store(&mut state);
            let envelope = settled_envelope(diff, &outcome);
            state.last_errors = envelope.errors.clone();
            state.last_result = Some(envelope.clone());
            self.arm_poll(&mut state);
            envelope
        };
        self.deliver(&envelope);
        envelope
    }

    fn settle_from_store(&self, data: Value) -> ResultEnvelope {
        let envelope = ResultEnvelope::ready(data);
        {
            let mut state = self.state.borrow_mut();
            // Any outstanding fetch is for options that no longer apply.
            state.in_flight = None;
            state.last_errors.clear();
            state.last_result = Some(envelope.clone());
            self.arm_poll(&mut state);
        }
        self.deliver(&envelope);
        envelope
    }

    fn arm_poll(&self, state: &mut QueryState) {
        if !state.poll.is_polling() || state.subscribers.is_empty() || state.in_flight.is_some() {
            return;
        }
        let query = self.this.clone();
        state.poll.arm(Box::new(move || {
            if let Some(query) = query.upgrade() {
                query.on_poll_tick();
            }
        }));
    }

    fn on_poll_tick(&self) {
        let fetching = {
            let mut state = self.state.borrow_mut();
            state.poll.fired();
            if state.subscribers.is_empty() {
                return;
            }
            state.in_flight.is_some()
        };
        if fetching {
            log::trace!("poll tick skipped, fetch outstanding");
            return;
        }
        drop(self.fetch(FetchPolicy::ForceNetwork));
    }

    pub(crate) fn set_poll_interval(&self, interval: u64) {
        let mut state = self.state.borrow_mut();
        let previous = state.poll.interval();
        state.options.poll_interval = interval;
        state.poll.set_interval(interval);

        if interval == 0 {
            if state.poll.disarm() {
                log::debug!("polling stopped");
            }
            return;
        }
        if previous == interval && state.poll.is_armed() {
            return;
        }
        // Before the first result, or while fetching, the settlement arms.
        if state.last_result.is_none() || state.in_flight.is_some() {
            return;
        }
        log::debug!("polling every {}ms", interval);
        self.arm_poll(&mut state);
    }

    fn current_result(&self) -> ResultEnvelope {
        let state = self.state.borrow();
        let options = &state.options;
        let diff = self
            .manager
            .store
            .borrow()
            .diff(&options.document, &options.variables, options.return_partial_data);
        let loading = state.in_flight.is_some();

        let data = if diff.complete || options.return_partial_data {
            diff.data
        } else {
            // Hold the last settled data over an incomplete read.
            state
                .last_result
                .as_ref()
                .map(|last| last.data.clone())
                .unwrap_or_else(empty_data)
        };

        if loading {
            ResultEnvelope::loading(data)
        } else {
            ResultEnvelope::ready(data).with_errors(state.last_errors.clone())
        }
    }

    fn set_variables(&self, variables: Variables) -> Result<Option<QueryFuture>> {
        let previous = {
            let mut state = self.state.borrow_mut();
            state.options.document.validate_variables(&variables)?;
            if state.options.variables == variables {
                return Ok(None);
            }
            state.options.variables = variables;
            if state.subscribers.is_empty() {
                return Ok(None);
            }
            state
                .last_result
                .as_ref()
                .map(|last| last.data.clone())
                .unwrap_or_else(empty_data)
        };
        Ok(Some(self.resolve(Some(previous))))
    }

    fn set_options(&self, patch: OptionsPatch) -> Result<Option<QueryFuture>> {
        let OptionsPatch {
            variables,
            poll_interval,
            fetch_policy,
            return_partial_data,
        } = patch;

        let (subscribed, partial_changed) = {
            let mut state = self.state.borrow_mut();
            if let Some(variables) = &variables {
                state.options.document.validate_variables(variables)?;
            }
            if let Some(policy) = fetch_policy {
                state.options.fetch_policy = policy;
            }
            let partial_changed = match return_partial_data {
                Some(partial) if partial != state.options.return_partial_data => {
                    state.options.return_partial_data = partial;
                    true
                }
                _ => false,
            };
            (!state.subscribers.is_empty(), partial_changed)
        };

        if let Some(interval) = poll_interval {
            self.set_poll_interval(interval);
        }

        let mut result = match variables {
            Some(variables) => self.set_variables(variables)?,
            None => None,
        };
        if result.is_none() && subscribed {
            if fetch_policy == Some(FetchPolicy::ForceNetwork) {
                result = Some(self.fetch(FetchPolicy::ForceNetwork));
            } else if partial_changed && self.state.borrow().in_flight.is_none() {
                let envelope = self.current_result();
                self.deliver(&envelope);
            }
        }
        Ok(result)
    }

    fn refetch(&self, variables: Option<Variables>) -> Result<QueryFuture> {
        if let Some(variables) = variables {
            let mut state = self.state.borrow_mut();
            state.options.document.validate_variables(&variables)?;
            state.options.variables = variables;
        }
        Ok(self.fetch(FetchPolicy::ForceNetwork))
    }

    /// Delivers an envelope to every subscriber that has not just seen it.
    fn deliver(&self, envelope: &ResultEnvelope) {
        self.enqueue(None, envelope.clone());
    }

    fn deliver_to(&self, id: SubscriptionId, envelope: &ResultEnvelope) {
        self.enqueue(Some(id), envelope.clone());
    }

    /// Queues a delivery. Envelopes produced by observer callbacks wait until
    /// the current one has reached every subscriber.
    fn enqueue(&self, target: Option<SubscriptionId>, envelope: ResultEnvelope) {
        self.outbox.borrow_mut().push_back((target, envelope));
        if self.delivering.replace(true) {
            return;
        }
        loop {
            let next = self.outbox.borrow_mut().pop_front();
            let Some((target, envelope)) = next else { break };
            let ids = match target {
                Some(id) => vec![id],
                None => self.state.borrow().subscribers.subscription_ids(),
            };
            for id in ids {
                let observer = {
                    let mut state = self.state.borrow_mut();
                    let state = &mut *state;
                    // An earlier observer may have unsubscribed this one.
                    if !state.subscribers.contains(id) || !state.notifier.should_deliver(id, &envelope) {
                        continue;
                    }
                    state.subscribers.get(id)
                };
                if let Some(observer) = observer {
                    observer.notify(&envelope);
                }
            }
        }
        self.delivering.set(false);
    }
}

impl StoreWatcher for ObservableInner {
    fn is_affected_by(&self, diff: &StoreDiff) -> bool {
        diff.intersects(&self.state.borrow().dependencies)
    }

    fn on_store_change(&self) {
        let envelope = {
            let mut state = self.state.borrow_mut();
            if state.subscribers.is_empty() || state.in_flight.is_some() {
                return;
            }
            let diff = self.read_store(&mut state);
            if !diff.complete && !state.options.return_partial_data {
                log::trace!("store change left query incomplete, keeping last result");
                return;
            }
            let envelope = ResultEnvelope::ready(diff.data);
            state.last_errors.clear();
            state.last_result = Some(envelope.clone());
            envelope
        };
        self.deliver(&envelope);
    }

    fn on_store_reset(&self) {
        if self.state.borrow().subscribers.is_empty() {
            return;
        }
        drop(self.fetch(FetchPolicy::ForceNetwork));
    }
}
