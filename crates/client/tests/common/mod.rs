//! Shared fixtures for weft-client integration tests.

#![allow(dead_code)]

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use weft_client::{ClientConfig, ManualScheduler, QueryManager, Transport, TransportResponse};
use weft_core::{Argument, Error, Field, QueryDocument, Result, ResultEnvelope, VariableDefinition, Variables};

type Handler = Box<dyn FnMut(&QueryDocument, &Variables) -> Result<TransportResponse>>;
type Pending = (oneshot::Sender<Result<TransportResponse>>, Result<TransportResponse>);

struct MockState {
    handler: RefCell<Handler>,
    calls: RefCell<Vec<Variables>>,
    deferred: Cell<bool>,
    pending: RefCell<Vec<Pending>>,
}

/// A transport answering from a handler closure.
///
/// In deferred mode each response is held until the test releases it.
#[derive(Clone)]
pub struct MockTransport {
    state: Rc<MockState>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&QueryDocument, &Variables) -> Result<TransportResponse> + 'static,
    {
        Self {
            state: Rc::new(MockState {
                handler: RefCell::new(Box::new(handler)),
                calls: RefCell::new(Vec::new()),
                deferred: Cell::new(false),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn deferred<F>(handler: F) -> Self
    where
        F: FnMut(&QueryDocument, &Variables) -> Result<TransportResponse> + 'static,
    {
        let transport = Self::new(handler);
        transport.state.deferred.set(true);
        transport
    }

    pub fn set_handler<F>(&self, handler: F)
    where
        F: FnMut(&QueryDocument, &Variables) -> Result<TransportResponse> + 'static,
    {
        *self.state.handler.borrow_mut() = Box::new(handler);
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> usize {
        self.state.calls.borrow().len()
    }

    /// Variables of each `execute` call, in order.
    pub fn call_variables(&self) -> Vec<Variables> {
        self.state.calls.borrow().clone()
    }

    /// Number of held responses.
    pub fn pending(&self) -> usize {
        self.state.pending.borrow().len()
    }

    /// Releases the held response at `index`.
    pub fn resolve_at(&self, index: usize) {
        let (sender, outcome) = self.state.pending.borrow_mut().remove(index);
        let _ = sender.send(outcome);
    }

    pub fn resolve_next(&self) {
        self.resolve_at(0);
    }

    pub fn resolve_all(&self) {
        while self.pending() > 0 {
            self.resolve_next();
        }
    }
}

impl Transport for MockTransport {
    fn execute(&self, document: &QueryDocument, variables: &Variables) -> LocalBoxFuture<'static, Result<TransportResponse>> {
        self.state.calls.borrow_mut().push(variables.clone());
        let outcome = {
            let mut handler = self.state.handler.borrow_mut();
            (*handler)(document, variables)
        };
        if !self.state.deferred.get() {
            return future::ready(outcome).boxed_local();
        }
        let (tx, rx) = oneshot::channel();
        self.state.pending.borrow_mut().push((tx, outcome));
        async move {
            rx.await
                .unwrap_or_else(|_| Err(Error::transport("response dropped")))
        }
        .boxed_local()
    }
}

/// A manager driven by a local pool and a virtual clock.
pub struct Harness {
    pub pool: LocalPool,
    pub scheduler: Rc<ManualScheduler>,
    pub transport: MockTransport,
    pub manager: QueryManager,
}

impl Harness {
    pub fn new(transport: MockTransport) -> Self {
        Self::with_config(ClientConfig::default(), transport)
    }

    pub fn with_config(config: ClientConfig, transport: MockTransport) -> Self {
        let pool = LocalPool::new();
        let scheduler = Rc::new(ManualScheduler::new());
        let manager = QueryManager::with_config(
            config,
            Rc::new(transport.clone()),
            Rc::new(pool.spawner()),
            scheduler.clone(),
        );
        Self {
            pool,
            scheduler,
            transport,
            manager,
        }
    }

    /// Runs every ready task.
    pub fn settle(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Moves the clock forward one millisecond at a time, settling in between.
    pub fn advance(&mut self, ms: u64) {
        for _ in 0..ms {
            self.scheduler.advance(1);
            self.settle();
        }
    }
}

/// Collects every envelope delivered to it.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Rc<RefCell<Vec<ResultEnvelope>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> impl Fn(&ResultEnvelope) + 'static {
        let seen = self.seen.clone();
        move |envelope: &ResultEnvelope| seen.borrow_mut().push(envelope.clone())
    }

    pub fn all(&self) -> Vec<ResultEnvelope> {
        self.seen.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn last(&self) -> Option<ResultEnvelope> {
        self.seen.borrow().last().cloned()
    }
}

/// `query GetUser($id: ID!) { user(id: $id) { __typename id name } }`
pub fn user_query() -> QueryDocument {
    QueryDocument::query("GetUser")
        .variable(VariableDefinition::new("id", "ID!"))
        .field(
            Field::new("user")
                .arg("id", Argument::variable("id"))
                .select([Field::new("__typename"), Field::new("id"), Field::new("name")]),
        )
}

pub fn user_vars(id: &str) -> Variables {
    Variables::new().with("id", id)
}

pub fn user_data(id: &str, name: &str) -> Value {
    json!({"user": {"__typename": "User", "id": id, "name": name}})
}

/// Answers `user_query` with `User <id>` named by `name_of`.
pub fn user_handler(name_of: fn(&str) -> String) -> impl FnMut(&QueryDocument, &Variables) -> Result<TransportResponse> {
    move |_, variables| {
        let id = variables.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        Ok(TransportResponse::data(user_data(&id, &name_of(&id))))
    }
}

pub fn name_for(id: &str) -> String {
    format!("user-{}", id)
}

/// `query Clock { clock { tick } }`, an entity without identity.
pub fn clock_query() -> QueryDocument {
    QueryDocument::query("Clock").field(Field::new("clock").select([Field::new("tick")]))
}

/// Answers `clock_query` with an increasing tick starting at 1.
pub fn clock_handler() -> impl FnMut(&QueryDocument, &Variables) -> Result<TransportResponse> {
    let mut tick = 0u64;
    move |_, _| {
        tick += 1;
        Ok(TransportResponse::data(json!({"clock": {"tick": tick}})))
    }
}

pub fn clock_data(tick: u64) -> Value {
    json!({"clock": {"tick": tick}})
}
