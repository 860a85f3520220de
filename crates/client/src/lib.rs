//! Weft Client - Query manager and observable queries.
//!
//! This crate ties the store, the request deduplicator and the reactive
//! plumbing together:
//!
//! - `QueryManager`: Owns the store and request table of one client instance
//! - `ObservableQuery`: A live query delivering `ResultEnvelope`s to observers
//! - `Deduplicator`: At most one outstanding request per `RequestKey`
//! - `Transport`: The network seam
//!
//! Execution is single threaded. Settlements run on an injected
//! `futures::task::LocalSpawn` and poll ticks on an injected `Scheduler`;
//! with the `wasm` feature, browser implementations of both are provided.
//!
//! # Example
//!
//! ```rust
//! use futures::executor::LocalPool;
//! use futures::future::{FutureExt, LocalBoxFuture};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weft_client::{
//!     ManualScheduler, QueryManager, Transport, TransportResponse, WatchOptions,
//! };
//! use weft_core::{Argument, Field, QueryDocument, Result, ResultEnvelope, VariableDefinition, Variables};
//!
//! struct Users;
//!
//! impl Transport for Users {
//!     fn execute(&self, _: &QueryDocument, vars: &Variables) -> LocalBoxFuture<'static, Result<TransportResponse>> {
//!         let id = vars.get("id").cloned().unwrap_or_default();
//!         async move {
//!             Ok(TransportResponse::data(json!({"user": {"__typename": "User", "id": id, "name": "Ann"}})))
//!         }
//!         .boxed_local()
//!     }
//! }
//!
//! let mut pool = LocalPool::new();
//! let scheduler = Rc::new(ManualScheduler::new());
//! let manager = QueryManager::new(Rc::new(Users), Rc::new(pool.spawner()), scheduler);
//!
//! let doc = QueryDocument::query("GetUser")
//!     .variable(VariableDefinition::new("id", "ID!"))
//!     .field(
//!         Field::new("user")
//!             .arg("id", Argument::variable("id"))
//!             .select([Field::new("__typename"), Field::new("id"), Field::new("name")]),
//!     );
//!
//! // Required variables are checked up front
//! assert!(manager.watch_query(WatchOptions::new(doc.clone())).is_err());
//!
//! let options = WatchOptions::new(doc).variables(Variables::new().with("id", "1"));
//! let query = manager.watch_query(options).unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let subscription = query.subscribe(move |env: &ResultEnvelope| sink.borrow_mut().push(env.clone()));
//!
//! pool.run_until_stalled();
//! assert_eq!(seen.borrow().len(), 1);
//! assert_eq!(seen.borrow()[0].data["user"]["name"], json!("Ann"));
//!
//! subscription.unsubscribe();
//! ```

pub mod config;
pub mod dedup;
pub mod observable;
pub mod options;
pub mod query_manager;
pub mod transport;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::ClientConfig;
pub use dedup::{Acquisition, Deduplicator, FetchResult, InFlightRequest, RequestKey};
pub use observable::{ObservableQuery, QueryFuture, Subscription};
pub use options::{OptionsPatch, WatchOptions};
pub use query_manager::QueryManager;
pub use transport::{Transport, TransportResponse};
#[cfg(feature = "wasm")]
pub use wasm::{TimeoutScheduler, WasmSpawner};

// Re-export the pieces callers need to drive a manager
pub use weft_reactive::{ManualScheduler, Observer, Scheduler, SubscriptionId, TimerHandle};
pub use weft_storage::{CacheSnapshot, DiffResult, StoreConfig, StoreDiff};
