//! Weft Reactive - Observer plumbing for the Weft query cache.
//!
//! This crate holds the pieces of an observable query that do not depend on
//! fetching:
//!
//! - `SubscriptionManager`: Observers attached to a query
//! - `ResultNotifier`: Suppresses repeat deliveries per observer
//! - `WatchRegistry`: Routes store diffs to the queries that read changed records
//! - `PollScheduler`: At most one pending poll tick per query
//! - `ManualScheduler`: A virtual-clock `Scheduler`
//!
//! # Example
//!
//! ```rust
//! use weft_core::ResultEnvelope;
//! use weft_reactive::{ResultNotifier, SubscriptionManager};
//! use serde_json::json;
//!
//! let mut subscribers = SubscriptionManager::new();
//! let mut notifier = ResultNotifier::new();
//! let id = subscribers.subscribe(|env: &ResultEnvelope| assert!(!env.loading));
//!
//! let envelope = ResultEnvelope::ready(json!({"n": 1}));
//! for id in subscribers.subscription_ids() {
//!     if let Some(observer) = subscribers.get(id) {
//!         if notifier.should_deliver(id, &envelope) {
//!             observer.notify(&envelope);
//!         }
//!     }
//! }
//! assert!(!notifier.should_deliver(id, &envelope));
//! ```

#![no_std]

extern crate alloc;

pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod subscription;

pub use notify::ResultNotifier;
pub use registry::{StoreWatcher, WatchId, WatchRegistry};
pub use scheduler::{ManualScheduler, PollScheduler, Scheduler, TimerHandle};
pub use subscription::{Observer, SubscriptionId, SubscriptionManager};
