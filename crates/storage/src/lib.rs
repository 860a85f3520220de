//! Weft Storage - Normalized record store for the Weft query cache.
//!
//! This crate provides the storage layer including:
//!
//! - `Store`: Writes query results as normalized records and reads them back
//! - `NormalizedCache`: Record map keyed by data id
//! - `StoreDiff`: Ids of records changed by a write
//! - `StoreConfig`: Entity identity rules
//!
//! # Example
//!
//! ```rust
//! use weft_core::{Argument, Field, QueryDocument, Variables};
//! use weft_storage::{Store, StoreConfig};
//! use serde_json::json;
//!
//! let doc = QueryDocument::query("GetUser").field(
//!     Field::new("user")
//!         .arg("id", Argument::literal("1"))
//!         .select([Field::new("__typename"), Field::new("id"), Field::new("name")]),
//! );
//! let data = json!({"user": {"__typename": "User", "id": "1", "name": "Alice"}});
//!
//! let mut store = Store::new(StoreConfig::default());
//! let diff = store.write(&doc, &Variables::new(), &data).unwrap();
//! assert!(diff.contains("User:1"));
//!
//! let result = store.diff(&doc, &Variables::new(), false);
//! assert!(result.complete);
//! assert_eq!(result.data, data);
//! ```

#![no_std]

extern crate alloc;

pub mod cache;
pub mod config;
pub mod journal;
mod reader;
pub mod record;
pub mod store;
mod writer;

pub use cache::{CacheSnapshot, NormalizedCache};
pub use config::StoreConfig;
pub use journal::StoreDiff;
pub use reader::DiffResult;
pub use record::{DataId, NormalizedRecord, StoreValue, ROOT_QUERY};
pub use store::Store;
