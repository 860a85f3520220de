//! Weft Core - Core types for the Weft query cache.
//!
//! This crate provides the foundational types shared by the store, the reactive
//! layer and the client:
//!
//! - `QueryDocument`: Structural field selection with variable definitions
//! - `Variables`: Order-irrelevant named arguments
//! - `FetchPolicy`: Cache-vs-network resolution strategy
//! - `ResultEnvelope`: `{data, loading, errors}` snapshot delivered to observers
//! - `Error`: Error types for query operations
//!
//! # Example
//!
//! ```rust
//! use weft_core::{Field, QueryDocument, ResultEnvelope, Variables};
//! use serde_json::json;
//!
//! let doc = QueryDocument::query("Viewer")
//!     .field(Field::new("viewer").select([Field::new("id"), Field::new("login")]));
//!
//! let vars = Variables::new();
//! assert!(doc.validate_variables(&vars).is_ok());
//!
//! let env = ResultEnvelope::loading(json!({}));
//! assert!(env.loading);
//! assert!(env.is_empty());
//! ```

#![no_std]

extern crate alloc;

mod document;
mod envelope;
mod error;
mod policy;
mod variables;

pub use document::{Argument, Field, QueryDocument, VariableDefinition};
pub use envelope::{empty_data, is_empty_data, GraphError, ResultEnvelope};
pub use error::{Error, Result};
pub use policy::FetchPolicy;
pub use variables::Variables;

// Re-export the JSON data model
pub use serde_json::{Map, Value};
