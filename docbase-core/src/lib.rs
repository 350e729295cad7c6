//! A schema-validated, connection-pooled client core for JSON document databases.
//!
//! This crate is the core of the docbase project and provides:
//!
//! - **Schema validation** ([`schema`]) - Field specifications, defaults, and structural validation
//! - **Document helpers** ([`document`]) - Identifier handling, patch merging, and serde conversion
//! - **Query and filtering API** ([`query`]) - Type-safe query construction with sort, limit, and projection
//! - **Collections interface** ([`collection`]) - High-level CRUD API over a named document set
//! - **Document store** ([`store`]) - Main entry point binding a transport, a pool, and collections
//! - **Connection pooling** ([`pool`]) - Bounded connection lending with health tracking
//! - **Transport abstraction** ([`transport`]) - The pluggable wire boundary backends implement
//! - **Configuration** ([`config`]) - Endpoint, pool sizing, and timeout settings
//! - **Error handling** ([`error`]) - Comprehensive error types and result types
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docbase_core::{config::StoreConfig, schema::{FieldType, Schema}, store::DocumentStore};
//! use bson::doc;
//!
//! # async fn example(transport: Arc<dyn docbase_core::transport::Transport>) -> docbase_core::error::DocumentStoreResult<()> {
//! let store = DocumentStore::connect(transport, StoreConfig::new("memory://local"))?;
//! let schema = Schema::builder()
//!     .required("name", FieldType::String)
//!     .optional("age", FieldType::Number)
//!     .build()?;
//!
//! let people = store.collection("people", schema);
//! people.insert_one(doc! { "name": "Alice", "age": 30 }).await?;
//! # Ok(()) }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbase_core;

pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod pool;
pub mod query;
pub mod schema;
pub mod store;
pub mod transport;
