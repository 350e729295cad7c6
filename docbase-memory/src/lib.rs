//! In-memory transport backend for docbase.
//!
//! This crate provides a thread-safe, in-process implementation of the
//! `Transport` trait. It uses async-aware read-write locks for concurrent
//! access and is ideal for development, testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion-ordered storage** - Unsorted queries return documents in insertion order
//! - **Full query support** - Supports filtering, sorting, limits, and projection
//! - **Connection semantics** - Tracks live connections; a closed connection fails like a dropped socket
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docbase_core::{config::StoreConfig, schema::{FieldType, Schema}, store::DocumentStore};
//! use docbase_memory::MemoryTransport;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(MemoryTransport::new());
//!     let store = DocumentStore::connect(transport, StoreConfig::new("memory://local"))?;
//!
//!     let schema = Schema::builder()
//!         .required("name", FieldType::String)
//!         .build()?;
//!     let people = store.collection("people", schema);
//!     people.insert_one(doc! { "name": "Alice" }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbase_memory;

pub mod evaluator;
pub mod transport;

pub use transport::MemoryTransport;
