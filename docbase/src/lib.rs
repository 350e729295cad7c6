//! Main docbase crate providing a schema-validated document store client.
//!
//! This crate is the primary entry point for users of the docbase project.
//! It re-exports the core types and functionality from various sub-crates and
//! provides convenient access to the bundled transport backends.
//!
//! # Features
//!
//! - **Schema-validated storage** - Declare field types, requirements, and defaults; every write is checked before it leaves the client
//! - **Connection pooling** - A bounded pool lends connections to operations and replaces unhealthy ones
//! - **Flexible querying** - Composable filters with sorting, limits, and field projection
//! - **Pluggable transports** - Any wire protocol behind one trait, with an in-memory implementation included
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use docbase::{prelude::*, memory::MemoryTransport};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect a store over the in-memory transport
//!     let transport = Arc::new(MemoryTransport::new());
//!     let store = DocumentStore::connect(transport, StoreConfig::new("memory://local"))?;
//!
//!     // Declare what a person looks like
//!     let schema = Schema::builder()
//!         .required("name", FieldType::String)
//!         .optional("age", FieldType::Number)
//!         .required("favoriteFoods", FieldType::Array(Box::new(FieldType::String)))
//!         .build()?;
//!     let people = store.collection("people", schema);
//!
//!     // Insert a document; the stored copy carries a generated identifier
//!     let saved = people
//!         .insert_one(doc! {
//!             "name": "John Doe",
//!             "age": 30,
//!             "favoriteFoods": ["Pizza", "Burger"],
//!         })
//!         .await?;
//!
//!     // Query it back
//!     let found = people
//!         .find(Query::builder()
//!             .filter(Filter::eq("name", "John Doe"))
//!             .build()?)
//!         .await?;
//!     println!("found: {found:?}");
//!
//!     // Shut the store down; idle connections are closed
//!     store.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Updating and Deleting
//!
//! ```ignore
//! use docbase::prelude::*;
//! use bson::doc;
//!
//! # async fn example(people: docbase::collection::Collection<'_>) -> DocumentStoreResult<()> {
//! // Patch the first match and get the updated document back
//! let updated = people
//!     .update_one(
//!         Filter::eq("name", "John Doe"),
//!         doc! { "favoriteFoods": ["Pizza", "Burger", "Tacos"] },
//!         UpdateOptions::returning_updated(),
//!     )
//!     .await?;
//!
//! // Delete by identifier; a missing document is `false`, not an error
//! if let Some(id) = docbase::document::document_id(&updated) {
//!     let removed = people.delete_by_id(id).await?;
//!     assert!(removed);
//! }
//!
//! // Delete everything matching a filter; the count may be zero
//! let purged = people.delete_many(Filter::gt("age", 100)).await?;
//! # Ok(()) }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory transport for development and testing

pub mod prelude;

pub use docbase_core::{collection, config, document, error, pool, query, schema, store, transport};

// Re-export BSON types for convenience
pub use bson;

/// In-memory transport implementations.
pub mod memory {
    pub use docbase_memory::MemoryTransport;
}
