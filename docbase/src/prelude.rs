//! Convenient re-exports of commonly used types from docbase.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docbase::prelude::*;
//! ```
//!
//! This provides access to:
//! - The document store and its configuration
//! - Schema construction and field types
//! - Query construction and filtering
//! - Collection interfaces and update options
//! - Transport and error types

pub use docbase_core::{
    collection::{Collection, UpdateOptions},
    config::StoreConfig,
    error::{DocumentStoreError, DocumentStoreResult, FieldError, ValidationFailure},
    query::{Expr, FieldOp, Filter, Projection, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    schema::{FieldSpec, FieldType, Schema, SchemaBuilder},
    store::DocumentStore,
    transport::{Connection, DeleteTarget, Operation, Reply, Transport},
};
