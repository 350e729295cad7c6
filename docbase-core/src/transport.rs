//! Transport abstraction over the wire protocol to the database engine.
//!
//! The store treats the database driver as a black box behind the
//! [`Transport`] trait: dial a [`Connection`], execute [`Operation`]s on it,
//! close it. Any concrete wire protocol satisfies this interface; the
//! workspace ships an in-process implementation in `docbase-memory`.
//!
//! # Thread Safety
//!
//! Implementations must be thread-safe (`Send + Sync`) and support concurrent
//! executes on distinct connections. A single connection is only ever used by
//! one in-flight operation at a time; the connection pool enforces that.

use async_trait::async_trait;
use bson::{Document, Uuid};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::{Expr, Query}};

/// A transient handle to one transport connection.
///
/// Owned exclusively by the pool while idle and by exactly one in-flight
/// operation while borrowed. Handles are plain tokens; all state lives in the
/// transport.
#[derive(Debug, PartialEq, Eq)]
pub struct Connection {
    id: u64,
}

impl Connection {
    /// Creates a handle with the given transport-assigned id.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// The transport-assigned connection id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Which documents a delete operation targets.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    /// Delete the documents with these identifiers.
    Ids(Vec<Uuid>),
    /// Delete every document matching the filter expression.
    Matching(Expr),
}

/// One wire operation executed over a borrowed connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Persist a batch of already-validated documents.
    ///
    /// The batch is atomic: a duplicate identifier anywhere in it persists
    /// nothing.
    Insert {
        collection: String,
        documents: Vec<Document>,
    },
    /// Run a structured query and return the matching documents.
    Query {
        collection: String,
        query: Query,
    },
    /// Replace the document with the given identifier wholesale.
    Replace {
        collection: String,
        id: Uuid,
        document: Document,
    },
    /// Remove documents and report how many were removed.
    Delete {
        collection: String,
        target: DeleteTarget,
    },
}

/// The transport's answer to one [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Documents matching a query, already ordered and projected.
    Documents(Vec<Document>),
    /// Number of documents a delete removed.
    Deleted(u64),
    /// Acknowledgement of a write with no payload.
    Ack,
}

/// Abstract interface to a database wire protocol.
///
/// # Error Handling
///
/// `execute` distinguishes logical outcomes (duplicate key, not found) from
/// transport failures ([`crate::error::DocumentStoreError::ConnectionLost`],
/// backend errors); the pool discards a connection after the latter and
/// returns it to the free-list after the former.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Dials a new connection to the given endpoint.
    async fn connect(&self, endpoint: &str) -> DocumentStoreResult<Connection>;

    /// Executes one operation over a borrowed connection.
    async fn execute(&self, conn: &Connection, op: Operation) -> DocumentStoreResult<Reply>;

    /// Closes a connection, releasing its transport-side state.
    async fn close(&self, conn: Connection) -> DocumentStoreResult<()>;
}
