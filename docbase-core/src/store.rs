//! Main document store interface for interacting with document backends.
//!
//! A [`DocumentStore`] owns a connection pool over a [`Transport`] and hands
//! out [`Collection`] views. Connecting is lazy: no connection is dialed
//! until the first operation runs.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docbase_core::{config::StoreConfig, store::DocumentStore};
//!
//! # async fn example(transport: Arc<dyn docbase_core::transport::Transport>, schema: docbase_core::schema::Schema) -> docbase_core::error::DocumentStoreResult<()> {
//! let store = DocumentStore::connect(transport, StoreConfig::new("memory://local"))?;
//! let people = store.collection("people", schema);
//! store.shutdown().await?;
//! # Ok(()) }
//! ```

use std::sync::Arc;

use crate::{
    collection::Collection,
    config::StoreConfig,
    error::DocumentStoreResult,
    pool::ConnectionPool,
    schema::Schema,
    transport::Transport,
};

/// A schema-validated document store backed by a pooled transport.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: ConnectionPool,
    config: StoreConfig,
}

impl DocumentStore {
    /// Creates a store over the given transport.
    ///
    /// Validates the configuration but dials nothing; connections are
    /// established on first use, up to the configured pool size.
    ///
    /// # Errors
    ///
    /// Returns `Initialization` when the configuration is invalid.
    pub fn connect(
        transport: Arc<dyn Transport>,
        config: StoreConfig,
    ) -> DocumentStoreResult<Self> {
        config.validate()?;
        let pool = ConnectionPool::new(transport, &config);

        Ok(Self { pool, config })
    }

    /// Returns a collection view bound to the given name and schema.
    ///
    /// Collections are cheap handles; nothing is created on the backend
    /// until a document is written.
    pub fn collection<'a>(&'a self, name: &str, schema: Schema) -> Collection<'a> {
        Collection::new(
            name.to_string(),
            schema,
            &self.pool,
            self.config.op_timeout(),
        )
    }

    /// Returns the configuration this store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Shuts down the store, closing idle connections.
    ///
    /// Idempotent: the second and later calls return `Ok` without touching
    /// the transport. Operations started after shutdown fail with
    /// `ConnectionLost`.
    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.pool.shutdown().await
    }
}
