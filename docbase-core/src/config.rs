//! Store configuration.
//!
//! Configuration is loaded once at process start and handed to
//! [`crate::store::DocumentStore::connect`] as an immutable value.
//!
//! # Examples
//!
//! ```ignore
//! use docbase::config::StoreConfig;
//!
//! // Customize specific fields
//! let config = StoreConfig {
//!     pool_size: 2,
//!     ..StoreConfig::new("memory://local")
//! };
//!
//! // Or load from a JSON document produced by the deployment environment
//! let config = StoreConfig::from_json_str(
//!     r#"{ "endpoint": "memory://local", "poolSize": 4 }"#,
//! )?;
//! ```

use serde::Deserialize;
use std::time::Duration;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Immutable configuration for a document store and its connection pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoreConfig {
    /// Endpoint URI the transport dials.
    pub endpoint: String,

    /// Upper bound on concurrently open connections.
    ///
    /// Acquiring blocks when all connections are lent out; the pool never
    /// grows past this bound. Must be positive.
    ///
    /// Default: 8
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// How long an acquire waits for a free connection before failing
    /// with `ConnectionExhausted`.
    ///
    /// Default: 5000
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Upper bound on one transport round trip. Applied per operation,
    /// independently of the acquire timeout.
    ///
    /// Default: 30000
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_pool_size() -> usize {
    8
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_op_timeout_ms() -> u64 {
    30_000
}

impl StoreConfig {
    /// Creates a configuration for the given endpoint with default bounds.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            pool_size: default_pool_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }

    /// Parses a configuration from a JSON document.
    ///
    /// Unknown options are rejected rather than silently ignored.
    pub fn from_json_str(raw: &str) -> DocumentStoreResult<Self> {
        let config: StoreConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configured bounds for internal consistency.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if self.endpoint.is_empty() {
            return Err(DocumentStoreError::Initialization(
                "endpoint must not be empty".into(),
            ));
        }
        if self.pool_size == 0 {
            return Err(DocumentStoreError::Initialization(
                "poolSize must be positive".into(),
            ));
        }

        Ok(())
    }

    /// The acquire timeout as a [`Duration`].
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// The per-operation timeout as a [`Duration`].
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
