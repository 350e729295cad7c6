//! Bounded connection pool over an abstract transport.
//!
//! The pool owns every idle [`Connection`]; an in-flight operation owns
//! exactly one borrowed connection through a [`PooledConnection`] guard.
//! Capacity is a fixed configured bound: acquiring blocks the calling task
//! (up to the acquire timeout) when all connections are lent out, and the
//! pool never grows past the bound.
//!
//! Connections are dialed lazily: the first acquire dials, a healthy
//! connection returns to the free-list on guard drop, and a connection that
//! errored mid-operation is closed instead, so a later acquire dials its
//! replacement. Dropping a guard — including when the owning task is
//! cancelled mid-operation — always returns the borrow, so a connection is
//! never left permanently lent out.

use log::{debug, warn};
use parking_lot::Mutex;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    time::timeout,
};

use crate::{
    config::StoreConfig,
    error::{DocumentStoreError, DocumentStoreResult},
    transport::{Connection, Operation, Reply, Transport},
};

struct PoolInner {
    transport: Arc<dyn Transport>,
    endpoint: String,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Connection>>,
    closed: AtomicBool,
}

/// A bounded pool of transport connections.
///
/// Cloning is cheap and shares the same pool. The free-list is the single
/// shared mutable resource; it is mutated under a mutex so an acquire or a
/// release is atomic and no connection is ever lent to two borrowers.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
    acquire_timeout: Duration,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("endpoint", &self.inner.endpoint)
            .field("idle", &self.inner.idle.lock().len())
            .field("closed", &self.inner.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl ConnectionPool {
    /// Creates a pool for the configured endpoint.
    ///
    /// No connection is dialed here; the first acquire performs the initial
    /// dial.
    pub fn new(transport: Arc<dyn Transport>, config: &StoreConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                transport,
                endpoint: config.endpoint.clone(),
                permits: Arc::new(Semaphore::new(config.pool_size)),
                idle: Mutex::new(Vec::with_capacity(config.pool_size)),
                closed: AtomicBool::new(false),
            }),
            acquire_timeout: config.acquire_timeout(),
        }
    }

    /// Borrows a connection, dialing a new one if the free-list is empty.
    ///
    /// Blocks the calling task while the pool is exhausted and fails with
    /// [`DocumentStoreError::ConnectionExhausted`] once the acquire timeout
    /// elapses.
    pub async fn acquire(&self) -> DocumentStoreResult<PooledConnection> {
        let permit = match timeout(
            self.acquire_timeout,
            self.inner.permits.clone().acquire_owned(),
        )
        .await
        {
            Err(_) => return Err(DocumentStoreError::ConnectionExhausted),
            Ok(Err(_)) => {
                return Err(DocumentStoreError::ConnectionLost(
                    "connection pool has been shut down".into(),
                ));
            }
            Ok(Ok(permit)) => permit,
        };

        let reused = self.inner.idle.lock().pop();
        let conn = match reused {
            Some(conn) => conn,
            None => {
                let conn = self
                    .inner
                    .transport
                    .connect(&self.inner.endpoint)
                    .await?;
                debug!("dialed connection {} to {}", conn.id(), self.inner.endpoint);
                conn
            }
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Drains the free-list and closes every idle connection.
    ///
    /// Idempotent; subsequent acquires fail. Connections still lent out are
    /// closed on guard drop rather than returned.
    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.inner.permits.close();
        let idle = std::mem::take(&mut *self.inner.idle.lock());
        for conn in idle {
            if let Err(err) = self.inner.transport.close(conn).await {
                warn!("error closing pooled connection: {err}");
            }
        }
        debug!("connection pool for {} shut down", self.inner.endpoint);

        Ok(())
    }
}

/// Guard for one borrowed connection.
///
/// Dropping the guard returns the connection to the free-list; a connection
/// that failed a round trip is discarded inside [`PooledConnection::execute`]
/// so it never re-enters circulation.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// The borrowed connection handle.
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    /// Executes one operation over the borrowed connection, bounded by the
    /// per-operation timeout.
    ///
    /// Transport-level failures and timeouts poison the connection: it is
    /// closed and a replacement is dialed lazily on a later acquire. Logical
    /// outcomes (duplicate key, not found) leave the connection healthy.
    pub async fn execute(
        &mut self,
        op: Operation,
        op_timeout: Duration,
    ) -> DocumentStoreResult<Reply> {
        let Some(conn) = &self.conn else {
            return Err(DocumentStoreError::ConnectionLost(
                "connection already discarded".into(),
            ));
        };

        match timeout(op_timeout, self.pool.transport.execute(conn, op)).await {
            Err(_) => {
                self.discard("round trip timed out").await;
                Err(DocumentStoreError::Timeout(op_timeout.as_millis() as u64))
            }
            Ok(Err(err)) => {
                if err.poisons_connection() {
                    self.discard(&err.to_string()).await;
                }
                Err(err)
            }
            Ok(Ok(reply)) => Ok(reply),
        }
    }

    async fn discard(&mut self, reason: &str) {
        if let Some(conn) = self.conn.take() {
            warn!("discarding connection {}: {reason}", conn.id());
            if let Err(err) = self.pool.transport.close(conn).await {
                debug!("error closing discarded connection: {err}");
            }
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.pool.closed.load(Ordering::Acquire) {
                // Shutdown already drained the free-list; close this late
                // returner out of band instead of leaking transport state.
                let transport = Arc::clone(&self.pool.transport);
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(err) = transport.close(conn).await {
                            warn!("error closing connection returned after shutdown: {err}");
                        }
                    });
                }
            } else {
                self.pool.idle.lock().push(conn);
            }
        }
        // The permit drops with the guard, freeing one slot.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize};

    #[derive(Debug, Default)]
    struct StubTransport {
        dialed: AtomicU64,
        closed: AtomicU64,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_next_execute: AtomicBool,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn connect(&self, _endpoint: &str) -> DocumentStoreResult<Connection> {
            let id = self.dialed.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Connection::new(id))
        }

        async fn execute(
            &self,
            _conn: &Connection,
            _op: Operation,
        ) -> DocumentStoreResult<Reply> {
            if self.fail_next_execute.swap(false, Ordering::SeqCst) {
                return Err(DocumentStoreError::ConnectionLost("wire dropped".into()));
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(Reply::Ack)
        }

        async fn close(&self, _conn: Connection) -> DocumentStoreResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(pool_size: usize, acquire_timeout_ms: u64) -> StoreConfig {
        StoreConfig {
            pool_size,
            acquire_timeout_ms,
            ..StoreConfig::new("stub://local")
        }
    }

    fn query_op() -> Operation {
        Operation::Query { collection: "people".into(), query: Query::new() }
    }

    #[tokio::test]
    async fn connections_are_reused() {
        let pool = ConnectionPool::new(Arc::new(StubTransport::default()), &config(2, 100));

        let first = pool.acquire().await.unwrap();
        let id = first.connection().unwrap().id();
        drop(first);

        let second = pool.acquire().await.unwrap();
        assert_eq!(second.connection().unwrap().id(), id);
    }

    #[tokio::test]
    async fn pool_of_one_blocks_second_borrower_until_release() {
        let pool = ConnectionPool::new(Arc::new(StubTransport::default()), &config(1, 5_000));

        let held = pool.acquire().await.unwrap();
        let contender = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|c| c.connection().unwrap().id()) })
        };

        // The contender must still be parked while the connection is held.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        let held_id = held.connection().unwrap().id();
        drop(held);

        let acquired_id = contender.await.unwrap().unwrap();
        assert_eq!(acquired_id, held_id);
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let pool = ConnectionPool::new(Arc::new(StubTransport::default()), &config(1, 20));

        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire().await;

        assert!(matches!(result, Err(DocumentStoreError::ConnectionExhausted)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_connection_is_double_lent() {
        let transport = Arc::new(StubTransport::default());
        let pool = ConnectionPool::new(transport.clone(), &config(1, 5_000));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    let mut conn = pool.acquire().await.unwrap();
                    conn.execute(query_op(), Duration::from_secs(1)).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(transport.dialed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errored_connection_is_discarded_and_replaced() {
        let transport = Arc::new(StubTransport::default());
        let pool = ConnectionPool::new(transport.clone(), &config(1, 100));

        transport.fail_next_execute.store(true, Ordering::SeqCst);
        let mut conn = pool.acquire().await.unwrap();
        let result = conn.execute(query_op(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(DocumentStoreError::ConnectionLost(_))));
        drop(conn);

        // A fresh connection is dialed lazily on the next acquire.
        let replacement = pool.acquire().await.unwrap();
        assert_eq!(replacement.connection().unwrap().id(), 2);
        assert_eq!(transport.dialed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_round_trip_times_out_and_poisons() {
        let transport = Arc::new(StubTransport::default());
        let pool = ConnectionPool::new(transport.clone(), &config(1, 100));

        let mut conn = pool.acquire().await.unwrap();
        let result = conn.execute(query_op(), Duration::from_millis(0)).await;

        assert!(matches!(result, Err(DocumentStoreError::Timeout(0))));
        assert!(conn.connection().is_none());
    }

    #[tokio::test]
    async fn connection_borrowed_across_shutdown_is_closed_on_return() {
        let transport = Arc::new(StubTransport::default());
        let pool = ConnectionPool::new(transport.clone(), &config(2, 100));

        let held = pool.acquire().await.unwrap();
        pool.shutdown().await.unwrap();
        assert_eq!(transport.closed.load(Ordering::SeqCst), 0);

        drop(held);
        // The close runs on a spawned task; give it a tick.
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_operation_returns_the_borrow() {
        let transport = Arc::new(StubTransport::default());
        let pool = ConnectionPool::new(transport.clone(), &config(1, 100));

        let task = {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mut conn = pool.acquire().await.unwrap();
                conn.execute(query_op(), Duration::from_secs(1)).await.unwrap();
            })
        };
        // Let the round trip start before aborting mid-flight.
        tokio::time::sleep(Duration::from_millis(1)).await;
        task.abort();
        let _ = task.await;

        let replacement = pool.acquire().await.unwrap();
        assert!(replacement.connection().is_some());
    }

    #[tokio::test]
    async fn cancelled_acquire_releases_its_place_in_line() {
        let pool = ConnectionPool::new(Arc::new(StubTransport::default()), &config(1, 5_000));

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_fails_later_acquires() {
        let pool = ConnectionPool::new(Arc::new(StubTransport::default()), &config(2, 100));

        pool.acquire().await.unwrap();
        pool.shutdown().await.unwrap();
        pool.shutdown().await.unwrap();

        assert!(matches!(
            pool.acquire().await,
            Err(DocumentStoreError::ConnectionLost(_))
        ));
    }
}
