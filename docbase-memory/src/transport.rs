//! In-memory transport implementation for document stores.
//!
//! This module provides a simple but complete in-process transport that
//! stores documents in insertion-ordered maps behind an async-aware
//! read-write lock. It is the deterministic backend for tests and local
//! development; it honors the same operation semantics a wire-level driver
//! would.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use bson::{Document, Uuid};
use indexmap::IndexMap;
use mea::rwlock::RwLock;

use docbase_core::{
    document::{ID_FIELD, document_id},
    error::{DocumentStoreError, DocumentStoreResult},
    transport::{Connection, DeleteTarget, Operation, Reply, Transport},
};

use crate::evaluator::{DocumentEvaluator, apply_query};

/// One collection: document id (as a string) to document, in insertion order.
type CollectionMap = IndexMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory transport.
///
/// Implements the [`Transport`] trait over a shared map of collections.
/// Connections are plain tokens tracked in a live set; executing on a closed
/// connection fails with `ConnectionLost`, matching what a dropped socket
/// would produce.
///
/// # Thread Safety
///
/// `MemoryTransport` is cloneable and uses `Arc`-wrapped internal state, so
/// clones share the same underlying data across async tasks.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing). For small to
/// medium datasets this is typically acceptable.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use docbase_memory::MemoryTransport;
/// use docbase_core::{config::StoreConfig, store::DocumentStore};
///
/// let transport = Arc::new(MemoryTransport::new());
/// let store = DocumentStore::connect(transport, StoreConfig::new("memory://local"))?;
/// # Ok::<(), docbase_core::error::DocumentStoreError>(())
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryTransport {
    /// The main storage map: collection name to its documents.
    collections: Arc<RwLock<StoreMap>>,
    /// Ids of connections that have been dialed and not yet closed.
    live: Arc<RwLock<HashSet<u64>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryTransport {
    /// Creates a new empty in-memory transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in the named collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|col| col.len())
            .unwrap_or(0)
    }

    /// Whether the named collection holds no documents.
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    async fn check_live(&self, conn: &Connection) -> DocumentStoreResult<()> {
        if self.live.read().await.contains(&conn.id()) {
            Ok(())
        } else {
            Err(DocumentStoreError::ConnectionLost(format!(
                "connection {} is closed",
                conn.id()
            )))
        }
    }

    fn insert(
        store: &mut StoreMap,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Reply> {
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        // All-or-nothing: check the whole batch before the first write.
        let mut incoming = HashSet::new();
        for document in &documents {
            let id = document_id(document).ok_or_else(|| {
                DocumentStoreError::Backend(format!(
                    "insert into `{collection}` carries a document without `{ID_FIELD}`"
                ))
            })?;
            let key = id.to_string();

            if collection_map.contains_key(&key) || !incoming.insert(key.clone()) {
                return Err(DocumentStoreError::DuplicateKey(key, collection.to_string()));
            }
        }

        for document in documents {
            if let Some(id) = document_id(&document) {
                collection_map.insert(id.to_string(), document);
            }
        }

        Ok(Reply::Ack)
    }

    fn replace(
        store: &mut StoreMap,
        collection: &str,
        id: Uuid,
        document: Document,
    ) -> DocumentStoreResult<Reply> {
        let key = id.to_string();
        let slot = store
            .get_mut(collection)
            .and_then(|col| col.get_mut(&key))
            .ok_or_else(|| DocumentStoreError::NotFound(collection.to_string()))?;
        *slot = document;

        Ok(Reply::Ack)
    }

    fn delete(
        store: &mut StoreMap,
        collection: &str,
        target: DeleteTarget,
    ) -> DocumentStoreResult<Reply> {
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(Reply::Deleted(0));
        };

        let deleted = match target {
            DeleteTarget::Ids(ids) => {
                let mut deleted = 0;
                for id in ids {
                    // shift_remove keeps the remaining insertion order intact
                    if collection_map.shift_remove(&id.to_string()).is_some() {
                        deleted += 1;
                    }
                }
                deleted
            }
            DeleteTarget::Matching(filter) => {
                let mut doomed = Vec::new();
                for (key, document) in collection_map.iter() {
                    if DocumentEvaluator::new(document).evaluate(&filter)? {
                        doomed.push(key.clone());
                    }
                }
                for key in &doomed {
                    collection_map.shift_remove(key);
                }
                doomed.len() as u64
            }
        };

        Ok(Reply::Deleted(deleted))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, _endpoint: &str) -> DocumentStoreResult<Connection> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.write().await.insert(id);

        Ok(Connection::new(id))
    }

    async fn execute(&self, conn: &Connection, op: Operation) -> DocumentStoreResult<Reply> {
        self.check_live(conn).await?;

        match op {
            Operation::Insert { collection, documents } => {
                let mut store = self.collections.write().await;
                Self::insert(&mut store, &collection, documents)
            }
            Operation::Query { collection, query } => {
                let store = self.collections.read().await;
                let documents = match store.get(&collection) {
                    Some(collection_map) => apply_query(collection_map.values(), &query)?,
                    None => Vec::new(),
                };

                Ok(Reply::Documents(documents))
            }
            Operation::Replace { collection, id, document } => {
                let mut store = self.collections.write().await;
                Self::replace(&mut store, &collection, id, document)
            }
            Operation::Delete { collection, target } => {
                let mut store = self.collections.write().await;
                Self::delete(&mut store, &collection, target)
            }
        }
    }

    async fn close(&self, conn: Connection) -> DocumentStoreResult<()> {
        self.live.write().await.remove(&conn.id());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docbase_core::query::{Filter, Query};

    fn with_id(mut document: Document) -> (Uuid, Document) {
        let id = Uuid::new();
        document.insert(ID_FIELD, id.to_string());
        (id, document)
    }

    async fn connected() -> (MemoryTransport, Connection) {
        let transport = MemoryTransport::new();
        let conn = transport.connect("memory://test").await.unwrap();
        (transport, conn)
    }

    #[tokio::test]
    async fn insert_and_query_round_trip() {
        let (transport, conn) = connected().await;
        let (_, doc) = with_id(doc! { "name": "Alice" });

        transport
            .execute(&conn, Operation::Insert {
                collection: "people".into(),
                documents: vec![doc],
            })
            .await
            .unwrap();

        let reply = transport
            .execute(&conn, Operation::Query {
                collection: "people".into(),
                query: Query::default(),
            })
            .await
            .unwrap();
        let Reply::Documents(found) = reply else { panic!("expected documents") };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name").unwrap(), "Alice");
    }

    #[tokio::test]
    async fn duplicate_insert_persists_nothing() {
        let (transport, conn) = connected().await;
        let (id, first) = with_id(doc! { "name": "Alice" });
        transport
            .execute(&conn, Operation::Insert {
                collection: "people".into(),
                documents: vec![first],
            })
            .await
            .unwrap();

        let mut clash = doc! { "name": "Impostor" };
        clash.insert(ID_FIELD, id.to_string());
        let (_, fresh) = with_id(doc! { "name": "Bob" });
        let err = transport
            .execute(&conn, Operation::Insert {
                collection: "people".into(),
                documents: vec![fresh, clash],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::DuplicateKey(_, _)));
        // the non-clashing half of the batch was not persisted either
        assert_eq!(transport.len("people").await, 1);
    }

    #[tokio::test]
    async fn replace_missing_document_is_not_found() {
        let (transport, conn) = connected().await;
        let err = transport
            .execute(&conn, Operation::Replace {
                collection: "people".into(),
                id: Uuid::new(),
                document: doc! { "name": "Ghost" },
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_counts_only_existing_documents() {
        let (transport, conn) = connected().await;
        let (id, doc) = with_id(doc! { "name": "Alice" });
        transport
            .execute(&conn, Operation::Insert {
                collection: "people".into(),
                documents: vec![doc],
            })
            .await
            .unwrap();

        let reply = transport
            .execute(&conn, Operation::Delete {
                collection: "people".into(),
                target: DeleteTarget::Ids(vec![id, Uuid::new()]),
            })
            .await
            .unwrap();
        assert_eq!(reply, Reply::Deleted(1));

        let reply = transport
            .execute(&conn, Operation::Delete {
                collection: "people".into(),
                target: DeleteTarget::Ids(vec![id]),
            })
            .await
            .unwrap();
        assert_eq!(reply, Reply::Deleted(0));
    }

    #[tokio::test]
    async fn delete_matching_reports_count() {
        let (transport, conn) = connected().await;
        let docs = vec![
            with_id(doc! { "name": "Alice", "age": 34 }).1,
            with_id(doc! { "name": "Bob", "age": 28 }).1,
            with_id(doc! { "name": "Carol", "age": 41 }).1,
        ];
        transport
            .execute(&conn, Operation::Insert {
                collection: "people".into(),
                documents: docs,
            })
            .await
            .unwrap();

        let reply = transport
            .execute(&conn, Operation::Delete {
                collection: "people".into(),
                target: DeleteTarget::Matching(Filter::gt("age", 30)),
            })
            .await
            .unwrap();
        assert_eq!(reply, Reply::Deleted(2));
        assert_eq!(transport.len("people").await, 1);
    }

    #[tokio::test]
    async fn closed_connection_reports_lost() {
        let (transport, conn) = connected().await;
        let id = conn.id();
        transport.close(conn).await.unwrap();

        let err = transport
            .execute(&Connection::new(id), Operation::Query {
                collection: "people".into(),
                query: Query::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::ConnectionLost(_)));
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let (transport, conn) = connected().await;
        let twin = transport.clone();
        let (_, doc) = with_id(doc! { "name": "Alice" });

        transport
            .execute(&conn, Operation::Insert {
                collection: "people".into(),
                documents: vec![doc],
            })
            .await
            .unwrap();

        assert_eq!(twin.len("people").await, 1);
    }
}
