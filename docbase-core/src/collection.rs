//! Collection operations for document store access.
//!
//! A [`Collection`] is the typed CRUD and query surface over one named set of
//! documents sharing one [`Schema`]. Every operation validates its input
//! before any I/O, borrows one pooled connection, and releases it on all exit
//! paths.
//!
//! Not-found is asymmetric on purpose: an update with no match fails with
//! `NotFound`, while finds and deletes report an empty result (`None`,
//! `false`, or a count of 0) without failing.
//!
//! # Example
//!
//! ```ignore
//! use docbase_core::prelude::*;
//! use bson::doc;
//!
//! # async fn example(store: &docbase_core::store::DocumentStore) -> docbase_core::error::DocumentStoreResult<()> {
//! let schema = Schema::builder()
//!     .required("name", FieldType::String)
//!     .optional("age", FieldType::Number)
//!     .required("favoriteFoods", FieldType::Array(Box::new(FieldType::String)))
//!     .build()?;
//! let people = store.collection("people", schema);
//!
//! let saved = people
//!     .insert_one(doc! { "name": "John Doe", "age": 30, "favoriteFoods": ["Pizza", "Burger"] })
//!     .await?;
//! let found = people.find_one(Filter::eq("favoriteFoods", "Pizza")).await?;
//! # Ok(()) }
//! ```

use bson::{Document, Uuid};
use std::time::Duration;

use crate::{
    document::{ID_FIELD, document_id, ensure_id, merge_patch},
    error::{DocumentErrors, DocumentStoreError, DocumentStoreResult},
    pool::ConnectionPool,
    query::{Expr, Filter, Query},
    schema::Schema,
    transport::{DeleteTarget, Operation, Reply},
};

/// Options for [`Collection::update_one`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Return the post-update document instead of the pre-update image.
    pub return_updated: bool,
}

impl UpdateOptions {
    /// Options that return the updated document.
    pub fn returning_updated() -> Self {
        Self { return_updated: true }
    }
}

/// A named collection bound to one schema and the store's connection pool.
#[derive(Debug)]
pub struct Collection<'a> {
    name: String,
    schema: Schema,
    pool: &'a ConnectionPool,
    op_timeout: Duration,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(
        name: String,
        schema: Schema,
        pool: &'a ConnectionPool,
        op_timeout: Duration,
    ) -> Self {
        Self { name, schema, pool, op_timeout }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema this collection validates against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates and persists one document, assigning a fresh identifier if
    /// the candidate carries none.
    ///
    /// Returns the stored document, identifier included.
    ///
    /// # Errors
    ///
    /// `Validation` before any I/O when the candidate violates the schema;
    /// `DuplicateKey` when the identifier is already taken.
    pub async fn insert_one(&self, document: Document) -> DocumentStoreResult<Document> {
        let mut validated = self
            .schema
            .validate(&document)
            .map_err(DocumentStoreError::Validation)?;
        ensure_id(&mut validated).map_err(|err| DocumentStoreError::Validation(vec![err]))?;

        self.run(Operation::Insert {
            collection: self.name.clone(),
            documents: vec![validated.clone()],
        })
        .await?;

        Ok(validated)
    }

    /// Validates and persists a batch of documents, all-or-nothing.
    ///
    /// Every document is validated independently before any I/O. If any
    /// fails, nothing is persisted and the error lists each offending
    /// document's position and violations.
    pub async fn insert_many(
        &self,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Document>> {
        let mut validated = Vec::with_capacity(documents.len());
        let mut failures = Vec::new();
        for (index, document) in documents.iter().enumerate() {
            match self.schema.validate(document) {
                Ok(mut document) => match ensure_id(&mut document) {
                    Ok(_) => validated.push(document),
                    Err(err) => failures.push(DocumentErrors { index, errors: vec![err] }),
                },
                Err(errors) => failures.push(DocumentErrors { index, errors }),
            }
        }
        if !failures.is_empty() {
            return Err(DocumentStoreError::BatchValidation(failures));
        }

        self.run(Operation::Insert {
            collection: self.name.clone(),
            documents: validated.clone(),
        })
        .await?;

        Ok(validated)
    }

    /// Runs a structured query and returns the matching documents.
    ///
    /// Clauses apply in a fixed order (filter, sort, limit, projection) so
    /// truncation is deterministic. Re-calling re-queries; unsorted matches
    /// come back in insertion order.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let reply = self
            .run(Operation::Query {
                collection: self.name.clone(),
                query,
            })
            .await?;

        expect_documents(reply)
    }

    /// Returns the first document matching the filter, or `None`.
    ///
    /// An empty result is not an error.
    pub async fn find_one(&self, filter: Expr) -> DocumentStoreResult<Option<Document>> {
        let query = Query {
            filter: Some(filter),
            limit: Some(1),
            ..Query::default()
        };

        Ok(self.find(query).await?.into_iter().next())
    }

    /// Returns the document with the given identifier, or `None`.
    pub async fn find_by_id(&self, id: Uuid) -> DocumentStoreResult<Option<Document>> {
        self.find_one(Filter::eq(ID_FIELD, id.to_string())).await
    }

    /// Merges a patch into the first document matching the filter and
    /// persists the re-validated result.
    ///
    /// The first match is chosen in insertion order. Patch fields replace
    /// existing values wholesale, arrays included; the merged shape is
    /// validated before anything is written. Returns the pre- or post-update
    /// document depending on [`UpdateOptions::return_updated`].
    ///
    /// # Errors
    ///
    /// `NotFound` when no document matches; `Validation` when the merge
    /// produces an invalid shape or touches the identifier.
    pub async fn update_one(
        &self,
        filter: Expr,
        patch: Document,
        options: UpdateOptions,
    ) -> DocumentStoreResult<Document> {
        // One borrowed connection covers both round trips.
        let mut conn = self.pool.acquire().await?;

        let query = Query {
            filter: Some(filter),
            limit: Some(1),
            ..Query::default()
        };
        let reply = conn
            .execute(
                Operation::Query {
                    collection: self.name.clone(),
                    query,
                },
                self.op_timeout,
            )
            .await?;
        let Some(existing) = expect_documents(reply)?.into_iter().next() else {
            return Err(DocumentStoreError::NotFound(self.name.clone()));
        };

        let merged = merge_patch(&existing, &patch).map_err(DocumentStoreError::Validation)?;
        let merged = self
            .schema
            .validate(&merged)
            .map_err(DocumentStoreError::Validation)?;
        let id = document_id(&merged).ok_or_else(|| {
            DocumentStoreError::Backend("stored document is missing its identifier".into())
        })?;

        conn.execute(
            Operation::Replace {
                collection: self.name.clone(),
                id,
                document: merged.clone(),
            },
            self.op_timeout,
        )
        .await?;

        Ok(if options.return_updated { merged } else { existing })
    }

    /// Removes the document with the given identifier.
    ///
    /// Returns whether a removal occurred; not-found is `false`, not an
    /// error.
    pub async fn delete_by_id(&self, id: Uuid) -> DocumentStoreResult<bool> {
        let reply = self
            .run(Operation::Delete {
                collection: self.name.clone(),
                target: DeleteTarget::Ids(vec![id]),
            })
            .await?;

        Ok(expect_deleted(reply)? > 0)
    }

    /// Removes every document matching the filter and returns the count.
    ///
    /// A count of 0 is a valid, non-error result.
    pub async fn delete_many(&self, filter: Expr) -> DocumentStoreResult<u64> {
        let reply = self
            .run(Operation::Delete {
                collection: self.name.clone(),
                target: DeleteTarget::Matching(filter),
            })
            .await?;

        expect_deleted(reply)
    }

    async fn run(&self, op: Operation) -> DocumentStoreResult<Reply> {
        let mut conn = self.pool.acquire().await?;
        conn.execute(op, self.op_timeout).await
    }
}

fn expect_documents(reply: Reply) -> DocumentStoreResult<Vec<Document>> {
    match reply {
        Reply::Documents(documents) => Ok(documents),
        other => Err(DocumentStoreError::Backend(format!(
            "expected documents reply, got {other:?}"
        ))),
    }
}

fn expect_deleted(reply: Reply) -> DocumentStoreResult<u64> {
    match reply {
        Reply::Deleted(count) => Ok(count),
        other => Err(DocumentStoreError::Backend(format!(
            "expected delete count reply, got {other:?}"
        ))),
    }
}
