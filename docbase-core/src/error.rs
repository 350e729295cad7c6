//! Error types and result types for document store operations.
//!
//! This module provides comprehensive error handling for all document store operations.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.
//!
//! Validation and query-construction errors are detected before any I/O and
//! surfaced immediately. Transport-level errors ([`DocumentStoreError::ConnectionLost`],
//! [`DocumentStoreError::Timeout`]) are surfaced to the caller without any retry
//! inside the client; retry policy belongs to the caller.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::schema::FieldType;

/// The reason a single document field failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// A field the schema marks as required is absent from the candidate.
    #[error("required field is missing")]
    MissingField,
    /// The field is present but its value has the wrong BSON type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the schema declares for this field.
        expected: FieldType,
        /// A short name for the BSON type actually found.
        found: &'static str,
    },
    /// The candidate carries a field the schema does not declare.
    #[error("field is not declared in the schema")]
    UnknownField,
    /// The identifier field is assigned at insertion and cannot be patched.
    #[error("the identifier field is immutable")]
    ImmutableId,
    /// The identifier field must hold a UUID in hyphenated string form.
    #[error("the identifier is not a valid UUID string")]
    MalformedId,
}

/// A single field-level validation violation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("field `{field}`: {reason}")]
pub struct FieldError {
    /// The offending field name.
    pub field: String,
    /// Why the field was rejected.
    pub reason: ValidationFailure,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: ValidationFailure) -> Self {
        Self { field: field.into(), reason }
    }
}

/// All validation violations of one document within a batch insert.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentErrors {
    /// Zero-based position of the document in the submitted batch.
    pub index: usize,
    /// Every field violation found in that document.
    pub errors: Vec<FieldError>,
}

/// Represents all possible errors that can occur when interacting with a document store.
///
/// This enum covers pool and transport failures, document validation, query
/// construction, and backend-specific errors.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// No pooled connection became available within the acquire timeout.
    #[error("connection pool exhausted")]
    ConnectionExhausted,
    /// The transport connection failed mid-operation or is no longer usable.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// One document failed schema validation. Carries every field violation found.
    #[error("validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),
    /// A batch insert failed validation. Nothing was persisted; one entry per
    /// offending document.
    #[error("batch validation failed for {} document(s)", .0.len())]
    BatchValidation(Vec<DocumentErrors>),
    /// A document with the given identifier already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("duplicate key {0} in collection {1}")]
    DuplicateKey(String, String),
    /// An update matched no document in the collection.
    #[error("no document matched in collection {0}")]
    NotFound(String),
    /// The query builder was given an invalid clause combination.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// A transport round trip exceeded the operation timeout.
    #[error("operation timed out after {0} ms")]
    Timeout(u64),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or configuration.
    #[error("initialization error: {0}")]
    Initialization(String),
    /// An error occurred in the underlying transport backend.
    #[error("backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Whether this error poisons the connection it occurred on.
    ///
    /// A poisoned connection is closed instead of being returned to the pool;
    /// logical outcomes (duplicate key, not found, validation) leave the
    /// connection healthy.
    pub fn poisons_connection(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::ConnectionLost(_)
                | DocumentStoreError::Timeout(_)
                | DocumentStoreError::Backend(_)
        )
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
