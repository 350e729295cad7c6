//! Document representation and identifier handling.
//!
//! A stored document is a [`bson::Document`] whose designated identifier
//! field is [`ID_FIELD`]. Identifiers are UUIDs stored in their hyphenated
//! string form, assigned at insertion when absent and immutable thereafter.

use bson::{Bson, Document, Uuid};

use crate::error::{DocumentStoreResult, FieldError, ValidationFailure};

/// The designated identifier field of every stored document.
pub const ID_FIELD: &str = "_id";

/// Extracts the identifier of a document, if one is set.
pub fn document_id(document: &Document) -> Option<Uuid> {
    match document.get(ID_FIELD) {
        Some(Bson::String(value)) => Uuid::parse_str(value).ok(),
        _ => None,
    }
}

/// Ensures a document carries a well-formed identifier, assigning a fresh
/// one if absent.
///
/// A present identifier must be a UUID in hyphenated string form. Anything
/// else is rejected rather than silently replaced, since identifiers are
/// immutable once assigned. Returns the identifier the document ends up
/// with.
pub fn ensure_id(document: &mut Document) -> Result<Uuid, FieldError> {
    match document.get(ID_FIELD) {
        None => {
            let id = Uuid::new();
            document.insert(ID_FIELD, id.to_string());
            Ok(id)
        }
        Some(Bson::String(value)) => Uuid::parse_str(value)
            .map_err(|_| FieldError::new(ID_FIELD, ValidationFailure::MalformedId)),
        Some(_) => Err(FieldError::new(ID_FIELD, ValidationFailure::MalformedId)),
    }
}

/// Merges a patch into an existing document, field by field.
///
/// Patch fields replace existing values wholesale; this includes array
/// values, which are replaced rather than appended to. A patch that touches
/// the identifier field is rejected, since identifiers are immutable.
pub fn merge_patch(existing: &Document, patch: &Document) -> Result<Document, Vec<FieldError>> {
    if patch.get(ID_FIELD).is_some() {
        return Err(vec![FieldError::new(ID_FIELD, ValidationFailure::ImmutableId)]);
    }

    let mut merged = existing.clone();
    for (name, value) in patch.iter() {
        let name: &str = name.as_ref();
        merged.insert(name, value.clone());
    }

    Ok(merged)
}

/// Serializes any `Serialize` value into a BSON document.
///
/// Convenience for callers that model their records as plain structs rather
/// than hand-built BSON.
pub fn to_document<T: serde::Serialize>(value: &T) -> DocumentStoreResult<Document> {
    Ok(bson::ser::serialize_to_document(value)?)
}

/// Deserializes a stored BSON document into a typed value.
pub fn from_document<T: serde::de::DeserializeOwned>(document: Document) -> DocumentStoreResult<T> {
    Ok(bson::de::deserialize_from_document(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn ensure_id_assigns_once() {
        let mut doc = doc! { "name": "a" };
        let id = ensure_id(&mut doc).unwrap();

        assert_eq!(document_id(&doc), Some(id));
        assert_eq!(ensure_id(&mut doc).unwrap(), id);
    }

    #[test]
    fn malformed_identifier_is_rejected_not_replaced() {
        let mut not_a_uuid = doc! { "_id": "abc", "name": "a" };
        let err = ensure_id(&mut not_a_uuid).unwrap_err();
        assert_eq!(err.field, ID_FIELD);
        assert_eq!(err.reason, ValidationFailure::MalformedId);
        assert_eq!(not_a_uuid.get_str(ID_FIELD).unwrap(), "abc");

        let mut not_a_string = doc! { "_id": 5, "name": "a" };
        assert!(ensure_id(&mut not_a_string).is_err());
    }

    #[test]
    fn merge_replaces_fields_wholesale() {
        let existing = doc! { "name": "a", "favoriteFoods": ["Pizza", "Burger"], "age": 30 };
        let patch = doc! { "favoriteFoods": ["Tacos"] };

        let merged = merge_patch(&existing, &patch).unwrap();
        assert_eq!(merged.get_array("favoriteFoods").unwrap().len(), 1);
        assert_eq!(merged.get_str("name").unwrap(), "a");
        assert_eq!(merged.get_i32("age").unwrap(), 30);
    }

    #[test]
    fn merge_rejects_identifier_patch() {
        let existing = doc! { "_id": Uuid::new().to_string(), "name": "a" };
        let patch = doc! { "_id": "other" };

        let errors = merge_patch(&existing, &patch).unwrap_err();
        assert_eq!(errors[0].reason, ValidationFailure::ImmutableId);
    }
}
