//! Schema declaration and document validation.
//!
//! A [`Schema`] is an ordered set of field definitions for one collection.
//! Every write against a collection runs its candidate document through
//! [`Schema::validate`] before any I/O happens: required fields must be
//! present, present fields must type-check, optional fields with a declared
//! default are filled in, and undeclared fields are rejected.
//!
//! # Example
//!
//! ```ignore
//! use docbase::schema::{Schema, FieldType};
//!
//! let schema = Schema::builder()
//!     .required("name", FieldType::String)
//!     .optional("age", FieldType::Number)
//!     .required("favoriteFoods", FieldType::Array(Box::new(FieldType::String)))
//!     .build()?;
//! ```

use bson::{Bson, Document};
use std::fmt;

use crate::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult, FieldError, ValidationFailure},
};

/// The declared value type of a schema field.
///
/// `Number` covers all BSON numeric representations (Int32, Int64, Double),
/// mirroring how document databases treat numbers as one type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Boolean value.
    Bool,
    /// Any numeric value (Int32, Int64 or Double).
    Number,
    /// UTF-8 string.
    String,
    /// Point-in-time value.
    DateTime,
    /// Homogeneous array of the given element type.
    Array(Box<FieldType>),
    /// Nested document with free-form fields.
    Document,
}

impl FieldType {
    /// Checks whether a BSON value inhabits this type.
    pub fn matches(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldType::Bool, Bson::Boolean(_)) => true,
            (FieldType::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => true,
            (FieldType::String, Bson::String(_)) => true,
            (FieldType::DateTime, Bson::DateTime(_)) => true,
            (FieldType::Array(elem), Bson::Array(items)) => {
                items.iter().all(|item| elem.matches(item))
            }
            (FieldType::Document, Bson::Document(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bool => write!(f, "bool"),
            FieldType::Number => write!(f, "number"),
            FieldType::String => write!(f, "string"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Array(elem) => write!(f, "array<{elem}>"),
            FieldType::Document => write!(f, "document"),
        }
    }
}

/// Short type name of a BSON value, used in mismatch reports.
pub(crate) fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Null => "null",
        Bson::Boolean(_) => "bool",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        Bson::String(_) => "string",
        Bson::DateTime(_) => "datetime",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        _ => "other",
    }
}

/// Declaration of one schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// The field name as it appears in stored documents.
    pub name: String,
    /// The declared value type.
    pub kind: FieldType,
    /// Whether the field must be present on every document.
    pub required: bool,
    /// Value filled in when an optional field is absent.
    pub default: Option<Bson>,
}

/// The declared shape constraints for documents in one collection.
///
/// Field definitions keep their declaration order; the identifier field
/// (`_id`) is implicitly declared and never needs to appear in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Creates a new builder for fluent schema construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the ordered field definitions.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates a candidate document against this schema.
    ///
    /// Pure and free of I/O. On success returns the document with optional
    /// defaults filled in; a document that already satisfies the schema is
    /// returned unchanged. On failure returns every violation found, so
    /// batch operations can report them all at once.
    ///
    /// The identifier field is skipped: it is assigned by the store and not
    /// part of the declared shape.
    pub fn validate(&self, candidate: &Document) -> Result<Document, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut validated = candidate.clone();

        for spec in &self.fields {
            match candidate.get(&spec.name) {
                None => {
                    if spec.required {
                        errors.push(FieldError::new(&spec.name, ValidationFailure::MissingField));
                    } else if let Some(default) = &spec.default {
                        validated.insert(spec.name.clone(), default.clone());
                    }
                }
                Some(value) => {
                    if !spec.kind.matches(value) {
                        errors.push(FieldError::new(
                            &spec.name,
                            ValidationFailure::TypeMismatch {
                                expected: spec.kind.clone(),
                                found: bson_type_name(value),
                            },
                        ));
                    }
                }
            }
        }

        for (name, _) in candidate.iter() {
            let name: &str = name.as_ref();
            if name != ID_FIELD && self.field(name).is_none() {
                errors.push(FieldError::new(name, ValidationFailure::UnknownField));
            }
        }

        if errors.is_empty() { Ok(validated) } else { Err(errors) }
    }
}

/// Builder for constructing [`Schema`] instances.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Creates an empty schema builder.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declares a required field.
    pub fn required(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: true,
            default: None,
        });
        self
    }

    /// Declares an optional field with no default.
    pub fn optional(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
            default: None,
        });
        self
    }

    /// Declares an optional field filled with `default` when absent.
    pub fn optional_with_default(
        mut self,
        name: impl Into<String>,
        kind: FieldType,
        default: impl Into<Bson>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
            default: Some(default.into()),
        });
        self
    }

    /// Builds the schema, rejecting any default value that does not match
    /// its declared field type.
    pub fn build(self) -> DocumentStoreResult<Schema> {
        for spec in &self.fields {
            if let Some(default) = &spec.default {
                if !spec.kind.matches(default) {
                    return Err(DocumentStoreError::Validation(vec![FieldError::new(
                        &spec.name,
                        ValidationFailure::TypeMismatch {
                            expected: spec.kind.clone(),
                            found: bson_type_name(default),
                        },
                    )]));
                }
            }
        }

        Ok(Schema { fields: self.fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn person_schema() -> Schema {
        Schema::builder()
            .required("name", FieldType::String)
            .optional("age", FieldType::Number)
            .required("favoriteFoods", FieldType::Array(Box::new(FieldType::String)))
            .build()
            .unwrap()
    }

    #[test]
    fn valid_document_passes_unchanged() {
        let schema = person_schema();
        let doc = doc! { "name": "John Doe", "age": 30, "favoriteFoods": ["Pizza", "Burger"] };

        assert_eq!(schema.validate(&doc).unwrap(), doc);
    }

    #[test]
    fn validation_is_idempotent() {
        let schema = Schema::builder()
            .required("name", FieldType::String)
            .optional_with_default("tags", FieldType::Array(Box::new(FieldType::String)), Vec::<Bson>::new())
            .build()
            .unwrap();

        let once = schema.validate(&doc! { "name": "a" }).unwrap();
        let twice = schema.validate(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.get_array("tags").unwrap().len(), 0);
    }

    #[test]
    fn missing_required_field_is_named() {
        let schema = person_schema();
        let errors = schema
            .validate(&doc! { "age": 30, "favoriteFoods": ["Pizza"] })
            .unwrap_err();

        assert_eq!(errors, vec![FieldError::new("name", ValidationFailure::MissingField)]);
    }

    #[test]
    fn type_mismatch_reports_expected_and_found() {
        let schema = person_schema();
        let errors = schema
            .validate(&doc! { "name": "a", "age": "thirty", "favoriteFoods": ["Pizza"] })
            .unwrap_err();

        assert_eq!(
            errors,
            vec![FieldError::new(
                "age",
                ValidationFailure::TypeMismatch { expected: FieldType::Number, found: "string" },
            )]
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let schema = person_schema();
        let errors = schema
            .validate(&doc! { "name": "a", "favoriteFoods": ["Pizza"], "nickname": "x" })
            .unwrap_err();

        assert_eq!(errors, vec![FieldError::new("nickname", ValidationFailure::UnknownField)]);
    }

    #[test]
    fn multiple_violations_are_all_collected() {
        let schema = person_schema();
        let errors = schema
            .validate(&doc! { "age": true, "extra": 1 })
            .unwrap_err();

        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn identifier_field_is_implicitly_declared() {
        let schema = person_schema();
        let doc = doc! { "_id": "abc", "name": "a", "favoriteFoods": ["Pizza"] };

        assert!(schema.validate(&doc).is_ok());
    }

    #[test]
    fn array_elements_are_type_checked() {
        let schema = person_schema();
        let errors = schema
            .validate(&doc! { "name": "a", "favoriteFoods": ["Pizza", 4] })
            .unwrap_err();

        assert!(matches!(
            errors[0].reason,
            ValidationFailure::TypeMismatch { found: "array", .. }
        ));
    }

    #[test]
    fn builder_rejects_mistyped_default() {
        let result = Schema::builder()
            .optional_with_default("age", FieldType::Number, "thirty")
            .build();

        assert!(matches!(result, Err(DocumentStoreError::Validation(_))));
    }
}
