//! Query evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for query expressions along
//! with the rest of the query pipeline: matching documents are sorted,
//! truncated, and projected, in that fixed order.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime};

use docbase_core::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Projection, Query, QueryVisitor, SortDirection},
};

/// Type-erased, comparable representation of BSON values.
///
/// Wraps BSON values for filter and sort comparisons, normalizing all numeric
/// types to f64. Values of differing types never compare equal and have no
/// ordering.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr.iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>(),
            ),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| {
                        let k: &str = k.as_ref();
                        (k, Comparable::from(v))
                    })
                    .collect::<HashMap<_, _>>(),
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(self.document.get(field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.document.get(field) else {
            return Ok(false);
        };

        match op {
            FieldOp::Eq => Ok(matches_eq(field_value, value)),
            FieldOp::Ne => Ok(!matches_eq(field_value, value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => Ok(match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        FieldOp::Lte => ordering != Ordering::Greater,
                        _ => unreachable!(),
                    }),
                    None => Ok(false),
                }
            }
            FieldOp::Contains => match Comparable::from(field_value) {
                Comparable::Array(array) => {
                    Ok(array.iter().any(|item| item == &Comparable::from(value)))
                }
                Comparable::String(left) => match Comparable::from(value) {
                    Comparable::String(right) => Ok(left.contains(right)),
                    _ => Ok(false),
                },
                _ => Ok(false),
            },
        }
    }
}

/// Equality with array membership: comparing an array field against a scalar
/// matches when any element equals the scalar, as in MongoDB.
fn matches_eq(field_value: &Bson, value: &Bson) -> bool {
    match (Comparable::from(field_value), Comparable::from(value)) {
        (Comparable::Array(items), scalar @ (Comparable::Null
        | Comparable::Bool(_)
        | Comparable::Number(_)
        | Comparable::DateTime(_)
        | Comparable::String(_))) => items.iter().any(|item| item == &scalar),
        (left, right) => left == right,
    }
}

/// Runs the full query pipeline over a collection snapshot.
///
/// Stages apply in a fixed order: filter, then sort, then limit, then
/// projection. The input order (insertion order) is preserved for unsorted
/// queries and for sort ties.
pub(crate) fn apply_query<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    query: &Query,
) -> DocumentStoreResult<Vec<Document>> {
    let mut matches = Vec::new();
    for document in documents {
        let keep = match &query.filter {
            Some(filter) => DocumentEvaluator::new(document).evaluate(filter)?,
            None => true,
        };
        if keep {
            matches.push(document.clone());
        }
    }

    if let Some(sort) = &query.sort {
        matches.sort_by(|a, b| {
            let left = a.get(&sort.field).map(Comparable::from).unwrap_or(Comparable::Null);
            let right = b.get(&sort.field).map(Comparable::from).unwrap_or(Comparable::Null);

            match sort.direction {
                SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
            }
        });
    }

    matches.truncate(query.limit.unwrap_or(usize::MAX));

    if let Some(projection) = &query.projection {
        for document in &mut matches {
            *document = project(document, projection);
        }
    }

    Ok(matches)
}

/// Applies a projection to one document. The identifier field is always kept
/// under `Include`.
fn project(document: &Document, projection: &Projection) -> Document {
    let mut projected = Document::new();
    match projection {
        Projection::Include(fields) => {
            for (key, value) in document.iter() {
                let key: &str = key.as_ref();
                if key == ID_FIELD || fields.iter().any(|f| f == key) {
                    projected.insert(key, value.clone());
                }
            }
        }
        Projection::Exclude(fields) => {
            for (key, value) in document.iter() {
                let key: &str = key.as_ref();
                if !fields.iter().any(|f| f == key) {
                    projected.insert(key, value.clone());
                }
            }
        }
    }

    projected
}
