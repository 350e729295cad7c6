//! Query construction and filtering API for document stores.
//!
//! This module provides type-safe query construction with filtering, sorting,
//! result limiting, field projection, and a visitor pattern for query
//! evaluation across different transports.
//!
//! # Query Building
//!
//! Queries are constructed with the fluent builder API. Construction never
//! touches the network; an invalid clause combination fails at `build()`
//! time, before any I/O:
//!
//! ```ignore
//! use docbase::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("favoriteFoods", "Burrito"))
//!     .sort("name", SortDirection::Asc)
//!     .limit(2)
//!     .exclude("age")
//!     .build()?;
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides static methods for building filter
//! expressions:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Membership: `contains`
//! - Existence: `exists`, `not_exists`
//! - Logical: `and`, `or`
//!
//! Expressions can be combined using chainable methods for more complex
//! queries. Equality on an array-valued field matches membership: a filter
//! `eq("favoriteFoods", "Pizza")` matches any document whose food list
//! contains `"Pizza"`.

use bson::Bson;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification for query results.
///
/// Specifies which field to sort by and in which direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    /// Descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// Field projection applied to every returned document.
///
/// The two modes are mutually exclusive: a query either names the fields to
/// keep or the fields to drop, never both. The identifier field is always
/// retained under `Include`.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Only the listed fields (plus the identifier) appear in results.
    Include(Vec<String>),
    /// All fields except the listed ones appear in results.
    Exclude(Vec<String>),
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to (exact match; membership for array fields).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String or array contains value.
    Contains,
}

/// A filter expression for querying documents.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`)
/// to build complex filter predicates.
///
/// # Example
///
/// ```ignore
/// use docbase::query::Filter;
///
/// // Simple equality check
/// let expr1 = Filter::eq("name", "John Doe");
///
/// // Complex nested expression
/// let expr2 = Filter::and(vec![
///     Filter::eq("name", "John Doe"),
///     Filter::gt("age", 18),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// An immutable, structured query for retrieving and filtering documents.
///
/// Transports apply the clauses in a fixed order: filter, then sort, then
/// limit, then projection. Limit after sort keeps truncation deterministic;
/// projection last keeps it from affecting filtering or sorting. Use
/// [`QueryBuilder`] for construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Field projection applied to results.
    pub projection: Option<Projection>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
///
/// Provides static methods to construct common filter expressions in a type-safe manner.
/// All methods accept field names and values as `Into<String>` and `Into<Bson>` for ergonomics.
///
/// # Example
///
/// ```ignore
/// use docbase::query::Filter;
///
/// let expr = Filter::eq("name", "John Doe")
///     .and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
    /// Creates an equality filter expression.
    ///
    /// Matches documents where the field equals the specified value; for
    /// array-valued fields, matches documents whose array contains the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Creates a not-equal filter expression.
    ///
    /// Matches documents where the field does not equal the specified value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Creates a greater-than filter expression.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Creates a greater-than-or-equal filter expression.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Creates a less-than filter expression.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Creates a less-than-or-equal filter expression.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Creates a contains filter expression.
    ///
    /// Matches documents where the field (string or array) contains the specified value.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    /// Creates an existence filter expression.
    ///
    /// Matches documents where the field exists (is not missing).
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Creates a non-existence filter expression.
    ///
    /// Matches documents where the field does not exist (is missing).
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Creates a logical AND filter expression.
    ///
    /// Combines multiple expressions such that all must match for a document to be included.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Creates a logical OR filter expression.
    ///
    /// Combines multiple expressions such that any can match for a document to be included.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// Fluent builder producing an immutable [`Query`].
///
/// Invalid clause combinations are rejected by [`QueryBuilder::build`]
/// before the query ever reaches a transport.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    filter: Option<Expr>,
    sort: Option<Sort>,
    limit: Option<usize>,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the sort specification for the query results.
    ///
    /// # Arguments
    ///
    /// * `field` - The field name to sort by
    /// * `direction` - The sort direction (ascending or descending)
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds a field to the include-projection.
    ///
    /// Mutually exclusive with [`QueryBuilder::exclude`].
    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.include.push(field.into());
        self
    }

    /// Adds a field to the exclude-projection.
    ///
    /// Mutually exclusive with [`QueryBuilder::include`].
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.exclude.push(field.into());
        self
    }

    /// Builds and returns the final query.
    ///
    /// Fails with [`DocumentStoreError::InvalidQuery`] when both include-
    /// and exclude-projections were requested.
    pub fn build(self) -> DocumentStoreResult<Query> {
        let projection = match (self.include.is_empty(), self.exclude.is_empty()) {
            (true, true) => None,
            (false, true) => Some(Projection::Include(self.include)),
            (true, false) => Some(Projection::Exclude(self.exclude)),
            (false, false) => {
                return Err(DocumentStoreError::InvalidQuery(
                    "include- and exclude-projections are mutually exclusive".into(),
                ));
            }
        };

        Ok(Query {
            filter: self.filter,
            sort: self.sort,
            limit: self.limit,
            projection,
        })
    }
}

/// Visitor over [`Expr`] trees, the evaluation seam for transports.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_immutable_descriptor() {
        let query = Query::builder()
            .filter(Filter::eq("name", "John Doe"))
            .sort("name", SortDirection::Asc)
            .limit(2)
            .build()
            .unwrap();

        assert_eq!(query.limit, Some(2));
        assert_eq!(
            query.sort,
            Some(Sort { field: "name".into(), direction: SortDirection::Asc })
        );
        assert!(query.projection.is_none());
    }

    #[test]
    fn mixed_projection_modes_fail_at_build() {
        let result = Query::builder()
            .include("name")
            .exclude("age")
            .build();

        assert!(matches!(result, Err(DocumentStoreError::InvalidQuery(_))));
    }

    #[test]
    fn exclude_projection_survives_build() {
        let query = Query::builder().exclude("age").build().unwrap();

        assert_eq!(query.projection, Some(Projection::Exclude(vec!["age".into()])));
    }

    #[test]
    fn and_chaining_flattens() {
        let expr = Filter::eq("a", 1)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }
}
