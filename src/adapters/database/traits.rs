//! Database abstraction traits
//!
//! This module defines the contracts the export core expects from the
//! database layer: a pool that hands out connections, and a connection that
//! runs read-only queries against the city database.

use crate::domain::geometry::Geometry;
use crate::domain::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// A single decoded column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal text of a NUMERIC column, scale preserved
    Numeric(String),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Geometry(Geometry),
}

impl SqlValue {
    /// Returns the integer value, if this is an integer column
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value, widening integers and decimals
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float(v) => Some(*v),
            SqlValue::Int(v) => Some(*v as f64),
            SqlValue::Numeric(v) => v.parse().ok(),
            _ => None,
        }
    }

    /// Returns the text value, if this is a text column
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the geometry, if this is a geometry column
    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            SqlValue::Geometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// One result row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// Value at a zero-based column index
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

impl From<Vec<SqlValue>> for SqlRow {
    fn from(values: Vec<SqlValue>) -> Self {
        Self::new(values)
    }
}

/// Query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(Vec<i32>),
}

/// One live connection owned by a single export worker
///
/// Implementations are positioned (schema, transaction) before they are
/// handed out, so callers only run queries and finally commit.
#[async_trait]
pub trait ExportConnection: Send + Sync {
    /// Run a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connection` when the connection is gone and
    /// `DatabaseError::Query` for any statement failure.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>>;

    /// Run a query whose text is unlikely to repeat
    ///
    /// Implementations that cache prepared statements per connection must
    /// not keep this one. Defaults to `query`.
    ///
    /// # Errors
    ///
    /// Same as `query`.
    async fn query_unprepared(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>> {
        self.query(sql, params).await
    }

    /// Commit the connection's transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    async fn commit(&mut self) -> Result<()>;

    /// Release the connection back to its pool
    ///
    /// After this call the connection must not be used again.
    async fn close(&mut self);
}

/// Source of positioned export connections
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Connection: ExportConnection + 'static;

    /// Acquire one connection for exclusive use by a worker
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Connection` if no connection can be obtained.
    async fn acquire(&self) -> Result<Self::Connection>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeometryKind;

    #[test]
    fn test_value_accessors() {
        assert_eq!(SqlValue::Int(3).as_i64(), Some(3));
        assert_eq!(SqlValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(SqlValue::Text("a".into()).as_str(), Some("a"));
        assert!(SqlValue::Null.is_null());
        assert!(SqlValue::Float(1.5).as_i64().is_none());
        assert_eq!(SqlValue::Numeric("12.50".into()).as_f64(), Some(12.5));
        assert_eq!(SqlValue::Numeric("NaN".into()).as_str(), None);

        let g = Geometry::new(GeometryKind::Point, 2, vec![1.0, 2.0]);
        assert_eq!(SqlValue::Geometry(g.clone()).as_geometry(), Some(&g));
    }

    #[test]
    fn test_row_access() {
        let row = SqlRow::from(vec![SqlValue::Int(1), SqlValue::Null]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&SqlValue::Int(1)));
        assert_eq!(row.get(5), None);
    }
}
