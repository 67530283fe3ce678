//! Rows returned by an execution engine and decoding into records.
//!
//! ```rust
//! use grimoire_query::row::{FromRow, Row, RowError};
//!
//! struct Tag {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl FromRow for Tag {
//!     fn from_row(row: &Row) -> Result<Self, RowError> {
//!         Ok(Self {
//!             id: row.get("id")?,
//!             name: row.get("name")?,
//!         })
//!     }
//! }
//!
//! let row = Row::new().with("id", 7).with("name", "rust");
//! let tag = Tag::from_row(&row).unwrap();
//! assert_eq!(tag.id, 7);
//! assert_eq!(tag.name, "rust");
//! ```

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use thiserror::Error;

use crate::error::QueryError;
use crate::filter::FilterValue;

/// Error type for row deserialization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    /// Column not found.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    /// Type conversion error.
    #[error("type conversion error for '{column}': {message}")]
    TypeConversion {
        /// Column being decoded.
        column: String,
        /// What went wrong.
        message: String,
    },
    /// Null value in non-nullable column.
    #[error("unexpected null in column '{0}'")]
    UnexpectedNull(String),
}

impl From<RowError> for QueryError {
    fn from(err: RowError) -> Self {
        QueryError::deserialization(err.to_string()).with_source(err)
    }
}

/// One result row: column name to value, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, FilterValue>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Add or replace a column.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Raw value of a column.
    pub fn value(&self, column: &str) -> Option<&FilterValue> {
        self.columns.get(column)
    }

    /// Decode a column.
    pub fn get<T: FromColumn>(&self, column: &str) -> Result<T, RowError> {
        let value = self
            .columns
            .get(column)
            .ok_or_else(|| RowError::ColumnNotFound(column.to_string()))?;
        T::from_value(column, value)
    }

    /// Iterate columns in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Types that can be decoded from a row.
pub trait FromRow: Sized {
    /// Decode from a row.
    fn from_row(row: &Row) -> Result<Self, RowError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(row.clone())
    }
}

/// Types that can be decoded from a single column value.
pub trait FromColumn: Sized {
    /// Decode `value`, read from `column`.
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError>;
}

fn mismatch(column: &str, expected: &str, value: &FilterValue) -> RowError {
    if value.is_null() {
        return RowError::UnexpectedNull(column.to_string());
    }
    RowError::TypeConversion {
        column: column.to_string(),
        message: format!("expected {}, found {:?}", expected, value),
    }
}

impl FromColumn for i64 {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Int(v) => Ok(*v),
            _ => Err(mismatch(column, "integer", value)),
        }
    }
}

impl FromColumn for i32 {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        let v = i64::from_value(column, value)?;
        i32::try_from(v).map_err(|e| RowError::TypeConversion {
            column: column.to_string(),
            message: e.to_string(),
        })
    }
}

impl FromColumn for f64 {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Float(v) => Ok(*v),
            FilterValue::Int(v) => Ok(*v as f64),
            _ => Err(mismatch(column, "float", value)),
        }
    }
}

impl FromColumn for bool {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::Bool(v) => Ok(*v),
            _ => Err(mismatch(column, "boolean", value)),
        }
    }
}

impl FromColumn for String {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::String(v) => Ok(v.clone()),
            _ => Err(mismatch(column, "string", value)),
        }
    }
}

impl FromColumn for serde_json::Value {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        serde_json::to_value(value).map_err(|e| RowError::TypeConversion {
            column: column.to_string(),
            message: e.to_string(),
        })
    }
}

impl FromColumn for DateTime<Utc> {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        match value {
            FilterValue::String(v) => DateTime::parse_from_rfc3339(v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| RowError::TypeConversion {
                    column: column.to_string(),
                    message: e.to_string(),
                }),
            _ => Err(mismatch(column, "timestamp", value)),
        }
    }
}

impl FromColumn for FilterValue {
    fn from_value(_column: &str, value: &FilterValue) -> Result<Self, RowError> {
        Ok(value.clone())
    }
}

impl<T: FromColumn> FromColumn for Option<T> {
    fn from_value(column: &str, value: &FilterValue) -> Result<Self, RowError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(column, value).map(Some)
    }
}
