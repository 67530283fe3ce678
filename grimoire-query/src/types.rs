//! Ordering, join and aggregate values carried by a [`Query`](crate::query::Query).

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::filter::Filter;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// Get the keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Null handling in sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// Nulls appear first in the results.
    First,
    /// Nulls appear last in the results.
    Last,
}

/// Order by specification for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// The column name to order by.
    pub column: Cow<'static, str>,
    /// The sort order.
    pub order: SortOrder,
    /// Null handling (optional).
    pub nulls: Option<NullsOrder>,
}

impl OrderByField {
    /// Create a new order by field.
    pub fn new(column: impl Into<Cow<'static, str>>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
            nulls: None,
        }
    }

    /// Set null handling.
    pub fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }

    /// Create an ascending order.
    pub fn asc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Create a descending order.
    pub fn desc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Desc)
    }
}

/// How a joined collection is combined with the current one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum JoinMode {
    /// Inner join.
    #[default]
    Inner,
    /// Left outer join.
    Left,
    /// Right outer join.
    Right,
    /// Full outer join.
    Full,
    /// Any other join keyword the engine understands.
    Custom(String),
}

impl JoinMode {
    /// Get the join keyword.
    pub fn as_sql(&self) -> &str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Custom(mode) => mode,
        }
    }
}

impl From<&str> for JoinMode {
    fn from(mode: &str) -> Self {
        match mode.to_ascii_uppercase().as_str() {
            "JOIN" | "INNER JOIN" => Self::Inner,
            "LEFT JOIN" => Self::Left,
            "RIGHT JOIN" => Self::Right,
            "FULL JOIN" => Self::Full,
            _ => Self::Custom(mode.to_string()),
        }
    }
}

/// A join against another collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join mode.
    pub mode: JoinMode,
    /// Joined collection.
    pub collection: String,
    /// Join condition.
    pub condition: Filter,
}

/// Aggregate function applied by an aggregate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateMode {
    /// COUNT.
    Count,
    /// SUM.
    Sum,
    /// AVG.
    Avg,
    /// MIN.
    Min,
    /// MAX.
    Max,
}

impl AggregateMode {
    /// Lowercase function name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Aggregate request: a function over a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    /// Aggregate function.
    pub mode: AggregateMode,
    /// Aggregated field (`*` for row counts).
    pub field: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order() {
        assert_eq!(SortOrder::default(), SortOrder::Asc);
        assert_eq!(SortOrder::Desc.to_string(), "DESC");
    }

    #[test]
    fn test_order_by_field() {
        let order = OrderByField::desc("created_at").nulls(NullsOrder::Last);
        assert_eq!(order.column, "created_at");
        assert_eq!(order.order, SortOrder::Desc);
        assert_eq!(order.nulls, Some(NullsOrder::Last));
    }

    #[test]
    fn test_join_mode_from_str() {
        assert_eq!(JoinMode::from("join"), JoinMode::Inner);
        assert_eq!(JoinMode::from("LEFT JOIN"), JoinMode::Left);
        assert_eq!(
            JoinMode::from("LEFT OUTER JOIN"),
            JoinMode::Custom("LEFT OUTER JOIN".to_string())
        );
        assert_eq!(JoinMode::Custom("CROSS JOIN".into()).as_sql(), "CROSS JOIN");
    }

    #[test]
    fn test_aggregate_mode() {
        assert_eq!(AggregateMode::Count.as_str(), "count");
        assert_eq!(AggregateMode::Max.as_str(), "max");
    }
}
