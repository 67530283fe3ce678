//! Query descriptor: a dialect-independent description of a query.
//!
//! Every builder method consumes the descriptor and returns the derived one,
//! so branching is done by cloning:
//!
//! ```rust
//! use grimoire_query::{Filter, Query};
//!
//! let base = Query::new("users").r#where(Filter::eq("active", true));
//! let admins = base.clone().r#where(Filter::eq("role", "admin"));
//!
//! assert_eq!(base.condition, Filter::eq("active", true));
//! assert_ne!(base, admins);
//! ```

use indexmap::IndexMap;
use tracing::debug;

use crate::filter::{Filter, FilterValue};
use crate::relations::naming;
use crate::types::{Aggregate, AggregateMode, Join, JoinMode, OrderByField};

/// Lock clause used by [`Query::lock`].
pub const DEFAULT_LOCK: &str = "FOR UPDATE";

/// Describes what to read or write; an engine decides how.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Target collection (table).
    pub collection: String,
    /// Projection; empty selects everything.
    pub fields: Vec<String>,
    /// Aggregate request.
    pub aggregate: Option<Aggregate>,
    /// Whether to select distinct rows.
    pub distinct: bool,
    /// Joins, in declaration order.
    pub joins: Vec<Join>,
    /// WHERE condition.
    pub condition: Filter,
    /// GROUP BY fields.
    pub group_by: Vec<String>,
    /// HAVING condition.
    pub having: Filter,
    /// Ordering, in declaration order.
    pub order_by: Vec<OrderByField>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Maximum rows to return.
    pub limit: Option<u64>,
    /// Row lock clause; only set inside a transaction.
    pub lock: Option<String>,
    /// Pending field writes for update operations.
    pub changes: IndexMap<String, FilterValue>,
    in_transaction: bool,
}

impl Query {
    /// Start a descriptor for `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Mark the descriptor as built inside an active transaction.
    pub(crate) fn within_transaction(mut self, active: bool) -> Self {
        self.in_transaction = active;
        self
    }

    /// Whether the descriptor was built inside an active transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Replace the projection.
    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Select distinct rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Inner join `collection` by convention:
    /// `<self>.<singular(collection)>_id = <collection>.id`.
    pub fn join(self, collection: impl Into<String>) -> Self {
        self.join_with(JoinMode::Inner, collection, [])
    }

    /// Inner join `collection` on an explicit condition.
    pub fn join_on(self, collection: impl Into<String>, condition: Filter) -> Self {
        self.join_with(JoinMode::Inner, collection, [condition])
    }

    /// Join with an explicit mode. Conditions are AND-ed; with none, the
    /// convention used by [`join`](Self::join) applies.
    pub fn join_with(
        mut self,
        mode: impl Into<JoinMode>,
        collection: impl Into<String>,
        conditions: impl IntoIterator<Item = Filter>,
    ) -> Self {
        let collection = collection.into();
        let mut condition = Filter::and(conditions);
        if condition.is_none() {
            condition = Filter::column_eq(
                format!("{}.{}", self.collection, naming::join_key(&collection)),
                format!("{}.id", collection),
            );
        }

        self.joins.push(Join {
            mode: mode.into(),
            collection,
            condition,
        });
        self
    }

    /// AND `condition` into the WHERE clause.
    pub fn r#where(mut self, condition: Filter) -> Self {
        self.condition = std::mem::take(&mut self.condition).and_then(condition);
        self
    }

    /// OR the conjunction of `conditions` with the whole accumulated WHERE.
    pub fn or_where(mut self, conditions: impl IntoIterator<Item = Filter>) -> Self {
        self.condition = std::mem::take(&mut self.condition).or_else(Filter::and(conditions));
        self
    }

    /// Replace the GROUP BY fields.
    pub fn group(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// AND `condition` into the HAVING clause.
    pub fn having(mut self, condition: Filter) -> Self {
        self.having = std::mem::take(&mut self.having).and_then(condition);
        self
    }

    /// OR the conjunction of `conditions` with the whole accumulated HAVING.
    pub fn or_having(mut self, conditions: impl IntoIterator<Item = Filter>) -> Self {
        self.having = std::mem::take(&mut self.having).or_else(Filter::and(conditions));
        self
    }

    /// Append orderings.
    pub fn order(mut self, order: impl IntoIterator<Item = OrderByField>) -> Self {
        self.order_by.extend(order);
        self
    }

    /// Skip `offset` rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Return at most `limit` rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Lock selected rows with `FOR UPDATE`.
    ///
    /// Ignored unless the descriptor came from a transaction.
    pub fn lock(self) -> Self {
        self.lock_with(DEFAULT_LOCK)
    }

    /// Lock selected rows with a custom clause.
    ///
    /// Ignored unless the descriptor came from a transaction.
    pub fn lock_with(mut self, clause: impl Into<String>) -> Self {
        let clause = clause.into();
        if !self.in_transaction {
            debug!(collection = %self.collection, lock = %clause, "lock ignored outside transaction");
            return self;
        }
        self.lock = Some(clause);
        self
    }

    /// Filter by primary key `id`.
    pub fn find(self, id: impl Into<FilterValue>) -> Self {
        self.find_by("id", id)
    }

    /// Filter by `<collection>.<column> = value`.
    pub fn find_by(self, column: &str, value: impl Into<FilterValue>) -> Self {
        let column = format!("{}.{}", self.collection, column);
        self.r#where(Filter::eq(column, value))
    }

    /// Record a pending field write.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.changes.insert(field.into(), value.into());
        self
    }

    /// Request an aggregate over `field`.
    pub fn aggregate(mut self, mode: AggregateMode, field: impl Into<String>) -> Self {
        self.aggregate = Some(Aggregate {
            mode,
            field: field.into(),
        });
        self
    }
}
