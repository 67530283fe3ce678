//! # grimoire-query
//!
//! Change tracking, query descriptors and association preloading for the
//! Grimoire data layer.
//!
//! This crate provides:
//! - [`Changes`]: an ordered, field-indexed log of partial record mutations
//! - [`Query`]: an immutable, dialect-independent query descriptor
//! - [`RelationLoader`]: batched has-one / has-many / belongs-to preloading
//! - [`translate`](error::translate): mapping of raw engine errors to [`QueryError`]
//! - [`Repo`]: a facade tying the above to a [`QueryEngine`]
//!
//! Rendering SQL and talking to a database is left to [`QueryEngine`]
//! implementations.
//!
//! ## Change logs
//!
//! ```rust
//! use grimoire_query::{Change, Changes};
//!
//! let changes = Changes::build([
//!     Change::set("title", "Draft"),
//!     Change::inc("revision"),
//!     Change::set("title", "Final"),
//! ]);
//!
//! assert_eq!(changes.len(), 2);
//! assert_eq!(changes.index_of("title"), Some(0));
//! ```
//!
//! ## Query descriptors
//!
//! ```rust
//! use grimoire_query::{Filter, OrderByField, Query};
//!
//! let query = Query::new("posts")
//!     .join("comments")
//!     .r#where(Filter::eq("posts.published", true))
//!     .or_where([Filter::eq("posts.pinned", true)])
//!     .order([OrderByField::desc("posts.created_at")])
//!     .limit(20);
//!
//! assert_eq!(query.joins[0].condition, Filter::column_eq("posts.comment_id", "comments.id"));
//! assert_eq!(query.limit, Some(20));
//! ```
//!
//! ## Errors
//!
//! ```rust
//! use grimoire_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::invalid_path("User", "pets");
//! assert_eq!(err.code, ErrorCode::InvalidPath);
//! assert!(err.is_preload_error());
//! ```

pub mod changes;
pub mod constraint;
pub mod error;
pub mod filter;
pub mod logging;
pub mod query;
pub mod relations;
pub mod repo;
pub mod row;
pub mod traits;
pub mod transaction;
pub mod types;

pub use changes::{AssocChanges, Change, ChangeOp, Changer, Changes, Changeset, FieldType};
pub use constraint::{Constraint, ConstraintKind, ConstraintRegistry};
pub use error::{DriverError, ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use filter::{Filter, FilterValue};
pub use query::Query;
pub use relations::{RelationField, RelationKind, RelationLoader, Schema, Slot};
pub use repo::Repo;
pub use row::{FromColumn, FromRow, Row, RowError};
pub use traits::{BoxFuture, EngineResult, Entity, Model, QueryEngine};
pub use transaction::{AccessMode, IsolationLevel, Transaction, TransactionConfig};
pub use types::{Aggregate, AggregateMode, Join, JoinMode, NullsOrder, OrderByField, SortOrder};

// Re-export logging utilities
pub use logging::{init as init_logging, init_debug, init_with_level, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::changes::{Change, Changes, Changeset, FieldType};
    pub use crate::error::{ErrorCode, QueryError, QueryResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::query::Query;
    pub use crate::relations::{RelationField, Schema, Slot};
    pub use crate::repo::Repo;
    pub use crate::row::{FromRow, Row, RowError};
    pub use crate::traits::{BoxFuture, EngineResult, Entity, Model, QueryEngine};
    pub use crate::transaction::{IsolationLevel, TransactionConfig};
    pub use crate::types::{AggregateMode, OrderByField, SortOrder};
}
