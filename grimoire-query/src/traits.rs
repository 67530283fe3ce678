//! Core traits: the execution engine seam and record introspection.

use std::future::Future;
use std::pin::Pin;

use crate::changes::Changes;
use crate::error::DriverError;
use crate::filter::FilterValue;
use crate::query::Query;
use crate::relations::{Schema, Slot};
use crate::row::{FromRow, Row};
use crate::transaction::TransactionConfig;

/// A boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a raw engine call, before translation.
pub type EngineResult<T> = Result<T, DriverError>;

/// Executes query descriptors against a database.
///
/// Implemented by driver crates. Implementations render the descriptor for
/// their dialect; failures are returned untranslated and pass through
/// [`translate`](crate::error::translate) before reaching callers. A driver
/// that reports constraint violations as [`QueryError`](crate::QueryError)
/// values with the constraint name set lets change-log registries rewrite them.
pub trait QueryEngine: Send + Sync {
    /// Fetch every row matching the query.
    fn all(&self, query: Query) -> BoxFuture<'_, EngineResult<Vec<Row>>>;

    /// Run the query's aggregate and return the scalar.
    fn aggregate(&self, query: Query) -> BoxFuture<'_, EngineResult<FilterValue>>;

    /// Insert one record into the query's collection, returning its primary key.
    fn insert<'a>(
        &'a self,
        query: Query,
        changes: &'a Changes,
    ) -> BoxFuture<'a, EngineResult<FilterValue>>;

    /// Insert several records sharing the column list `fields`.
    ///
    /// A log without a change for some column leaves it to the database
    /// default. The default implementation inserts one record at a time.
    fn insert_all<'a>(
        &'a self,
        query: Query,
        fields: &'a [String],
        changes: &'a [Changes],
    ) -> BoxFuture<'a, EngineResult<Vec<FilterValue>>> {
        let _ = fields;
        Box::pin(async move {
            let mut ids = Vec::with_capacity(changes.len());
            for record in changes {
                ids.push(self.insert(query.clone(), record).await?);
            }
            Ok(ids)
        })
    }

    /// Apply `changes` to every row matching the query.
    fn update<'a>(
        &'a self,
        query: Query,
        changes: &'a Changes,
    ) -> BoxFuture<'a, EngineResult<u64>>;

    /// Delete every row matching the query.
    fn delete(&self, query: Query) -> BoxFuture<'_, EngineResult<u64>>;

    /// Open a transaction.
    fn begin<'a>(&'a self, config: &'a TransactionConfig) -> BoxFuture<'a, EngineResult<()>>;

    /// Commit the open transaction.
    fn commit(&self) -> BoxFuture<'_, EngineResult<()>>;

    /// Roll back the open transaction.
    fn rollback(&self) -> BoxFuture<'_, EngineResult<()>>;
}

/// Object-safe view of a record used while walking relation graphs.
pub trait Entity: Send + Sync {
    /// Static description of the record type.
    fn schema(&self) -> &'static Schema;

    /// Read a field by name.
    ///
    /// `None` means the record has no such field; a present but empty field
    /// is `Some(FilterValue::Null)`.
    fn field(&self, name: &str) -> Option<FilterValue>;

    /// Borrow the relation field `name`, or `None` if it is not a relation.
    fn relation(&mut self, name: &str) -> Option<Slot<'_>>;
}

/// A record type that can be queried and preloaded.
///
/// ```rust
/// use grimoire_query::prelude::*;
///
/// #[derive(Debug, Clone)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> Result<Self, RowError> {
///         Ok(Self { id: row.get("id")?, name: row.get("name")? })
///     }
/// }
///
/// impl Entity for User {
///     fn schema(&self) -> &'static Schema {
///         Self::SCHEMA
///     }
///
///     fn field(&self, name: &str) -> Option<FilterValue> {
///         match name {
///             "id" => Some(self.id.into()),
///             "name" => Some(self.name.as_str().into()),
///             _ => None,
///         }
///     }
///
///     fn relation(&mut self, _name: &str) -> Option<Slot<'_>> {
///         None
///     }
/// }
///
/// impl Model for User {
///     const SCHEMA: &'static Schema = &Schema::new("User", "users").fields(&["id", "name"]);
/// }
///
/// assert_eq!(User::SCHEMA.table, "users");
/// ```
pub trait Model: Entity + FromRow + Clone + 'static {
    /// Static description of the record type.
    const SCHEMA: &'static Schema;
}
