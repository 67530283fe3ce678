//! Repository facade binding descriptors to an engine.
//!
//! Every engine failure surfaces as a translated [`QueryError`]; writes pass
//! their change log along so registered constraints can claim violations.
//!
//! ```rust,ignore
//! let repo = Repo::new(engine);
//!
//! let user: User = repo.one(repo.from("users").find(1)).await?;
//! repo.preload_all(&mut posts, "author").await?;
//!
//! repo.transaction(TransactionConfig::new(), |tx| async move {
//!     let query = tx.from("accounts").find(1).lock();
//!     let account: Account = tx.one(query.clone()).await?;
//!     tx.update(query, &Changes::build([Change::dec_by("balance", 10)])).await?;
//!     Ok(account)
//! })
//! .await?;
//! ```

use std::future::Future;

use chrono::{SubsecRound, Utc};
use tracing::{debug, warn};

use crate::changes::Changes;
use crate::error::{QueryError, QueryResult, translate_result};
use crate::filter::FilterValue;
use crate::query::Query;
use crate::relations::RelationLoader;
use crate::row::FromRow;
use crate::traits::{Entity, Model, QueryEngine};
use crate::transaction::{Transaction, TransactionConfig};
use crate::types::AggregateMode;

const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

/// Merge a write: changeset values, then declared timestamps, then the query's
/// pending writes.
fn prepare(query: &Query, changes: &Changes, stamps: &[&str]) -> Changes {
    let mut merged = changes.clone();
    let now = Utc::now().round_subsecs(0);
    for field in stamps {
        if changes.declares_timestamp(field) {
            merged.set_value(*field, now);
        }
    }
    for (field, value) in &query.changes {
        merged.set_value(field.clone(), value.clone());
    }
    merged
}

/// Runs query descriptors against an engine.
#[derive(Debug, Clone)]
pub struct Repo<E: QueryEngine> {
    engine: E,
    in_transaction: bool,
}

impl<E: QueryEngine + Clone> Repo<E> {
    /// Create a repo over `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            in_transaction: false,
        }
    }

    /// Get the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Whether this repo runs inside a transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Start a descriptor for `collection`.
    ///
    /// Descriptors from a transaction's repo honor [`Query::lock`].
    pub fn from(&self, collection: impl Into<String>) -> Query {
        Query::new(collection).within_transaction(self.in_transaction)
    }

    /// Fetch and decode every matching row.
    pub async fn all<T: FromRow>(&self, query: Query) -> QueryResult<Vec<T>> {
        let rows = translate_result(self.engine.all(query).await, None)?;
        let records = rows.iter().map(T::from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Fetch the first matching record.
    pub async fn one<T: FromRow>(&self, query: Query) -> QueryResult<T> {
        let collection = query.collection.clone();
        let rows = translate_result(self.engine.all(query.limit(1)).await, None)?;
        match rows.first() {
            Some(row) => Ok(T::from_row(row)?),
            None => Err(QueryError::not_found(collection)),
        }
    }

    /// Run an aggregate over `field`.
    pub async fn aggregate(
        &self,
        query: Query,
        mode: AggregateMode,
        field: impl Into<String>,
    ) -> QueryResult<FilterValue> {
        translate_result(
            self.engine.aggregate(query.aggregate(mode, field)).await,
            None,
        )
    }

    /// Count matching rows.
    pub async fn count(&self, query: Query) -> QueryResult<u64> {
        let value = self.aggregate(query, AggregateMode::Count, "*").await?;
        value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| QueryError::deserialization(format!("count returned {:?}", value)))
    }

    /// Insert a record, returning its primary key.
    ///
    /// Declared `created_at` / `updated_at` timestamps are stamped and the
    /// query's own pending writes win. A query with pending writes inserts
    /// them alone when `changes` is empty; with nothing to write at all, the
    /// engine is not called and the key is null.
    pub async fn insert(&self, query: Query, changes: &Changes) -> QueryResult<FilterValue> {
        let merged = prepare(&query, changes, &[CREATED_AT, UPDATED_AT]);
        if merged.is_empty() {
            debug!(collection = %query.collection, "nothing to insert");
            return Ok(FilterValue::Null);
        }
        translate_result(self.engine.insert(query, &merged).await, Some(&merged))
    }

    /// Insert several records at once, returning their primary keys.
    ///
    /// Each log is prepared as for [`insert`](Self::insert); the column list
    /// is the union of their fields in first-seen order.
    pub async fn insert_all(&self, query: Query, changes: &[Changes]) -> QueryResult<Vec<FilterValue>> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<Changes> = changes
            .iter()
            .map(|c| prepare(&query, c, &[CREATED_AT, UPDATED_AT]))
            .collect();

        let mut fields: Vec<String> = Vec::new();
        for field in records.iter().flat_map(Changes::fields) {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }

        let constraints = records.iter().find(|c| c.constraints().is_some());
        translate_result(
            self.engine.insert_all(query, &fields, &records).await,
            constraints,
        )
    }

    /// Update matching rows with `changes`.
    ///
    /// A declared `updated_at` timestamp is stamped and the query's own
    /// pending writes win. With nothing to write, the engine is not called.
    pub async fn update(&self, query: Query, changes: &Changes) -> QueryResult<u64> {
        let merged = prepare(&query, changes, &[UPDATED_AT]);
        if merged.is_empty() {
            debug!(collection = %query.collection, "nothing to update");
            return Ok(0);
        }
        translate_result(self.engine.update(query, &merged).await, Some(&merged))
    }

    /// Delete matching rows.
    pub async fn delete(&self, query: Query) -> QueryResult<u64> {
        translate_result(self.engine.delete(query).await, None)
    }

    /// Preload `path` on one record.
    pub async fn preload<T: Model>(&self, record: &mut T, path: &str) -> QueryResult<()> {
        RelationLoader::new(&self.engine).preload(record, path).await
    }

    /// Preload `path` on every record of a slice.
    pub async fn preload_all<T: Model>(&self, records: &mut [T], path: &str) -> QueryResult<()> {
        RelationLoader::new(&self.engine)
            .preload_all(records, path)
            .await
    }

    /// Preload `path` on a list of records of one type.
    pub async fn preload_dyn(&self, records: Vec<&mut dyn Entity>, path: &str) -> QueryResult<()> {
        RelationLoader::new(&self.engine)
            .preload_dyn(records, path)
            .await
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok` and rolls back otherwise. Inside an
    /// existing transaction, `f` joins it.
    pub async fn transaction<F, Fut, T>(&self, config: TransactionConfig, f: F) -> QueryResult<T>
    where
        F: FnOnce(Repo<E>) -> Fut,
        Fut: Future<Output = QueryResult<T>>,
    {
        if self.in_transaction {
            debug!("joining open transaction");
            return f(self.clone()).await;
        }

        let tx = Transaction::begin(&self.engine, config).await?;
        let repo = Repo {
            engine: self.engine.clone(),
            in_transaction: true,
        };

        match f(repo).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
