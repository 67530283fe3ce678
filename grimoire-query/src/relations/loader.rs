//! Batched association preloading.
//!
//! A preload walks a dot-separated relation path across an in-memory record
//! graph and fills the final relation with a single query, however many
//! owners reach it.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::registry::RelationRegistry;
use super::slot::Slot;
use crate::error::{QueryError, QueryResult, translate_result};
use crate::filter::{Filter, FilterValue};
use crate::query::Query;
use crate::traits::{Entity, Model, QueryEngine};

/// Hashable form of a key value. Null never becomes a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ReferenceKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    Other(String),
}

impl ReferenceKey {
    fn new(value: &FilterValue) -> Option<Self> {
        Some(match value {
            FilterValue::Null => return None,
            FilterValue::Bool(v) => Self::Bool(*v),
            FilterValue::Int(v) => Self::Int(*v),
            FilterValue::Float(v) => Self::Float(v.to_bits()),
            FilterValue::String(v) => Self::Str(v.clone()),
            FilterValue::Json(v) => Self::Other(v.to_string()),
            FilterValue::List(v) => Self::Other(format!("{:?}", v)),
        })
    }
}

struct Target<'r> {
    slot: Slot<'r>,
    filled: bool,
}

/// Loads relations of already-fetched records.
///
/// ```rust,ignore
/// let loader = RelationLoader::new(&engine);
/// loader.preload_all(&mut users, "posts.comments").await?;
/// ```
pub struct RelationLoader<'e, E: QueryEngine> {
    engine: &'e E,
    registry: &'e RelationRegistry,
}

impl<'e, E: QueryEngine> RelationLoader<'e, E> {
    /// Create a loader using the process-wide relation cache.
    pub fn new(engine: &'e E) -> Self {
        Self::with_registry(engine, RelationRegistry::global())
    }

    /// Create a loader using a specific relation cache.
    pub fn with_registry(engine: &'e E, registry: &'e RelationRegistry) -> Self {
        Self { engine, registry }
    }

    /// Get the engine.
    pub fn engine(&self) -> &E {
        self.engine
    }

    /// Preload `path` on one record.
    pub async fn preload<T: Model>(&self, record: &mut T, path: &str) -> QueryResult<()> {
        self.preload_dyn(vec![record as &mut dyn Entity], path).await
    }

    /// Preload `path` on every record of a slice.
    pub async fn preload_all<T: Model>(&self, records: &mut [T], path: &str) -> QueryResult<()> {
        let roots = records
            .iter_mut()
            .map(|r| r as &mut dyn Entity)
            .collect();
        self.preload_dyn(roots, path).await
    }

    /// Preload `path` on a list of records of one type.
    ///
    /// Mixing record types is an [`InvalidTarget`](crate::ErrorCode::InvalidTarget)
    /// error.
    pub async fn preload_dyn<'r>(
        &self,
        roots: Vec<&'r mut dyn Entity>,
        path: &str,
    ) -> QueryResult<()> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            let model = roots.first().map_or("record", |r| r.schema().model);
            return Err(QueryError::invalid_path(model, path));
        }

        if let Some(first) = roots.first() {
            let schema = first.schema();
            if let Some(other) = roots.iter().find(|r| !r.schema().same_as(schema)) {
                return Err(QueryError::invalid_target(format!(
                    "cannot preload a mix of {} and {} records",
                    schema.model,
                    other.schema().model
                )));
            }
        }

        debug!(path, roots = roots.len(), "preload");

        let Some((relation, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut owners = roots;
        for segment in parents {
            owners = descend(owners, segment)?;
        }

        self.load(owners, relation).await
    }

    async fn load<'r>(&self, owners: Vec<&'r mut dyn Entity>, relation: &str) -> QueryResult<()> {
        let mut owners = owners.into_iter();
        let Some(first) = owners.next() else {
            return Ok(());
        };

        let owner_schema = first.schema();
        let (related, many) = match first.relation(relation) {
            Some(slot) => (slot.related(), slot.is_many()),
            None => return Err(QueryError::invalid_path(owner_schema.model, relation)),
        };
        let resolved = self
            .registry
            .resolve(owner_schema, related, relation, many)?;

        let mut targets: Vec<Target<'r>> = Vec::new();
        let mut index: HashMap<ReferenceKey, Vec<usize>> = HashMap::new();
        let mut keys: Vec<FilterValue> = Vec::new();

        for owner in std::iter::once(first).chain(owners) {
            let model = owner.schema().model;
            let reference = owner.field(&resolved.reference).ok_or_else(|| {
                QueryError::schema_mismatch(model, &resolved.reference, "reference field not readable")
            })?;

            let mut slot = owner
                .relation(relation)
                .ok_or_else(|| QueryError::invalid_path(model, relation))?;
            slot.reset();

            let Some(key) = ReferenceKey::new(&reference) else {
                continue;
            };

            let position = targets.len();
            targets.push(Target {
                slot,
                filled: false,
            });

            let entry = index.entry(key).or_default();
            if entry.is_empty() {
                keys.push(reference);
            }
            entry.push(position);
        }

        if keys.is_empty() {
            trace!(relation, "no keys to preload");
            return Ok(());
        }

        trace!(
            relation,
            table = resolved.related_table,
            keys = keys.len(),
            targets = targets.len(),
            "batch fetch"
        );

        let query = Query::new(resolved.related_table)
            .r#where(Filter::In(resolved.column.clone(), keys));
        let rows = translate_result(self.engine.all(query).await, None)?;

        for row in &rows {
            let decoded = targets[0].slot.decode(row, &resolved.foreign_key)?;
            let Some(positions) = ReferenceKey::new(&decoded.key).and_then(|k| index.get(&k)) else {
                continue;
            };

            for &position in positions {
                let target = &mut targets[position];
                if target.slot.is_many() {
                    target.slot.fill(decoded.record.as_ref())?;
                } else if !target.filled {
                    target.slot.fill(decoded.record.as_ref())?;
                    target.filled = true;
                }
            }
        }

        crate::grimoire_debug!(relation, rows = rows.len(), "preloaded");
        Ok(())
    }
}

/// Step from owners to the records held in their `segment` relation.
fn descend<'r>(owners: Vec<&'r mut dyn Entity>, segment: &str) -> QueryResult<Vec<&'r mut dyn Entity>> {
    let mut next = Vec::with_capacity(owners.len());
    for owner in owners {
        let model = owner.schema().model;
        let slot = owner
            .relation(segment)
            .ok_or_else(|| QueryError::invalid_path(model, segment))?;
        next.extend(slot.into_entities());
    }
    Ok(next)
}
