//! Relation inference and the process-wide resolution cache.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::trace;

use super::naming;
use super::spec::{RelationKind, ResolvedRelation, Schema};
use crate::error::{QueryError, QueryResult};

/// Infer the keys of relation `name` from `owner` to `related`.
///
/// Declared reference and foreign key win when both are present. Otherwise an
/// owner field `<name>_id` makes it belongs-to (`<name>_id` -> `id`); without
/// one it is has-one/has-many (`id` -> `<owner>_id`).
pub fn resolve(
    owner: &Schema,
    related: &Schema,
    name: &str,
    many: bool,
) -> QueryResult<ResolvedRelation> {
    let declared = owner.relation(name);
    let nested_kind = if many {
        RelationKind::HasMany
    } else {
        RelationKind::HasOne
    };

    let (kind, reference, foreign_key) = match declared.and_then(|r| r.explicit_keys()) {
        Some((reference, foreign_key)) => {
            let kind = if !many && reference != "id" {
                RelationKind::BelongsTo
            } else {
                nested_kind
            };
            (kind, reference.to_string(), foreign_key.to_string())
        }
        None => {
            let belongs_to = naming::belongs_to_reference(name);
            if owner.has_field(&belongs_to) {
                (RelationKind::BelongsTo, belongs_to, "id".to_string())
            } else {
                (
                    nested_kind,
                    "id".to_string(),
                    naming::has_foreign_key(owner.model),
                )
            }
        }
    };

    if !owner.has_field(&reference) {
        return Err(QueryError::schema_mismatch(
            owner.model,
            &reference,
            format!("reference field for relation '{}' not found", name),
        )
        .with_code_suggestion("Declare the keys on the relation", declaration(name)));
    }
    if !related.has_field(&foreign_key) {
        return Err(QueryError::schema_mismatch(
            related.model,
            &foreign_key,
            format!("foreign key for relation {}.{} not found", owner.model, name),
        )
        .with_code_suggestion("Declare the keys on the relation", declaration(name)));
    }

    let column = declared
        .and_then(|r| r.column)
        .map(str::to_string)
        .unwrap_or_else(|| naming::snake(&foreign_key));

    Ok(ResolvedRelation {
        kind,
        reference,
        foreign_key,
        column,
        related_table: related.table,
    })
}

fn declaration(name: &str) -> String {
    format!(
        "RelationField::new(\"{}\").references(\"<owner field>\").foreign_key(\"<related field>\")",
        name
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RelationKey {
    model: &'static str,
    table: &'static str,
    relation: String,
    related_model: &'static str,
    related_table: &'static str,
}

/// Cache of resolved relations keyed by owner, relation name and related type.
///
/// Failed resolutions are not cached.
#[derive(Debug, Default)]
pub struct RelationRegistry {
    relations: RwLock<HashMap<RelationKey, Arc<ResolvedRelation>>>,
}

impl RelationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every preload in the process.
    pub fn global() -> &'static RelationRegistry {
        static GLOBAL: OnceLock<RelationRegistry> = OnceLock::new();
        GLOBAL.get_or_init(RelationRegistry::new)
    }

    /// Resolve relation `name`, computing it on first use.
    pub fn resolve(
        &self,
        owner: &'static Schema,
        related: &'static Schema,
        name: &str,
        many: bool,
    ) -> QueryResult<Arc<ResolvedRelation>> {
        let key = RelationKey {
            model: owner.model,
            table: owner.table,
            relation: name.to_string(),
            related_model: related.model,
            related_table: related.table,
        };

        if let Some(resolved) = self.relations.read().get(&key) {
            return Ok(Arc::clone(resolved));
        }

        let resolved = Arc::new(resolve(owner, related, name, many)?);
        trace!(
            model = owner.model,
            relation = name,
            reference = %resolved.reference,
            foreign_key = %resolved.foreign_key,
            "relation resolved"
        );

        let mut relations = self.relations.write();
        Ok(Arc::clone(relations.entry(key).or_insert(resolved)))
    }

    /// Number of cached relations.
    pub fn len(&self) -> usize {
        self.relations.read().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.relations.read().is_empty()
    }

    /// Drop every cached resolution.
    pub fn clear(&self) {
        self.relations.write().clear();
    }
}
