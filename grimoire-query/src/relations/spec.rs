//! Static record descriptions and resolved relations.

/// How a relation's keys line up between owner and related records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Owner holds the key (e.g., Post belongs to User via `user_id`).
    BelongsTo,
    /// Related record holds the key, at most one match.
    HasOne,
    /// Related records hold the key.
    HasMany,
}

impl RelationKind {
    /// Check if this relation loads multiple records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::HasMany)
    }
}

/// Declared overrides for one relation field.
///
/// Reference and foreign key only take effect when both are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationField {
    /// Relation field name.
    pub name: &'static str,
    /// Field on the owner holding the key.
    pub reference: Option<&'static str>,
    /// Field on the related record matched against the reference.
    pub foreign_key: Option<&'static str>,
    /// Column queried for the foreign key.
    pub column: Option<&'static str>,
}

impl RelationField {
    /// Declare a relation field with no overrides.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            reference: None,
            foreign_key: None,
            column: None,
        }
    }

    /// Set the reference field on the owner.
    pub const fn references(self, reference: &'static str) -> Self {
        Self {
            reference: Some(reference),
            ..self
        }
    }

    /// Set the foreign key field on the related record.
    pub const fn foreign_key(self, foreign_key: &'static str) -> Self {
        Self {
            foreign_key: Some(foreign_key),
            ..self
        }
    }

    /// Set the column queried for the foreign key.
    pub const fn column(self, column: &'static str) -> Self {
        Self {
            column: Some(column),
            ..self
        }
    }

    /// Both reference and foreign key, if declared together.
    pub fn explicit_keys(&self) -> Option<(&'static str, &'static str)> {
        self.reference.zip(self.foreign_key)
    }
}

/// Static description of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Model name, e.g. `User`.
    pub model: &'static str,
    /// Table name, e.g. `users`.
    pub table: &'static str,
    /// Field names.
    pub fields: &'static [&'static str],
    /// Relation overrides.
    pub relations: &'static [RelationField],
}

impl Schema {
    /// Describe a model stored in `table`.
    pub const fn new(model: &'static str, table: &'static str) -> Self {
        Self {
            model,
            table,
            fields: &[],
            relations: &[],
        }
    }

    /// Set the field names.
    pub const fn fields(self, fields: &'static [&'static str]) -> Self {
        Self { fields, ..self }
    }

    /// Set the relation overrides.
    pub const fn relations(self, relations: &'static [RelationField]) -> Self {
        Self { relations, ..self }
    }

    /// Check if the model has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains(&name)
    }

    /// Declared overrides for `name`.
    pub fn relation(&self, name: &str) -> Option<&RelationField> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Whether two schemas describe the same record type.
    pub fn same_as(&self, other: &Schema) -> bool {
        std::ptr::eq(self, other) || (self.model == other.model && self.table == other.table)
    }
}

/// Key pair of a relation after inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelation {
    /// Relation kind.
    pub kind: RelationKind,
    /// Field on the owner holding the key.
    pub reference: String,
    /// Field on the related record matched against the reference.
    pub foreign_key: String,
    /// Column queried for the foreign key.
    pub column: String,
    /// Related table.
    pub related_table: &'static str,
}
