//! Tracked changes for partial record mutations.
//!
//! A [`Changes`] log records which fields to write and how, without requiring
//! the whole record. Entries are unique per field and keep the position of
//! their first insertion, so the column order of generated statements is
//! stable no matter how often a field is overwritten.
//!
//! ```rust
//! use grimoire_query::changes::{Change, ChangeOp, Changes};
//!
//! let changes = Changes::build([
//!     Change::set("name", "Ann"),
//!     Change::inc("age"),
//!     Change::set("name", "Bob"),
//! ]);
//!
//! let ops: Vec<_> = changes.iter().map(|c| (c.field.as_str(), c.op)).collect();
//! assert_eq!(ops, [("name", ChangeOp::Set), ("age", ChangeOp::Inc)]);
//! assert_eq!(changes.get_value("name"), Some(&"Bob".into()));
//! ```
//!
//! Changes are forward only: there is no delete operation. Detaching
//! associated records is expressed through
//! [`Changes::set_stale_assoc`]. A log is meant for a single write; increments
//! and association replacement make it unsuitable for reuse.

use indexmap::IndexMap;

use crate::constraint::ConstraintRegistry;
use crate::filter::FilterValue;

/// How a change combines with the persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOp {
    /// Overwrite the column.
    Set,
    /// Add the value to the column.
    Inc,
    /// Subtract the value from the column.
    Dec,
    /// Raw expression; `field` holds the expression, `value` its arguments.
    Fragment,
}

/// One atomic field mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Operation kind.
    pub op: ChangeOp,
    /// Target field, or the raw expression for fragments.
    pub field: String,
    /// Operand.
    pub value: FilterValue,
}

impl Change {
    /// Set `field` to `value`.
    pub fn set(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            op: ChangeOp::Set,
            field: field.into(),
            value: value.into(),
        }
    }

    /// Increment `field` by one.
    pub fn inc(field: impl Into<String>) -> Self {
        Self::inc_by(field, 1)
    }

    /// Increment `field` by `n`.
    pub fn inc_by(field: impl Into<String>, n: i64) -> Self {
        Self {
            op: ChangeOp::Inc,
            field: field.into(),
            value: FilterValue::Int(n),
        }
    }

    /// Decrement `field` by one.
    pub fn dec(field: impl Into<String>) -> Self {
        Self::dec_by(field, 1)
    }

    /// Decrement `field` by `n`.
    pub fn dec_by(field: impl Into<String>, n: i64) -> Self {
        Self {
            op: ChangeOp::Dec,
            field: field.into(),
            value: FilterValue::Int(n),
        }
    }

    /// Raw expression with positional arguments.
    pub fn fragment(
        raw: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<FilterValue>>,
    ) -> Self {
        Self {
            op: ChangeOp::Fragment,
            field: raw.into(),
            value: FilterValue::List(args.into_iter().map(Into::into).collect()),
        }
    }
}

/// Anything that can contribute to a change log.
pub trait Changer {
    /// Apply this contribution to `changes`.
    fn build(&self, changes: &mut Changes);
}

impl Changer for Change {
    fn build(&self, changes: &mut Changes) {
        changes.set(self.clone());
    }
}

impl<F> Changer for F
where
    F: Fn(&mut Changes),
{
    fn build(&self, changes: &mut Changes) {
        self(changes)
    }
}

/// Declared type of a changeset field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Boolean column.
    Bool,
    /// Integer column.
    Int,
    /// Floating point column.
    Float,
    /// Text column.
    Text,
    /// JSON column.
    Json,
    /// Date-time column; `created_at` / `updated_at` of this type are stamped on write.
    Timestamp,
    /// Nested record or record list, written through association changes.
    Association,
}

impl FieldType {
    /// Whether values of this type map to a plain column.
    pub fn is_scannable(self) -> bool {
        !matches!(self, Self::Association)
    }
}

/// Validated input handed over by the changeset collaborator.
///
/// Only non-null values of fields reported as scannable become column
/// changes.
pub trait Changeset {
    /// Validated values keyed by field, in declaration order.
    fn values(&self) -> &IndexMap<String, FilterValue>;

    /// Declared type of every field of the record, in declaration order.
    fn types(&self) -> &IndexMap<String, FieldType>;

    /// Whether `field` maps to a plain column.
    fn is_scannable(&self, field: &str) -> bool {
        self.types()
            .get(field)
            .is_some_and(|field_type| field_type.is_scannable())
    }

    /// Constraints registered while validating.
    fn constraints(&self) -> Option<&ConstraintRegistry> {
        None
    }
}

/// Changes for one association of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssocChanges {
    /// One change log per associated record to upsert.
    pub changes: Vec<Changes>,
    /// Identifiers to detach. `None` clears every associated record.
    pub stale_ids: Option<Vec<FilterValue>>,
}

/// Ordered, field-indexed change log for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    fields: IndexMap<String, Change>,
    assoc: IndexMap<String, AssocChanges>,
    constraints: Option<ConstraintRegistry>,
    timestamps: Vec<String>,
}

impl Changes {
    /// Create an empty change log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold changers into a fresh log, in order.
    pub fn build<C: Changer>(changers: impl IntoIterator<Item = C>) -> Self {
        let mut changes = Self::new();
        for changer in changers {
            changer.build(&mut changes);
        }
        changes
    }

    /// Apply one more changer, builder style.
    pub fn apply(mut self, changer: impl Changer) -> Self {
        changer.build(&mut self);
        self
    }

    /// Build a log from a validated changeset.
    pub fn from_changeset(changeset: &impl Changeset) -> Self {
        let mut changes = Self::new();
        for (field, value) in changeset.values() {
            if !value.is_null() && changeset.is_scannable(field) {
                changes.set_value(field.clone(), value.clone());
            }
        }
        changes.constraints = changeset.constraints().cloned();
        changes.timestamps = changeset
            .types()
            .iter()
            .filter(|(_, field_type)| **field_type == FieldType::Timestamp)
            .map(|(field, _)| field.clone())
            .collect();
        changes
    }

    /// Whether no field changes are recorded. Association changes don't count.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of field changes.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate field changes in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.fields.values()
    }

    /// Iterate changed field names in first-insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Get the change recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&Change> {
        self.fields.get(field)
    }

    /// Record a change, replacing any change on the same field in place.
    pub fn set(&mut self, change: Change) {
        self.fields.insert(change.field.clone(), change);
    }

    /// Position of `field` in the ordered sequence.
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.get_index_of(field)
    }

    /// Change at position `index`.
    pub fn get_index(&self, index: usize) -> Option<&Change> {
        self.fields.get_index(index).map(|(_, change)| change)
    }

    /// Value of the change recorded for `field`.
    pub fn get_value(&self, field: &str) -> Option<&FilterValue> {
        self.get(field).map(|change| &change.value)
    }

    /// Record a [`ChangeOp::Set`] change.
    pub fn set_value(&mut self, field: impl Into<String>, value: impl Into<FilterValue>) {
        self.set(Change::set(field, value));
    }

    /// Changes recorded for the association `field`.
    pub fn get_assoc(&self, field: &str) -> Option<&AssocChanges> {
        self.assoc.get(field)
    }

    /// Replace the child change logs of the association `field`.
    ///
    /// A newly recorded association starts with `stale_ids == None`.
    pub fn set_assoc(&mut self, field: impl Into<String>, changes: Vec<Changes>) {
        self.assoc.entry(field.into()).or_default().changes = changes;
    }

    /// Record identifiers to detach from the association `field`.
    pub fn set_stale_assoc(&mut self, field: impl Into<String>, ids: Option<Vec<FilterValue>>) {
        self.assoc.entry(field.into()).or_default().stale_ids = ids;
    }

    /// Iterate association changes in first-insertion order.
    pub fn assoc(&self) -> impl Iterator<Item = (&str, &AssocChanges)> {
        self.assoc.iter().map(|(field, ac)| (field.as_str(), ac))
    }

    /// Position of the association `field`.
    pub fn assoc_index_of(&self, field: &str) -> Option<usize> {
        self.assoc.get_index_of(field)
    }

    /// Constraint registry used when translating write errors.
    pub fn constraints(&self) -> Option<&ConstraintRegistry> {
        self.constraints.as_ref()
    }

    /// Attach a constraint registry.
    pub fn with_constraints(mut self, constraints: ConstraintRegistry) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Whether the record declares `field` as a timestamp.
    pub fn declares_timestamp(&self, field: &str) -> bool {
        self.timestamps.iter().any(|f| f == field)
    }

    /// Declare `field` as a timestamp, builder style.
    pub fn with_timestamp(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.declares_timestamp(&field) {
            self.timestamps.push(field);
        }
        self
    }
}

impl<'a> IntoIterator for &'a Changes {
    type Item = &'a Change;
    type IntoIter = indexmap::map::Values<'a, String, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.values()
    }
}
