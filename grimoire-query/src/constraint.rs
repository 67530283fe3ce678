//! Constraint registry consulted when translating persistence errors.
//!
//! A changeset registers the constraints it knows about; when the database
//! rejects a write, [`translate`](crate::error::translate) asks the registry
//! whether the violation belongs to one of them and, if so, reports it against
//! the registered field.
//!
//! ```rust
//! use grimoire_query::constraint::{Constraint, ConstraintRegistry};
//! use grimoire_query::QueryError;
//!
//! let registry = ConstraintRegistry::new()
//!     .with(Constraint::unique("email").name("users_email_key").exact(true));
//!
//! let raw = QueryError::unique_violation("email", "users_email_key");
//! let err = registry.lookup(&raw).unwrap();
//! assert_eq!(err.context.field.as_deref(), Some("email"));
//! ```

use crate::error::{ErrorCode, QueryError};

/// Kind of database constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// Unique index.
    Unique,
    /// Foreign key reference.
    ForeignKey,
    /// Check expression.
    Check,
    /// Not null column.
    NotNull,
}

impl ConstraintKind {
    /// The error code a violation of this kind is reported with.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unique => ErrorCode::UniqueConstraint,
            Self::ForeignKey => ErrorCode::ForeignKeyConstraint,
            Self::Check => ErrorCode::CheckConstraint,
            Self::NotNull => ErrorCode::NotNullConstraint,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::Unique => "has already been taken",
            Self::ForeignKey => "does not exist",
            Self::Check => "is invalid",
            Self::NotNull => "can't be blank",
        }
    }
}

/// A constraint registered against a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Field the violation is reported against.
    pub field: String,
    /// Constraint name as reported by the database.
    pub name: String,
    /// Require an exact name match instead of a substring match.
    pub exact: bool,
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Custom message for the translated error.
    pub message: Option<String>,
}

impl Constraint {
    /// Create a constraint; the name defaults to the field name.
    pub fn new(kind: ConstraintKind, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            name: field.clone(),
            field,
            exact: false,
            kind,
            message: None,
        }
    }

    /// Unique constraint on a field.
    pub fn unique(field: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Unique, field)
    }

    /// Foreign key constraint on a field.
    pub fn foreign_key(field: impl Into<String>) -> Self {
        Self::new(ConstraintKind::ForeignKey, field)
    }

    /// Check constraint on a field.
    pub fn check(field: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Check, field)
    }

    /// Not null constraint on a field.
    pub fn not_null(field: impl Into<String>) -> Self {
        Self::new(ConstraintKind::NotNull, field)
    }

    /// Set the database constraint name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Require an exact name match.
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Set the message used for the translated error.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Check whether a raw error is a violation of this constraint.
    pub fn matches(&self, err: &QueryError) -> bool {
        if err.code != self.kind.code() {
            return false;
        }

        match err.context.constraint.as_deref() {
            Some(reported) if self.exact => reported == self.name,
            Some(reported) => reported.contains(self.name.as_str()),
            None => false,
        }
    }

    /// Build the field-level error for a violation of this constraint.
    pub fn to_error(&self) -> QueryError {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.field, self.kind.default_message()));

        QueryError::new(self.kind.code(), message)
            .with_field(&self.field)
            .with_constraint(&self.name)
    }
}

/// Ordered set of constraints; the first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintRegistry {
    constraints: Vec<Constraint>,
}

impl ConstraintRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraint.
    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Register a constraint, builder style.
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.add(constraint);
        self
    }

    /// Find the registered constraint violated by `err` and build its error.
    pub fn lookup(&self, err: &QueryError) -> Option<QueryError> {
        self.constraints
            .iter()
            .find(|c| c.matches(err))
            .map(Constraint::to_error)
    }

    /// Number of registered constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether no constraints are registered.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterate over registered constraints in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }
}
