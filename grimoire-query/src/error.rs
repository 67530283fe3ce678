//! Error types for query operations and the persistence error translator.
//!
//! Every failure reaching a caller is a [`QueryError`] carrying an
//! [`ErrorCode`], a message and optional context. Raw errors coming back from a
//! [`QueryEngine`](crate::traits::QueryEngine) are funneled through
//! [`translate`] first.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: P{category}{number}
//! - 1xxx: Query and preload errors (not found, invalid path, schema mismatch)
//! - 2xxx: Constraint violations (unique, foreign key, etc.)
//! - 4xxx: Transaction errors
//! - 6xxx: Data errors (decoding)
//! - 9xxx: Internal and unexpected errors
//!
//! ```rust
//! use grimoire_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found("User");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.to_string().contains("P1001"));
//! ```
//!
//! # Translating driver errors
//!
//! ```rust
//! use grimoire_query::error::{translate, DriverError};
//! use grimoire_query::{ErrorCode, QueryError};
//!
//! let raw: DriverError = "socket closed".into();
//! let err = translate(raw, None);
//! assert_eq!(err.code, ErrorCode::Unexpected);
//!
//! let known: DriverError = Box::new(QueryError::not_found("User"));
//! assert_eq!(translate(known, None).code, ErrorCode::RecordNotFound);
//! ```

use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::changes::Changes;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Untyped error produced by an execution engine before translation.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query errors (1xxx)
    /// Record not found (P1001).
    RecordNotFound = 1001,
    /// Preload root is not a homogeneous record or record sequence (P1006).
    InvalidTarget = 1006,
    /// Preload path segment does not resolve to a relation (P1007).
    InvalidPath = 1007,
    /// Reference or foreign key could not be resolved (P1008).
    SchemaMismatch = 1008,

    // Constraint errors (2xxx)
    /// Unique constraint violation (P2001).
    UniqueConstraint = 2001,
    /// Foreign key constraint violation (P2002).
    ForeignKeyConstraint = 2002,
    /// Check constraint violation (P2003).
    CheckConstraint = 2003,
    /// Not null constraint violation (P2004).
    NotNullConstraint = 2004,

    // Transaction errors (4xxx)
    /// Transaction failed (P4001).
    TransactionFailed = 4001,

    // Data errors (6xxx)
    /// Deserialization error (P6003).
    DeserializationError = 6003,

    // Internal errors (9xxx)
    /// Internal error (P9001).
    Internal = 9001,
    /// Unrecognized error from the persistence layer (P9002).
    Unexpected = 9002,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P1001").
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::InvalidTarget => "Invalid preload target",
            Self::InvalidPath => "Invalid preload path",
            Self::SchemaMismatch => "Relation schema mismatch",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ForeignKeyConstraint => "Foreign key constraint violation",
            Self::CheckConstraint => "Check constraint violation",
            Self::NotNullConstraint => "Not null constraint violation",
            Self::TransactionFailed => "Transaction failed",
            Self::DeserializationError => "Deserialization error",
            Self::Internal => "Internal error",
            Self::Unexpected => "Unexpected error",
        }
    }

    /// Check if this code is one of the constraint violation codes.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            Self::UniqueConstraint
                | Self::ForeignKeyConstraint
                | Self::CheckConstraint
                | Self::NotNullConstraint
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// The constraint name reported by the database, if any.
    pub constraint: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<DriverError>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the constraint name reported by the database.
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.context.constraint = Some(constraint.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", model),
        )
        .with_model(&model)
        .with_suggestion("Use Repo::all() to get an empty list instead of an error")
    }

    /// Create an invalid preload target error.
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTarget, message)
            .with_context("preload")
            .with_help("Preload accepts a record or a sequence of records of one type")
    }

    /// Create an invalid preload path error.
    pub fn invalid_path(model: impl Into<String>, segment: impl Into<String>) -> Self {
        let model = model.into();
        let segment = segment.into();
        Self::new(
            ErrorCode::InvalidPath,
            format!("{} has no relation named '{}'", model, segment),
        )
        .with_context("preload")
        .with_model(&model)
        .with_field(&segment)
        .with_suggestion(format!(
            "Return a Slot for '{}' from {}::relation()",
            segment, model
        ))
    }

    /// Create a relation schema mismatch error.
    pub fn schema_mismatch(
        model: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::SchemaMismatch,
            format!("{}.{}: {}", model, field, message.into()),
        )
        .with_context("preload")
        .with_model(&model)
        .with_field(&field)
        .with_help("Declare the reference and foreign key explicitly with RelationField")
    }

    /// Create a unique constraint violation error.
    pub fn unique_violation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Unique constraint violated on {}", field),
        )
        .with_field(&field)
        .with_constraint(constraint)
    }

    /// Create a foreign key violation error.
    pub fn foreign_key_violation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::ForeignKeyConstraint,
            format!("Foreign key constraint violated on {}", field),
        )
        .with_field(&field)
        .with_constraint(constraint)
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::TransactionFailed, format!("Transaction error: {}", message))
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
        .with_suggestion("Check that the model matches the database schema")
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    /// Wrap an unrecognized persistence error.
    pub fn unexpected(source: DriverError) -> Self {
        Self {
            code: ErrorCode::Unexpected,
            message: format!("Unexpected error: {}", source),
            context: ErrorContext::default(),
            source: Some(source),
        }
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        self.code.is_constraint()
    }

    /// Check if this error came from a preload shape problem.
    pub fn is_preload_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidTarget | ErrorCode::InvalidPath | ErrorCode::SchemaMismatch
        )
    }

    /// Check if this wraps an unrecognized error.
    pub fn is_unexpected(&self) -> bool {
        self.code == ErrorCode::Unexpected
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }
        if let Some(ref constraint) = self.context.constraint {
            output.push_str(&format!("  → Constraint: {}\n", constraint));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Translate a raw engine error into a domain error.
///
/// A [`QueryError`] is kept as-is unless `changes` carries a constraint
/// registry with a matching entry, in which case the registry's field-level
/// error wins. Anything else becomes [`ErrorCode::Unexpected`].
pub fn translate(err: DriverError, changes: Option<&Changes>) -> QueryError {
    match err.downcast::<QueryError>() {
        Ok(err) => {
            let err = *err;
            let rewritten = changes
                .and_then(Changes::constraints)
                .and_then(|registry| registry.lookup(&err));

            match rewritten {
                Some(mapped) => mapped.with_source(err),
                None => err,
            }
        }
        Err(err) => {
            warn!(error = %err, "unrecognized persistence error");
            QueryError::unexpected(err)
        }
    }
}

/// Translate the error side of an engine result, passing `Ok` through.
pub fn translate_result<T>(
    result: Result<T, DriverError>,
    changes: Option<&Changes>,
) -> QueryResult<T> {
    result.map_err(|err| translate(err, changes))
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Constraint, ConstraintRegistry};

    #[derive(Debug)]
    struct SocketError;

    impl fmt::Display for SocketError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "socket closed")
        }
    }

    impl std::error::Error for SocketError {}

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "P1001");
        assert_eq!(ErrorCode::InvalidPath.code(), "P1007");
        assert_eq!(ErrorCode::UniqueConstraint.code(), "P2001");
        assert_eq!(ErrorCode::Unexpected.code(), "P9002");
    }

    #[test]
    fn test_preload_errors() {
        assert!(QueryError::invalid_target("not a record").is_preload_error());

        let err = QueryError::invalid_path("User", "pets");
        assert_eq!(err.code, ErrorCode::InvalidPath);
        assert_eq!(err.context.field.as_deref(), Some("pets"));

        let err = QueryError::schema_mismatch("Post", "author_id", "missing reference field");
        assert!(err.is_preload_error());
        assert!(err.message.contains("Post.author_id"));
    }

    #[test]
    fn test_translate_passes_known_errors() {
        let raw: DriverError = Box::new(QueryError::not_found("User"));
        let err = translate(raw, None);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_translate_wraps_unknown_errors() {
        let err = translate(Box::new(SocketError), None);
        assert!(err.is_unexpected());
        assert!(err.message.contains("socket closed"));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_translate_result_passes_ok() {
        let result: Result<u64, DriverError> = Ok(3);
        assert_eq!(translate_result(result, None).unwrap(), 3);
    }

    #[test]
    fn test_translate_uses_constraint_registry() {
        let registry = ConstraintRegistry::new()
            .with(Constraint::unique("email").message("email already registered"));
        let changes = Changes::new().with_constraints(registry);

        let raw: DriverError = Box::new(QueryError::unique_violation(
            "email",
            "users_email_key",
        ));
        let err = translate(raw, Some(&changes));

        assert_eq!(err.code, ErrorCode::UniqueConstraint);
        assert_eq!(err.message, "email already registered");
        assert_eq!(err.context.field.as_deref(), Some("email"));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_translate_without_matching_constraint() {
        let registry = ConstraintRegistry::new().with(Constraint::unique("slug"));
        let changes = Changes::new().with_constraints(registry);

        let raw: DriverError = Box::new(QueryError::unique_violation("email", "users_email_key"));
        let err = translate(raw, Some(&changes));

        assert_eq!(err.message, "Unique constraint violated on email");
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::unique_violation("email", "users_email_key")
            .with_context("Inserting user");

        let output = err.display_full();
        assert!(output.contains("P2001"));
        assert!(output.contains("users_email_key"));
        assert!(output.contains("Inserting user"));
    }

    #[test]
    fn test_error_macro() {
        let err = query_error!(
            ErrorCode::SchemaMismatch,
            "Reference field not readable",
            with_field = "author_id",
            with_suggestion = "Expose the field through Entity::field"
        );

        assert_eq!(err.code, ErrorCode::SchemaMismatch);
        assert_eq!(err.context.field, Some("id".to_string()));
    }
}
