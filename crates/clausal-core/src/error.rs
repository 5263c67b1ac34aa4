//! Error handling for the Clausal fact base and query engine
//!
//! Every failure is reported synchronously to the caller as a [`QueryError`];
//! no operation retries internally and no error leaves a container half-updated.

use clausal_types::SchemaError;
use std::fmt;
use thiserror::Error;

/// Error type for fact base and query operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A clause argument is malformed or references undeclared roots
    #[error("Invalid expression: {message}")]
    InvalidExpression { message: String, clause: Option<&'static str> },

    /// A single-use clause was specified twice
    #[error("Cannot specify '{clause}' multiple times")]
    MultipleClause { clause: &'static str },

    /// Execution reached a placeholder that has no value and no default
    #[error("Unbound placeholder '{placeholder}'")]
    UnboundPlaceholder { placeholder: String },

    /// `singleton` found more than one result
    #[error("Ambiguous result: more than one match found where exactly one was expected")]
    AmbiguousResult,

    /// `singleton` found no result
    #[error("Empty result: no match found where exactly one was expected")]
    EmptyResult,

    /// Strict removal of a record that is not present
    #[error("Not found: {record} ({operation})")]
    NotFound { record: String, operation: &'static str },

    /// A record or path of the wrong type was given to a container or index
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },

    /// Invalid schema usage surfaced through the engine
    #[error("Schema error: {0}")]
    Schema(SchemaError),
}

impl QueryError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            QueryError::InvalidExpression { .. } => "invalid_expression",
            QueryError::MultipleClause { .. } => "multiple_clause",
            QueryError::UnboundPlaceholder { .. } => "unbound_placeholder",
            QueryError::AmbiguousResult => "ambiguous_result",
            QueryError::EmptyResult => "empty_result",
            QueryError::NotFound { .. } => "not_found",
            QueryError::TypeMismatch { .. } => "type_mismatch",
            QueryError::Schema(_) => "schema",
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            QueryError::AmbiguousResult | QueryError::EmptyResult | QueryError::NotFound { .. } => {
                ErrorSeverity::Low
            }
            QueryError::UnboundPlaceholder { .. } | QueryError::MultipleClause { .. } => ErrorSeverity::Medium,
            QueryError::InvalidExpression { .. } | QueryError::TypeMismatch { .. } | QueryError::Schema(_) => {
                ErrorSeverity::High
            }
        }
    }

    /// Get structured context information for debugging
    pub fn context(&self) -> ErrorContext {
        match self {
            QueryError::InvalidExpression { clause, .. } => {
                ErrorContext { clause: clause.map(str::to_string), ..Default::default() }
            }
            QueryError::MultipleClause { clause } => {
                ErrorContext { clause: Some((*clause).to_string()), ..Default::default() }
            }
            QueryError::UnboundPlaceholder { placeholder } => {
                ErrorContext { placeholder: Some(placeholder.clone()), ..Default::default() }
            }
            QueryError::NotFound { record, operation } => ErrorContext {
                record: Some(record.clone()),
                operation: Some((*operation).to_string()),
                ..Default::default()
            },
            _ => ErrorContext::default(),
        }
    }

    /// Check if this error is recoverable. Outcome errors of a query leave the
    /// fact base untouched; malformed queries need to be fixed by the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            QueryError::AmbiguousResult => true,
            QueryError::EmptyResult => true,
            QueryError::NotFound { .. } => true,
            QueryError::UnboundPlaceholder { .. } => true,
            QueryError::InvalidExpression { .. } => false,
            QueryError::MultipleClause { .. } => false,
            QueryError::TypeMismatch { .. } => false,
            QueryError::Schema(_) => false,
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
        }
    }
}

/// Structured error context for debugging
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ErrorContext {
    pub clause: Option<String>,
    pub placeholder: Option<String>,
    pub record: Option<String>,
    pub operation: Option<String>,
}

/// Result type alias for fact base and query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Convenience constructors for common error scenarios
impl QueryError {
    /// Create an invalid expression error
    pub fn invalid_expression(message: impl Into<String>) -> Self {
        Self::InvalidExpression { message: message.into(), clause: None }
    }

    /// Create an invalid expression error attributed to a clause
    pub fn invalid_clause(clause: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidExpression { message: message.into(), clause: Some(clause) }
    }

    /// Create a repeated clause error
    pub fn multiple_clause(clause: &'static str) -> Self {
        Self::MultipleClause { clause }
    }

    /// Create an unbound placeholder error
    pub fn unbound_placeholder(placeholder: impl fmt::Display) -> Self {
        Self::UnboundPlaceholder { placeholder: placeholder.to_string() }
    }

    /// Create a not-found error for a strict removal
    pub fn not_found(operation: &'static str, record: impl fmt::Display) -> Self {
        Self::NotFound { record: record.to_string(), operation }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch { message: message.into() }
    }
}

impl From<SchemaError> for QueryError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::TypeMismatch { .. } => QueryError::type_mismatch(err.to_string()),
            other => QueryError::Schema(other),
        }
    }
}

/// Extension trait for attributing errors to a query clause
pub trait ResultExt<T> {
    /// Tag invalid expression errors with the clause that produced them
    fn with_clause_context(self, clause: &'static str) -> QueryResult<T>;
}

impl<T> ResultExt<T> for QueryResult<T> {
    fn with_clause_context(self, clause: &'static str) -> QueryResult<T> {
        self.map_err(|mut err| {
            if let QueryError::InvalidExpression { clause: c, .. } = &mut err {
                c.get_or_insert(clause);
            }
            err
        })
    }
}
