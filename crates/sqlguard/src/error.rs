//! Error types for guarded query construction
//!
//! Two families live here: security errors raised while building a query
//! (always before any executor call), and executor errors surfaced from the
//! external transport with the SQL text and phase attached.

use crate::provenance::Provenance;

/// Boxed error returned by [`SqlExecutor`](crate::backends::SqlExecutor) implementations
pub type ExecutorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for guarded query operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Error types for guarded query construction and dispatch
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Non-literal value detected ({provenance} SQL): {sql}")]
    NonLiteralValue { provenance: Provenance, sql: String },

    #[error("Invalid alias name '{name}', expected [a-z0-9_]+")]
    InvalidAliasName { name: String },

    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error("Alias '{alias}' has a value referencing alias '{conflicts_with}'")]
    AliasCollision { alias: String, conflicts_with: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot prepare SQL: {source}")]
    Prepare {
        sql: String,
        #[source]
        source: ExecutorError,
    },

    #[error("Cannot execute SQL: {source}")]
    Execute {
        sql: String,
        #[source]
        source: ExecutorError,
    },

    #[error("Cannot fetch results: {source}")]
    Fetch {
        sql: String,
        #[source]
        source: ExecutorError,
    },
}

impl GuardError {
    /// Errors detected from the inputs alone, before the executor is reached
    pub fn is_security_violation(&self) -> bool {
        !self.is_executor_error()
    }

    /// Errors surfaced by the executor; recoverable at the caller's discretion
    pub fn is_executor_error(&self) -> bool {
        matches!(
            self,
            GuardError::Prepare { .. } | GuardError::Execute { .. } | GuardError::Fetch { .. }
        )
    }

    /// SQL text the error relates to, when there is one
    pub fn sql(&self) -> Option<&str> {
        match self {
            GuardError::NonLiteralValue { sql, .. }
            | GuardError::Prepare { sql, .. }
            | GuardError::Execute { sql, .. }
            | GuardError::Fetch { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
