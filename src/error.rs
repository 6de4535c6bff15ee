//! Error types for pg-runner.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for pg-runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Bad or missing operation input, detected before any network call
    /// (missing WHERE on update/delete, empty column map, bad limit, etc.).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or incomplete connection parameters.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Driver-reported failure: syntax, constraint, connectivity, timeout,
    /// auth. Carries the SQLSTATE code when the driver provides one.
    #[error("Query error: {message}")]
    Query {
        /// SQLSTATE error code, if the server reported one.
        code: Option<String>,
        message: String,
    },

    /// Configuration errors (unknown operation tag, invalid config file).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RunnerError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a credential error with the given message.
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Creates a query error without a SQLSTATE code.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            code: None,
            message: msg.into(),
        }
    }

    /// Creates a query error carrying a SQLSTATE code.
    pub fn query_with_code(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Query {
            code: Some(code.into()),
            message: msg.into(),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Credential(_) => "Credential Error",
            Self::Query { .. } => "Query Error",
            Self::Config(_) => "Configuration Error",
        }
    }

    /// True for errors that may be converted into a per-item batch outcome.
    ///
    /// Credential and configuration errors are raised before any item is
    /// processed and always abort the whole run.
    pub fn is_per_item(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Query { .. })
    }

    /// Returns the SQLSTATE code, if this is a query error that has one.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias using RunnerError.
pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = RunnerError::validation("update requires a WHERE clause");
        assert_eq!(
            err.to_string(),
            "Validation error: update requires a WHERE clause"
        );
        assert_eq!(err.category(), "Validation Error");
    }

    #[test]
    fn test_error_display_credential() {
        let err = RunnerError::credential("database name is required");
        assert_eq!(
            err.to_string(),
            "Credential error: database name is required"
        );
        assert_eq!(err.category(), "Credential Error");
    }

    #[test]
    fn test_error_display_query() {
        let err = RunnerError::query("column \"emal\" does not exist");
        assert_eq!(
            err.to_string(),
            "Query error: column \"emal\" does not exist"
        );
        assert_eq!(err.category(), "Query Error");
        assert_eq!(err.sql_state(), None);
    }

    #[test]
    fn test_query_error_with_code() {
        let err = RunnerError::query_with_code("23505", "duplicate key value");
        assert_eq!(err.sql_state(), Some("23505"));
        assert_eq!(err.to_string(), "Query error: duplicate key value");
    }

    #[test]
    fn test_error_display_config() {
        let err = RunnerError::config("unknown operation 'upsert'");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown operation 'upsert'"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_per_item_classification() {
        assert!(RunnerError::validation("x").is_per_item());
        assert!(RunnerError::query("x").is_per_item());
        assert!(!RunnerError::credential("x").is_per_item());
        assert!(!RunnerError::config("x").is_per_item());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RunnerError>();
    }
}
