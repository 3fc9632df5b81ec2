//! Error types for Gator.

use thiserror::Error;

use crate::feed::FetchError;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Wraps errors from whichever sqlx backend is compiled in.
    #[error("database error: {0}")]
    Database(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Feed document could not be fetched or parsed.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Returns true if the sqlx error is a unique constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
