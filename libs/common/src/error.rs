//! Custom error types for the common library
//!
//! Errors raised while setting up or probing the persistence backends.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Whether the error means the database could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        match self {
            DatabaseError::Connection(_) => true,
            DatabaseError::Query(e) => is_connection_error(e),
            DatabaseError::Migration(_) | DatabaseError::Configuration(_) => false,
        }
    }
}

/// Whether a sqlx error comes from the transport rather than from the query
pub fn is_connection_error(error: &SqlxError) -> bool {
    matches!(
        error,
        SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Tls(_)
    )
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeouts_count_as_unavailable() {
        assert!(DatabaseError::Query(SqlxError::PoolTimedOut).is_unavailable());
        assert!(DatabaseError::Connection(SqlxError::PoolClosed).is_unavailable());
    }

    #[test]
    fn query_failures_are_not_unavailability() {
        assert!(!DatabaseError::Query(SqlxError::RowNotFound).is_unavailable());
        assert!(!DatabaseError::Migration("checksum mismatch".to_string()).is_unavailable());
    }
}
