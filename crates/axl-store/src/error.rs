//! Persistence error types

use thiserror::Error;

/// Error that can occur while writing directory data.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the database.
    #[error("database connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Batch could not be encoded as JSON.
    #[error("failed to serialize batch: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored procedure failed.
    #[error("procedure {procedure} failed: {source}")]
    Procedure {
        procedure: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Store configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl StoreError {
    /// Check if this error is transient and a later run may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Connection { .. } => true,
            StoreError::Procedure { source, .. } => matches!(
                source,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            StoreError::Serialization(_) | StoreError::InvalidConfiguration { .. } => false,
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Connection { .. } => "DB_CONNECTION_FAILED",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::Procedure { .. } => "PROCEDURE_FAILED",
            StoreError::InvalidConfiguration { .. } => "INVALID_CONFIG",
        }
    }

    pub(crate) fn procedure(procedure: &'static str, source: sqlx::Error) -> Self {
        StoreError::Procedure { procedure, source }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = StoreError::Connection {
            message: "refused".to_string(),
            source: None,
        };
        assert!(err.is_transient());
        assert_eq!(err.error_code(), "DB_CONNECTION_FAILED");

        let err = StoreError::procedure("axl_update_users", sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());

        let err = StoreError::procedure("axl_update_users", sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
        assert_eq!(err.error_code(), "PROCEDURE_FAILED");

        let err = StoreError::InvalidConfiguration {
            message: "x".to_string(),
        };
        assert!(!err.is_transient());
    }
}
