//! Storage error classification
//!
//! Every repository implementation reports failures through [`StoreError`],
//! so callers can distinguish client-triggered failures (bad references,
//! duplicates) from infrastructure failures without inspecting `sqlx` types.
//!
//! # Example
//!
//! ```
//! use couchsport_shared::db::error::StoreError;
//!
//! let err = StoreError::from(sqlx::Error::RowNotFound);
//! assert!(matches!(err, StoreError::NotFound));
//! ```

/// PostgreSQL SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// PostgreSQL SQLSTATE for `check_violation`
const CHECK_VIOLATION: &str = "23514";

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested row does not exist
    #[error("Record not found")]
    NotFound,

    /// A unique constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A foreign key or check constraint rejected the write
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => StoreError::Conflict(db_err.message().to_string()),
                Some(FOREIGN_KEY_VIOLATION) | Some(CHECK_VIOLATION) => {
                    StoreError::Constraint(db_err.message().to_string())
                }
                _ => StoreError::Database(err.to_string()),
            },
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn test_pool_errors_map_to_database() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
