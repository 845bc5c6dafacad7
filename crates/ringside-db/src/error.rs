//! # Database Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ──► DbError (categorized) ──► SyncError                   │
//! │                                              │                          │
//! │                         is_transient() ──────┴─► feed backs off/retries │
//! │                         otherwise ─────────────► surfaced to the teller │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched. Conditional writes also report this when the row
    /// exists but no longer satisfies the condition (event closed,
    /// wager already claimed).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Two terminals wrote the same key; only fallback wager ids can do this.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Another writer held the lock past `busy_timeout`.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored row could not be mapped back to a record.
    #[error("Corrupt {entity} row: {reason}")]
    Corrupt { entity: String, reason: String },

    #[error("Database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn corrupt(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Whether the same call can succeed later without anyone intervening.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_)
                | DbError::ConnectionFailed(_)
                | DbError::PoolExhausted
                | DbError::TransactionFailed(_)
                | DbError::QueryFailed(_)
        )
    }
}

/// ```text
/// RowNotFound                         → NotFound
/// "UNIQUE constraint failed: t.col"   → UniqueViolation { field: "t.col" }
/// "... constraint failed ..."         → ConstraintViolation
/// "database is locked"                → Busy
/// PoolTimedOut / PoolClosed           → PoolExhausted / ConnectionFailed
/// ColumnDecode                        → Corrupt
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("constraint failed") {
                    DbError::ConstraintViolation(msg.to_string())
                } else if msg.contains("database is locked") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::ColumnDecode { index, source } => DbError::corrupt("column", format!("{index}: {source}")),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_pool_is_transient() {
        let err = DbError::from(sqlx::Error::PoolClosed);
        assert!(matches!(err, DbError::ConnectionFailed(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_missing_and_corrupt_rows_are_not_transient() {
        assert!(!DbError::from(sqlx::Error::RowNotFound).is_transient());
        assert!(!DbError::corrupt("Wager", "side 'RED'").is_transient());
        assert!(DbError::Busy("database is locked".into()).is_transient());
    }
}
