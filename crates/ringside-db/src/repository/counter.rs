//! # Counter Repository
//!
//! Per-month sequence counters (`wagers_counter_2025_10`). The increment
//! is a single upsert, so concurrent callers always get distinct values.

use sqlx::SqlitePool;
use tracing::trace;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    /// Atomically increments `key` (creating it at 1) and returns the new value.
    pub async fn increment(&self, key: &str) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counters (key, value) VALUES (?1, 1)
            ON CONFLICT (key) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        trace!(key, value, "Counter incremented");
        Ok(value)
    }

    /// Current value, `None` if nothing was ever allocated under `key`.
    pub async fn current(&self, key: &str) -> DbResult<Option<i64>> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM counters WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }
}
