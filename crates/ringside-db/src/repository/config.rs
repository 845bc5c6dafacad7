//! # Live Config Repository
//!
//! The single `live_config` row the operator console writes.

use chrono::{DateTime, Utc};
use ringside_core::{CommissionRate, LiveConfig, Money};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct LiveConfigRow {
    current_event_number: i64,
    current_session_number: i64,
    commission_bps: i64,
    meron_open: bool,
    wala_open: bool,
    petty_cash_centavos: i64,
}

impl TryFrom<LiveConfigRow> for LiveConfig {
    type Error = DbError;

    fn try_from(row: LiveConfigRow) -> DbResult<Self> {
        let bps = u32::try_from(row.commission_bps)
            .map_err(|_| DbError::corrupt("live_config", format!("commission_bps = {}", row.commission_bps)))?;
        Ok(LiveConfig {
            current_event_number: row.current_event_number,
            current_session_number: row.current_session_number,
            commission_rate: CommissionRate::from_bps(bps),
            meron_open: row.meron_open,
            wala_open: row.wala_open,
            petty_cash: Money::from_centavos(row.petty_cash_centavos),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LiveConfigRepository {
    pool: SqlitePool,
}

impl LiveConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LiveConfigRepository { pool }
    }

    /// `None` until an operator has written a config.
    pub async fn get(&self) -> DbResult<Option<LiveConfig>> {
        let row: Option<LiveConfigRow> = sqlx::query_as(
            r#"
            SELECT current_event_number, current_session_number, commission_bps,
                   meron_open, wala_open, petty_cash_centavos
            FROM live_config
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(LiveConfig::try_from).transpose()
    }

    /// Replaces the live config.
    pub async fn put(&self, config: &LiveConfig, at: DateTime<Utc>) -> DbResult<()> {
        debug!(
            event = config.current_event_number,
            session = config.current_session_number,
            "Writing live config"
        );

        sqlx::query(
            r#"
            INSERT INTO live_config (
                id, current_event_number, current_session_number, commission_bps,
                meron_open, wala_open, petty_cash_centavos, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (id) DO UPDATE SET
                current_event_number = excluded.current_event_number,
                current_session_number = excluded.current_session_number,
                commission_bps = excluded.commission_bps,
                meron_open = excluded.meron_open,
                wala_open = excluded.wala_open,
                petty_cash_centavos = excluded.petty_cash_centavos,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.current_event_number)
        .bind(config.current_session_number)
        .bind(config.commission_rate.bps() as i64)
        .bind(config.meron_open)
        .bind(config.wala_open)
        .bind(config.petty_cash.centavos())
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_missing_config_is_none() {
        let db = fixtures::database().await;
        assert!(db.live_config().get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_singleton() {
        let db = fixtures::database().await;
        let mut config = fixtures::config();
        db.live_config().put(&config, fixtures::at(9, 0)).await.unwrap();

        config.current_event_number = 78;
        config.meron_open = false;
        db.live_config().put(&config, fixtures::at(9, 5)).await.unwrap();

        assert_eq!(db.live_config().get().await.unwrap(), Some(config));
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM live_config")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_commission_rejected_by_schema() {
        let db = fixtures::database().await;
        let mut config = fixtures::config();
        config.commission_rate = CommissionRate::from_bps(10_001);
        assert!(db.live_config().put(&config, fixtures::at(9, 0)).await.is_err());
    }
}
