//! # Event Repository
//!
//! Events live in monthly partitions (`partition_key` column).
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert            operator opens an event                             │
//! │  add_stake         placement, inside WagerRepository's transaction     │
//! │  apply_quote       odds reactor; writes only when values differ        │
//! │  close / resolve   operator; resolve is terminal                       │
//! │  set_draw_terms    operator; draw odds are never recomputed            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use ringside_core::odds::OddsQuote;
use ringside_core::{EventRecord, EventStatus, Money, Odds, Outcome, Side};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{money_column, odds_column};
use crate::error::{DbError, DbResult};

const SELECT_EVENT: &str = r#"
    SELECT partition_key, id, event_number, session_number,
           meron_pool_centavos, wala_pool_centavos, draw_pool_centavos,
           meron_odds_bps, wala_odds_bps, draw_odds_bps, draw_multiplier_bps,
           commission_centavos, outcome, status, created_at
    FROM events
"#;

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    partition_key: String,
    id: String,
    event_number: i64,
    session_number: i64,
    meron_pool_centavos: i64,
    wala_pool_centavos: i64,
    draw_pool_centavos: i64,
    meron_odds_bps: i64,
    wala_odds_bps: i64,
    draw_odds_bps: i64,
    draw_multiplier_bps: i64,
    commission_centavos: i64,
    outcome: Outcome,
    status: EventStatus,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = DbError;

    fn try_from(row: EventRow) -> DbResult<Self> {
        Ok(EventRecord {
            meron_odds: odds_column("event", "meron_odds_bps", row.meron_odds_bps)?,
            wala_odds: odds_column("event", "wala_odds_bps", row.wala_odds_bps)?,
            draw_odds: odds_column("event", "draw_odds_bps", row.draw_odds_bps)?,
            draw_multiplier: odds_column("event", "draw_multiplier_bps", row.draw_multiplier_bps)?,
            id: row.id,
            partition_key: row.partition_key,
            event_number: row.event_number,
            session_number: row.session_number,
            meron_pool: money_column(row.meron_pool_centavos),
            wala_pool: money_column(row.wala_pool_centavos),
            draw_pool: money_column(row.draw_pool_centavos),
            commission_collected: money_column(row.commission_centavos),
            outcome: row.outcome,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

/// Repository for event database operations.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    pub async fn insert(&self, event: &EventRecord) -> DbResult<()> {
        debug!(partition = %event.partition_key, id = %event.id, number = event.event_number, "Inserting event");

        sqlx::query(
            r#"
            INSERT INTO events (
                partition_key, id, event_number, session_number,
                meron_pool_centavos, wala_pool_centavos, draw_pool_centavos,
                meron_odds_bps, wala_odds_bps, draw_odds_bps, draw_multiplier_bps,
                commission_centavos, outcome, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&event.partition_key)
        .bind(&event.id)
        .bind(event.event_number)
        .bind(event.session_number)
        .bind(event.meron_pool.centavos())
        .bind(event.wala_pool.centavos())
        .bind(event.draw_pool.centavos())
        .bind(event.meron_odds.bps() as i64)
        .bind(event.wala_odds.bps() as i64)
        .bind(event.draw_odds.bps() as i64)
        .bind(event.draw_multiplier.bps() as i64)
        .bind(event.commission_collected.centavos())
        .bind(event.outcome)
        .bind(event.status)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, partition: &str, id: &str) -> DbResult<Option<EventRecord>> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("{SELECT_EVENT} WHERE partition_key = ?1 AND id = ?2"))
                .bind(partition)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(EventRecord::try_from).transpose()
    }

    /// Every event of `session_number` in one partition, newest first.
    pub async fn list_session(&self, partition: &str, session_number: i64) -> DbResult<Vec<EventRecord>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{SELECT_EVENT} WHERE partition_key = ?1 AND session_number = ?2 ORDER BY event_number DESC"
        ))
        .bind(partition)
        .bind(session_number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    /// Adds a stake to one side's pool, only while the event is open and
    /// unresolved. Runs on the caller's connection so it can join a
    /// placement transaction.
    pub(crate) async fn add_stake(
        conn: &mut SqliteConnection,
        partition: &str,
        id: &str,
        side: Side,
        amount: Money,
    ) -> DbResult<()> {
        let sql = match side {
            Side::Meron => "UPDATE events SET meron_pool_centavos = meron_pool_centavos + ?3 \
                            WHERE partition_key = ?1 AND id = ?2 AND status = 'OPEN' AND outcome = 'PENDING'",
            Side::Wala => "UPDATE events SET wala_pool_centavos = wala_pool_centavos + ?3 \
                           WHERE partition_key = ?1 AND id = ?2 AND status = 'OPEN' AND outcome = 'PENDING'",
            Side::Draw => "UPDATE events SET draw_pool_centavos = draw_pool_centavos + ?3 \
                           WHERE partition_key = ?1 AND id = ?2 AND status = 'OPEN' AND outcome = 'PENDING'",
        };

        let result = sqlx::query(sql)
            .bind(partition)
            .bind(id)
            .bind(amount.centavos())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Open event", id));
        }
        Ok(())
    }

    /// Writes recomputed odds and commission. Returns `false` when the
    /// stored values already match, so no change is emitted.
    pub async fn apply_quote(&self, partition: &str, id: &str, quote: &OddsQuote) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events SET
                meron_odds_bps = ?3,
                wala_odds_bps = ?4,
                commission_centavos = ?5
            WHERE partition_key = ?1 AND id = ?2
              AND (meron_odds_bps != ?3 OR wala_odds_bps != ?4 OR commission_centavos != ?5)
            "#,
        )
        .bind(partition)
        .bind(id)
        .bind(quote.meron_odds.bps() as i64)
        .bind(quote.wala_odds.bps() as i64)
        .bind(quote.commission_collected.centavos())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Operator-set draw odds and multiplier.
    pub async fn set_draw_terms(&self, partition: &str, id: &str, draw_odds: Odds, draw_multiplier: Odds) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE events SET draw_odds_bps = ?3, draw_multiplier_bps = ?4 WHERE partition_key = ?1 AND id = ?2",
        )
        .bind(partition)
        .bind(id)
        .bind(draw_odds.bps() as i64)
        .bind(draw_multiplier.bps() as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Event", id));
        }
        Ok(())
    }

    /// Stops wagering on an event.
    pub async fn close(&self, partition: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE events SET status = 'CLOSED' WHERE partition_key = ?1 AND id = ?2")
            .bind(partition)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Event", id));
        }
        Ok(())
    }

    /// Records the outcome. Only a pending event can be resolved.
    pub async fn resolve(&self, partition: &str, id: &str, outcome: Outcome) -> DbResult<()> {
        if !outcome.is_resolved() {
            return Err(DbError::ConstraintViolation("cannot resolve an event to PENDING".to_string()));
        }

        let result = sqlx::query(
            "UPDATE events SET outcome = ?3, status = 'CLOSED' \
             WHERE partition_key = ?1 AND id = ?2 AND outcome = 'PENDING'",
        )
        .bind(partition)
        .bind(id)
        .bind(outcome)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pending event", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use ringside_core::odds::OddsEngine;
    use ringside_core::CommissionRate;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = fixtures::database().await;
        let event = fixtures::event("evt-77", 77);
        db.events().insert(&event).await.unwrap();

        let loaded = db.events().get("events_2025_10", "evt-77").await.unwrap();
        assert_eq!(loaded, Some(event));
        assert!(db.events().get("events_2025_09", "evt-77").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_session_newest_first() {
        let db = fixtures::database().await;
        for n in [75, 77, 76] {
            db.events().insert(&fixtures::event(&format!("evt-{n}"), n)).await.unwrap();
        }
        let mut other_session = fixtures::event("evt-1", 1);
        other_session.session_number = 4;
        db.events().insert(&other_session).await.unwrap();

        let numbers: Vec<i64> = db
            .events()
            .list_session("events_2025_10", 3)
            .await
            .unwrap()
            .iter()
            .map(|e| e.event_number)
            .collect();
        assert_eq!(numbers, vec![77, 76, 75]);
    }

    #[tokio::test]
    async fn test_add_stake_only_while_open() {
        let db = fixtures::database().await;
        db.events().insert(&fixtures::event("evt-77", 77)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        EventRepository::add_stake(&mut conn, "events_2025_10", "evt-77", Side::Wala, Money::from_pesos(500))
            .await
            .unwrap();
        EventRepository::add_stake(&mut conn, "events_2025_10", "evt-77", Side::Wala, Money::from_pesos(250))
            .await
            .unwrap();
        drop(conn);

        let event = db.events().get("events_2025_10", "evt-77").await.unwrap().unwrap();
        assert_eq!(event.wala_pool, Money::from_pesos(750));
        assert!(event.meron_pool.is_zero());

        db.events().close("events_2025_10", "evt-77").await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let err = EventRepository::add_stake(&mut conn, "events_2025_10", "evt-77", Side::Meron, Money::from_pesos(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_apply_quote_is_idempotent() {
        let db = fixtures::database().await;
        let mut event = fixtures::event("evt-77", 77);
        event.meron_pool = Money::from_pesos(1000);
        event.wala_pool = Money::from_pesos(1000);
        db.events().insert(&event).await.unwrap();

        let quote = OddsEngine::quote_event(&event, CommissionRate::from_bps(1000));
        assert!(db.events().apply_quote("events_2025_10", "evt-77", &quote).await.unwrap());
        assert!(!db.events().apply_quote("events_2025_10", "evt-77", &quote).await.unwrap());

        let stored = db.events().get("events_2025_10", "evt-77").await.unwrap().unwrap();
        assert_eq!(stored.meron_odds, Odds::from_bps(19_000));
        assert_eq!(stored.commission_collected, Money::from_pesos(200));
        assert_eq!(stored.draw_multiplier, Odds::from_bps(80_000));
    }

    #[tokio::test]
    async fn test_resolve_is_terminal() {
        let db = fixtures::database().await;
        db.events().insert(&fixtures::event("evt-77", 77)).await.unwrap();

        db.events().resolve("events_2025_10", "evt-77", Outcome::Wala).await.unwrap();
        let event = db.events().get("events_2025_10", "evt-77").await.unwrap().unwrap();
        assert_eq!(event.outcome, Outcome::Wala);
        assert_eq!(event.status, EventStatus::Closed);

        assert!(db.events().resolve("events_2025_10", "evt-77", Outcome::Meron).await.is_err());
        assert!(db.events().resolve("events_2025_10", "evt-77", Outcome::Pending).await.is_err());
    }
}
