//! # Wager Repository
//!
//! Wagers are keyed by `(teller_id, partition_key, id)`.
//!
//! ## Claim Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Terminal A                         Terminal B                         │
//! │  UPDATE … SET payout_claimed = 1    UPDATE … SET payout_claimed = 1    │
//! │  WHERE … AND payout_claimed = 0     WHERE … AND payout_claimed = 0     │
//! │       │ 1 row                            │ 0 rows                      │
//! │       ▼                                  ▼                              │
//! │  Claimed { claimed_at }             re-read → AlreadyClaimed           │
//! │                                                                         │
//! │  SQLite serializes writers, so exactly one UPDATE sees the 0.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use ringside_core::{LedgerEntry, Side, WagerRecord};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::event::EventRepository;
use super::ledger::LedgerRepository;
use super::money_column;
use crate::error::{DbError, DbResult};

const SELECT_WAGER: &str = r#"
    SELECT teller_id, partition_key, id, teller_name, event_id, event_partition,
           event_number, session_number, side, amount_centavos, placed_at,
           payout_claimed, payout_claimed_at
    FROM wagers
"#;

/// Full address of one wager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WagerKey {
    pub teller_id: String,
    pub partition_key: String,
    pub wager_id: String,
}

impl WagerKey {
    pub fn of(wager: &WagerRecord) -> Self {
        WagerKey {
            teller_id: wager.teller_id.clone(),
            partition_key: wager.partition_key.clone(),
            wager_id: wager.id.clone(),
        }
    }
}

/// Result of a conditional claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This call flipped the flag.
    Claimed { claimed_at: DateTime<Utc> },
    /// Someone else got there first.
    AlreadyClaimed { claimed_at: Option<DateTime<Utc>> },
    NotFound,
}

#[derive(Debug, sqlx::FromRow)]
struct WagerRow {
    teller_id: String,
    partition_key: String,
    id: String,
    teller_name: String,
    event_id: String,
    event_partition: String,
    event_number: i64,
    session_number: i64,
    side: Side,
    amount_centavos: i64,
    placed_at: DateTime<Utc>,
    payout_claimed: bool,
    payout_claimed_at: Option<DateTime<Utc>>,
}

impl From<WagerRow> for WagerRecord {
    fn from(row: WagerRow) -> Self {
        WagerRecord {
            id: row.id,
            partition_key: row.partition_key,
            teller_id: row.teller_id,
            teller_name: row.teller_name,
            event_id: row.event_id,
            event_partition: row.event_partition,
            event_number: row.event_number,
            session_number: row.session_number,
            side: row.side,
            amount: money_column(row.amount_centavos),
            placed_at: row.placed_at,
            payout_claimed: row.payout_claimed,
            payout_claimed_at: row.payout_claimed_at,
        }
    }
}

/// Repository for wager database operations.
#[derive(Debug, Clone)]
pub struct WagerRepository {
    pool: SqlitePool,
}

impl WagerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WagerRepository { pool }
    }

    /// Stores a placed wager together with its pool increment and its bet
    /// ledger entry. All three land or none do.
    ///
    /// ## Errors
    /// - `NotFound("Open event")` if the event closed or resolved first
    /// - `UniqueViolation` if the wager id is already taken
    pub async fn record_placement(&self, wager: &WagerRecord, entry: &LedgerEntry) -> DbResult<()> {
        debug!(
            id = %wager.id,
            event = %wager.event_id,
            side = %wager.side,
            amount = %wager.amount,
            "Recording placement"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        EventRepository::add_stake(&mut tx, &wager.event_partition, &wager.event_id, wager.side, wager.amount).await?;
        insert_wager(&mut tx, wager).await?;
        LedgerRepository::insert_on(&mut tx, entry).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    /// Inserts a wager without touching pools (imports, tests).
    pub async fn insert(&self, wager: &WagerRecord) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_wager(&mut conn, wager).await
    }

    pub async fn get(&self, key: &WagerKey) -> DbResult<Option<WagerRecord>> {
        let row: Option<WagerRow> = sqlx::query_as(&format!(
            "{SELECT_WAGER} WHERE teller_id = ?1 AND partition_key = ?2 AND id = ?3"
        ))
        .bind(&key.teller_id)
        .bind(&key.partition_key)
        .bind(&key.wager_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(WagerRecord::from))
    }

    /// A teller's wagers for one session in one partition.
    pub async fn list_session(
        &self,
        teller_id: &str,
        partition: &str,
        session_number: i64,
    ) -> DbResult<Vec<WagerRecord>> {
        let rows: Vec<WagerRow> = sqlx::query_as(&format!(
            "{SELECT_WAGER} WHERE teller_id = ?1 AND partition_key = ?2 AND session_number = ?3 \
             ORDER BY placed_at DESC"
        ))
        .bind(teller_id)
        .bind(partition)
        .bind(session_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(WagerRecord::from).collect())
    }

    /// Marks the payout claimed if, and only if, it is not claimed yet.
    pub async fn claim(&self, key: &WagerKey, at: DateTime<Utc>) -> DbResult<ClaimOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE wagers SET payout_claimed = 1, payout_claimed_at = ?4
            WHERE teller_id = ?1 AND partition_key = ?2 AND id = ?3 AND payout_claimed = 0
            "#,
        )
        .bind(&key.teller_id)
        .bind(&key.partition_key)
        .bind(&key.wager_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            debug!(id = %key.wager_id, "Payout claimed");
            return Ok(ClaimOutcome::Claimed { claimed_at: at });
        }

        match self.get(key).await? {
            Some(wager) => {
                warn!(id = %key.wager_id, "Claim lost: payout already claimed");
                Ok(ClaimOutcome::AlreadyClaimed {
                    claimed_at: wager.payout_claimed_at,
                })
            }
            None => Ok(ClaimOutcome::NotFound),
        }
    }
}

async fn insert_wager(conn: &mut sqlx::SqliteConnection, wager: &WagerRecord) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO wagers (
            teller_id, partition_key, id, teller_name, event_id, event_partition,
            event_number, session_number, side, amount_centavos, placed_at,
            payout_claimed, payout_claimed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&wager.teller_id)
    .bind(&wager.partition_key)
    .bind(&wager.id)
    .bind(&wager.teller_name)
    .bind(&wager.event_id)
    .bind(&wager.event_partition)
    .bind(wager.event_number)
    .bind(wager.session_number)
    .bind(wager.side)
    .bind(wager.amount.centavos())
    .bind(wager.placed_at)
    .bind(wager.payout_claimed)
    .bind(wager.payout_claimed_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
