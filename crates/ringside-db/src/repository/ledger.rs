//! # Ledger Repository
//!
//! Cash-in, bet and cash-out movements per teller.

use chrono::{DateTime, Utc};
use ringside_core::{LedgerEntry, LedgerKind, Side};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::money_column;
use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: String,
    teller_id: String,
    kind: LedgerKind,
    amount_centavos: i64,
    recorded_at: DateTime<Utc>,
    wager_id: Option<String>,
    event_number: Option<i64>,
    side: Option<Side>,
    reason: String,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        LedgerEntry {
            id: row.id,
            teller_id: row.teller_id,
            kind: row.kind,
            amount: money_column(row.amount_centavos),
            recorded_at: row.recorded_at,
            wager_id: row.wager_id,
            event_number: row.event_number,
            side: row.side,
            reason: row.reason,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    pub async fn append(&self, entry: &LedgerEntry) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_on(&mut conn, entry).await
    }

    pub(crate) async fn insert_on(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
        debug!(id = %entry.id, kind = ?entry.kind, amount = %entry.amount, "Appending ledger entry");

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, teller_id, kind, amount_centavos, recorded_at,
                wager_id, event_number, side, reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.teller_id)
        .bind(entry.kind)
        .bind(entry.amount.centavos())
        .bind(entry.recorded_at)
        .bind(&entry.wager_id)
        .bind(entry.event_number)
        .bind(entry.side)
        .bind(&entry.reason)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// A teller's entries with `start <= recorded_at < end`, oldest first.
    pub async fn list_between(
        &self,
        teller_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, teller_id, kind, amount_centavos, recorded_at,
                   wager_id, event_number, side, reason
            FROM ledger_entries
            WHERE teller_id = ?1 AND julianday(recorded_at) >= julianday(?2)
              AND julianday(recorded_at) < julianday(?3)
            ORDER BY julianday(recorded_at) ASC, id ASC
            "#,
        )
        .bind(teller_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;

    #[tokio::test]
    async fn test_list_between_is_half_open_and_per_teller() {
        let db = fixtures::database().await;
        let ledger = db.ledger();
        ledger.append(&fixtures::ledger("a", LedgerKind::CashIn, 5000, 8)).await.unwrap();
        ledger.append(&fixtures::ledger("b", LedgerKind::Bet, 500, 12)).await.unwrap();
        ledger.append(&fixtures::ledger("c", LedgerKind::CashOut, 950, 18)).await.unwrap();

        let mut other = fixtures::ledger("d", LedgerKind::Bet, 100, 12);
        other.teller_id = "teller-2".to_string();
        ledger.append(&other).await.unwrap();

        let entries = ledger
            .list_between("teller-9", fixtures::at(8, 0), fixtures::at(18, 0))
            .await
            .unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_optional_columns_round_trip() {
        let db = fixtures::database().await;
        let mut entry = fixtures::ledger("a", LedgerKind::Bet, 500, 12);
        entry.wager_id = Some("2025-10-0001".to_string());
        entry.event_number = Some(77);
        entry.side = Some(Side::Wala);
        entry.reason = "Bet placed on WALA - Fight #77".to_string();
        db.ledger().append(&entry).await.unwrap();

        let loaded = db
            .ledger()
            .list_between("teller-9", fixtures::at(0, 0), fixtures::at(23, 0))
            .await
            .unwrap();
        assert_eq!(loaded, vec![entry]);
    }
}
