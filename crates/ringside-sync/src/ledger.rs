//! # Teller Ledger
//!
//! Cash movements of one teller's drawer and the end-of-day statement.

use chrono::{DateTime, NaiveDate, Utc};
use ringside_core::report::{day_bounds, DailyReport};
use ringside_core::{LedgerEntry, LedgerKind, Money, PartitionResolver};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::SyncResult;
use crate::store::LiveStore;

/// Totals for a day plus the entries behind them, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatement {
    pub report: DailyReport,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone)]
pub struct TellerLedger {
    store: LiveStore,
    resolver: PartitionResolver,
    teller_id: String,
}

impl TellerLedger {
    pub fn new(store: LiveStore, resolver: PartitionResolver, teller_id: impl Into<String>) -> Self {
        TellerLedger {
            store,
            resolver,
            teller_id: teller_id.into(),
        }
    }

    /// Records float handed to the teller.
    pub async fn cash_in(&self, amount: Money, reason: &str, at: DateTime<Utc>) -> SyncResult<LedgerEntry> {
        ringside_core::validation::validate_stake(amount)?;
        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            teller_id: self.teller_id.clone(),
            kind: LedgerKind::CashIn,
            amount,
            recorded_at: at,
            wager_id: None,
            event_number: None,
            side: None,
            reason: reason.to_string(),
        };
        self.store.append_ledger(&entry).await?;
        info!(teller = %self.teller_id, amount = %amount, "Cash in recorded");
        Ok(entry)
    }

    /// The local calendar day `at` falls on.
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.resolver.offset()).date_naive()
    }

    pub async fn daily_statement(&self, day: NaiveDate) -> SyncResult<DailyStatement> {
        let (start, end) = day_bounds(day, self.resolver.offset())?;
        let mut entries = self.store.db().ledger().list_between(&self.teller_id, start, end).await?;
        let report = DailyReport::summarize(day, &entries);
        entries.reverse();
        Ok(DailyStatement { report, entries })
    }

    pub async fn daily_report(&self, day: NaiveDate) -> SyncResult<DailyReport> {
        Ok(self.daily_statement(day).await?.report)
    }

    /// Cash the drawer should hold at `at`: today's net so far.
    pub async fn balance(&self, at: DateTime<Utc>) -> SyncResult<Money> {
        let (start, _) = day_bounds(self.local_day(at), self.resolver.offset())?;
        let entries = self.store.db().ledger().list_between(&self.teller_id, start, at).await?;
        Ok(DailyReport::summarize(self.local_day(at), &entries).net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_statement_uses_local_day_and_lists_newest_first() {
        let store = testing::store().await;
        let ledger = TellerLedger::new(store.clone(), PartitionResolver::new(480).unwrap(), "teller-9");

        // 2025-10-13 23:30 local is still the 13th.
        let yesterday = Utc.with_ymd_and_hms(2025, 10, 13, 15, 30, 0).unwrap();
        ledger.cash_in(Money::from_pesos(999), "late float", yesterday).await.unwrap();

        ledger.cash_in(Money::from_pesos(5000), "Opening float", testing::at(0, 30)).await.unwrap();
        let mut bet = testing::ledger_entry("bet", LedgerKind::Bet, 500, testing::at(2, 0));
        bet.wager_id = Some("2025-10-0001".into());
        store.append_ledger(&bet).await.unwrap();
        store
            .append_ledger(&testing::ledger_entry("pay", LedgerKind::CashOut, 950, testing::at(3, 0)))
            .await
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 10, 14).unwrap();
        let statement = ledger.daily_statement(day).await.unwrap();
        assert_eq!(statement.report.cash_in, Money::from_pesos(5000));
        assert_eq!(statement.report.bets, Money::from_pesos(500));
        assert_eq!(statement.report.payouts, Money::from_pesos(950));
        assert_eq!(statement.report.net, Money::from_pesos(4550));
        let ids: Vec<&str> = statement.entries.iter().take(2).map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["pay", "bet"]);

        assert_eq!(ledger.balance(testing::at(2, 30)).await.unwrap(), Money::from_pesos(5500));
    }

    #[tokio::test]
    async fn test_cash_in_rejects_non_positive() {
        let store = testing::store().await;
        let ledger = TellerLedger::new(store, PartitionResolver::new(480).unwrap(), "teller-9");
        assert!(ledger.cash_in(Money::zero(), "nothing", testing::at(1, 0)).await.is_err());
    }
}
