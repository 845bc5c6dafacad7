//! # Teller Reports
//!
//! Daily cash totals from the ledger and filtered wager lists for the
//! session screen.
//!
//! ## Daily Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cash_in  = Σ CashIn     (float issued)                                │
//! │  bets     = Σ Bet        (stakes taken)                                │
//! │  payouts  = Σ CashOut    (winnings handed out)                         │
//! │  net      = cash_in + bets - payouts   (what should be in the drawer)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::settlement::WagerState;
use crate::types::{EventRecord, LedgerEntry, LedgerKind, Odds, Outcome, Side, WagerRecord};

// =============================================================================
// Daily Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyReport {
    #[ts(as = "String")]
    pub day: NaiveDate,
    pub cash_in: Money,
    pub bets: Money,
    pub payouts: Money,
    pub net: Money,
    pub bet_count: usize,
    pub payout_count: usize,
}

impl DailyReport {
    pub fn summarize(day: NaiveDate, entries: &[LedgerEntry]) -> Self {
        let total = |kind: LedgerKind| -> Money {
            entries.iter().filter(|e| e.kind == kind).map(|e| e.amount).sum()
        };
        let count = |kind: LedgerKind| entries.iter().filter(|e| e.kind == kind).count();

        let cash_in = total(LedgerKind::CashIn);
        let bets = total(LedgerKind::Bet);
        let payouts = total(LedgerKind::CashOut);
        DailyReport {
            day,
            cash_in,
            bets,
            payouts,
            net: cash_in + bets - payouts,
            bet_count: count(LedgerKind::Bet),
            payout_count: count(LedgerKind::CashOut),
        }
    }
}

/// UTC bounds `[start, end)` of a local calendar day.
pub fn day_bounds(day: NaiveDate, offset: FixedOffset) -> CoreResult<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .ok_or_else(|| CoreError::InvalidTimestamp(format!("{day} has no local midnight")))?;
    let start = midnight.with_timezone(&Utc);
    Ok((start, start + Duration::days(1)))
}

// =============================================================================
// Wager Filtering
// =============================================================================

/// Settled or not, from the teller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    /// Event not yet resolved.
    Pending,
    /// Event resolved (won, lost or already paid).
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WagerFilter {
    pub event_number: Option<i64>,
    pub side: Option<Side>,
    pub status: StatusFilter,
}

/// A wager annotated with its event's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WagerLine {
    pub wager: WagerRecord,
    pub state: WagerState,
    /// `PENDING` when the event is not in view.
    pub outcome: Outcome,
    /// What the wager's side currently pays; zero when the event is not in view.
    pub odds: Odds,
}

impl WagerFilter {
    /// Annotates `wagers` against `events` and keeps the ones that match.
    /// Input order is preserved.
    pub fn apply(&self, wagers: &[WagerRecord], events: &[EventRecord]) -> Vec<WagerLine> {
        let by_id: HashMap<&str, &EventRecord> = events.iter().map(|e| (e.id.as_str(), e)).collect();

        wagers
            .iter()
            .filter(|w| self.event_number.map_or(true, |n| w.event_number == n))
            .filter(|w| self.side.map_or(true, |s| w.side == s))
            .map(|w| {
                let event = by_id.get(w.event_id.as_str()).copied();
                WagerLine {
                    state: WagerState::of(w, event),
                    outcome: event.map_or(Outcome::Pending, |e| e.outcome),
                    odds: event.map_or(Odds::zero(), |e| e.payout_odds(w.side)),
                    wager: w.clone(),
                }
            })
            .filter(|line| match self.status {
                StatusFilter::All => true,
                StatusFilter::Pending => line.state == WagerState::Pending,
                StatusFilter::Completed => line.state != WagerState::Pending,
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventStatus, Odds, Outcome};

    fn entry(kind: LedgerKind, pesos: i64) -> LedgerEntry {
        LedgerEntry {
            id: format!("{kind:?}-{pesos}"),
            teller_id: "teller-9".to_string(),
            kind,
            amount: Money::from_pesos(pesos),
            recorded_at: Utc::now(),
            wager_id: None,
            event_number: None,
            side: None,
            reason: String::new(),
        }
    }

    #[test]
    fn test_summarize_daily_totals() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 14).unwrap();
        let entries = vec![
            entry(LedgerKind::CashIn, 5000),
            entry(LedgerKind::Bet, 500),
            entry(LedgerKind::Bet, 300),
            entry(LedgerKind::CashOut, 950),
        ];
        let report = DailyReport::summarize(day, &entries);
        assert_eq!(report.cash_in, Money::from_pesos(5000));
        assert_eq!(report.bets, Money::from_pesos(800));
        assert_eq!(report.payouts, Money::from_pesos(950));
        assert_eq!(report.net, Money::from_pesos(4850));
        assert_eq!(report.bet_count, 2);
        assert_eq!(report.payout_count, 1);
    }

    #[test]
    fn test_day_bounds_in_manila() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 14).unwrap();
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let (start, end) = day_bounds(day, offset).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 10, 13, 16, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 10, 14, 16, 0, 0).unwrap());
    }

    fn event(id: &str, number: i64, outcome: Outcome) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            partition_key: "events_2025_10".to_string(),
            event_number: number,
            session_number: 1,
            meron_pool: Money::zero(),
            wala_pool: Money::zero(),
            draw_pool: Money::zero(),
            meron_odds: Odds::from_bps(19_000),
            wala_odds: Odds::from_bps(19_000),
            draw_odds: Odds::from_bps(80_000),
            draw_multiplier: Odds::from_bps(80_000),
            commission_collected: Money::zero(),
            outcome,
            status: EventStatus::Closed,
            created_at: Utc::now(),
        }
    }

    fn wager(id: &str, event_id: &str, number: i64, side: Side) -> WagerRecord {
        WagerRecord {
            id: id.to_string(),
            partition_key: "wagers_2025_10".to_string(),
            teller_id: "teller-9".to_string(),
            teller_name: "Ana".to_string(),
            event_id: event_id.to_string(),
            event_partition: "events_2025_10".to_string(),
            event_number: number,
            session_number: 1,
            side,
            amount: Money::from_pesos(100),
            placed_at: Utc::now(),
            payout_claimed: false,
            payout_claimed_at: None,
        }
    }

    #[test]
    fn test_filter_by_event_side_and_status() {
        let events = vec![event("e1", 1, Outcome::Meron), event("e2", 2, Outcome::Pending)];
        let wagers = vec![
            wager("w1", "e1", 1, Side::Meron),
            wager("w2", "e1", 1, Side::Wala),
            wager("w3", "e2", 2, Side::Meron),
        ];

        let all = WagerFilter::default().apply(&wagers, &events);
        let states: Vec<_> = all.iter().map(|l| l.state).collect();
        assert_eq!(states, vec![WagerState::Won, WagerState::Lost, WagerState::Pending]);
        assert_eq!(all[0].outcome, Outcome::Meron);
        assert_eq!(all[0].odds, Odds::from_bps(19_000));
        assert_eq!(all[2].outcome, Outcome::Pending);

        let orphan = WagerFilter::default().apply(&[wager("w9", "gone", 9, Side::Draw)], &events);
        assert_eq!(orphan[0].state, WagerState::Pending);
        assert_eq!(orphan[0].odds, Odds::zero());

        let meron = WagerFilter { side: Some(Side::Meron), ..Default::default() }.apply(&wagers, &events);
        assert_eq!(meron.len(), 2);

        let pending = WagerFilter { status: StatusFilter::Pending, ..Default::default() }.apply(&wagers, &events);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].wager.id, "w3");

        let completed_e1 = WagerFilter {
            event_number: Some(1),
            status: StatusFilter::Completed,
            ..Default::default()
        }
        .apply(&wagers, &events);
        assert_eq!(completed_e1.len(), 2);
    }
}
