//! # Repository Module
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ringside-sync                                                         │
//! │       │                                                                 │
//! │       │  db.wagers().claim(&key, now)                                  │
//! │       ▼                                                                 │
//! │  WagerRepository                                                       │
//! │  ├── get / list_session                                                │
//! │  ├── record_placement   (wager + pool + ledger, one transaction)       │
//! │  └── claim              (conditional UPDATE, first caller wins)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`config::LiveConfigRepository`] - Singleton live config
//! - [`event::EventRepository`] - Events, pools and odds write-back
//! - [`wager::WagerRepository`] - Wagers, placement and claims
//! - [`counter::CounterRepository`] - Atomic per-month sequences
//! - [`ledger::LedgerRepository`] - Teller cash movements

pub mod config;
pub mod counter;
pub mod event;
pub mod ledger;
pub mod wager;

use ringside_core::{Money, Odds};

use crate::error::{DbError, DbResult};

/// Reads a basis-point column into [`Odds`].
pub(crate) fn odds_column(entity: &str, column: &str, bps: i64) -> DbResult<Odds> {
    u32::try_from(bps)
        .map(Odds::from_bps)
        .map_err(|_| DbError::corrupt(entity, format!("{column} = {bps} is not a valid bps value")))
}

pub(crate) fn money_column(centavos: i64) -> Money {
    Money::from_centavos(centavos)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Records shared by the repository tests.

    use chrono::{DateTime, TimeZone, Utc};
    use ringside_core::{
        CommissionRate, EventRecord, EventStatus, LedgerEntry, LedgerKind, LiveConfig, Money,
        Odds, Outcome, Side, WagerRecord,
    };

    use crate::pool::{Database, DbConfig};

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 14, hour, minute, 0).unwrap()
    }

    pub fn config() -> LiveConfig {
        LiveConfig {
            current_event_number: 77,
            current_session_number: 3,
            commission_rate: CommissionRate::from_bps(1000),
            meron_open: true,
            wala_open: true,
            petty_cash: Money::from_pesos(5000),
        }
    }

    pub fn event(id: &str, number: i64) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            partition_key: "events_2025_10".to_string(),
            event_number: number,
            session_number: 3,
            meron_pool: Money::zero(),
            wala_pool: Money::zero(),
            draw_pool: Money::zero(),
            meron_odds: Odds::zero(),
            wala_odds: Odds::zero(),
            draw_odds: Odds::from_bps(80_000),
            draw_multiplier: Odds::from_bps(80_000),
            commission_collected: Money::zero(),
            outcome: Outcome::Pending,
            status: EventStatus::Open,
            created_at: at(10, 0),
        }
    }

    pub fn wager(id: &str, event: &EventRecord, side: Side, pesos: i64) -> WagerRecord {
        WagerRecord {
            id: id.to_string(),
            partition_key: "wagers_2025_10".to_string(),
            teller_id: "teller-9".to_string(),
            teller_name: "Ana".to_string(),
            event_id: event.id.clone(),
            event_partition: event.partition_key.clone(),
            event_number: event.event_number,
            session_number: event.session_number,
            side,
            amount: Money::from_pesos(pesos),
            placed_at: at(12, 0),
            payout_claimed: false,
            payout_claimed_at: None,
        }
    }

    pub fn ledger(id: &str, kind: LedgerKind, pesos: i64, hour: u32) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            teller_id: "teller-9".to_string(),
            kind,
            amount: Money::from_pesos(pesos),
            recorded_at: at(hour, 0),
            wager_id: None,
            event_number: None,
            side: None,
            reason: String::new(),
        }
    }
}
