//! # Settlement
//!
//! Pure decisions behind a receipt redemption. The guard in ringside-sync
//! does the loading and the conditional claim; this module decides what
//! the loaded records mean.
//!
//! ## Decision Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  wager.payout_claimed?        ──yes──► AlreadyClaimed (nothing else)    │
//! │        │ no                                                             │
//! │  event.outcome == PENDING?    ──yes──► Pending, payout 0               │
//! │        │ no                                                             │
//! │  outcome matches side?        ──no───► Lost, payout 0                  │
//! │        │ yes                                                            │
//! │  Won, payout = amount × (side odds | draw multiplier)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Cancelled` outcome matches no side and therefore settles as lost.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{EventRecord, Odds, Outcome, Receipt, Side, WagerRecord};

/// Settlement result for one wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum SettlementStatus {
    Won,
    Lost,
    Pending,
}

/// Where a wager is in its lifecycle, for list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WagerState {
    Pending,
    Won,
    Lost,
    Claimed,
}

impl WagerState {
    pub fn of(wager: &WagerRecord, event: Option<&EventRecord>) -> WagerState {
        if wager.payout_claimed {
            return WagerState::Claimed;
        }
        match event.map(|e| Settlement::assess(wager, e).status) {
            Some(SettlementStatus::Won) => WagerState::Won,
            Some(SettlementStatus::Lost) => WagerState::Lost,
            Some(SettlementStatus::Pending) | None => WagerState::Pending,
        }
    }
}

/// The outcome of assessing a wager against its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Assessment {
    pub status: SettlementStatus,
    pub side: Side,
    pub outcome: Outcome,
    pub amount: Money,
    /// Odds the payout was computed at (zero unless won).
    pub odds: Odds,
    pub payout: Money,
}

pub struct Settlement;

impl Settlement {
    /// Refuses a wager whose payout has already been handed out.
    pub fn ensure_unclaimed(wager: &WagerRecord) -> CoreResult<()> {
        if wager.payout_claimed {
            return Err(CoreError::AlreadyClaimed {
                wager_id: wager.id.clone(),
                claimed_at: wager.payout_claimed_at,
            });
        }
        Ok(())
    }

    /// Refuses a receipt whose fields disagree with the stored wager.
    pub fn ensure_matches(receipt: &Receipt, wager: &WagerRecord) -> CoreResult<()> {
        if receipt.event_id != wager.event_id || receipt.partition_key != wager.event_partition {
            return Err(CoreError::MalformedReceipt {
                reason: format!("receipt does not match wager {}", wager.id),
            });
        }
        Ok(())
    }

    /// Decides won/lost/pending and the payout.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // 500 on WALA at 1.90, event resolved WALA → Won, 950
    /// let assessment = Settlement::assess(&wager, &event);
    /// assert_eq!(assessment.payout, Money::from_pesos(950));
    /// ```
    pub fn assess(wager: &WagerRecord, event: &EventRecord) -> Assessment {
        let base = Assessment {
            status: SettlementStatus::Pending,
            side: wager.side,
            outcome: event.outcome,
            amount: wager.amount,
            odds: Odds::zero(),
            payout: Money::zero(),
        };

        if !event.outcome.is_resolved() {
            return base;
        }
        if !event.outcome.favors(wager.side) {
            return Assessment {
                status: SettlementStatus::Lost,
                ..base
            };
        }

        let odds = event.payout_odds(wager.side);
        Assessment {
            status: SettlementStatus::Won,
            odds,
            payout: wager.amount.apply_odds(odds),
            ..base
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
