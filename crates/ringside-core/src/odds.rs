//! # Odds Engine
//!
//! Recomputes MERON/WALA odds and collected commission from side pools.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  side odds   = 1 + (1 - rate)     if side pool > 0                     │
//! │              = 0                  if side pool = 0                     │
//! │                                                                         │
//! │  commission  = (meron + wala + draw) × rate                            │
//! │                                                                         │
//! │  In basis points: odds_bps = 10000 + (10000 - rate_bps)                │
//! │                                                                         │
//! │  rate 10%  → 1.90x        rate 0% → 2.00x        rate 100% → 1.00x     │
//! │                                                                         │
//! │  Draw odds and the draw multiplier are operator-set and never touched. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CommissionRate, EventRecord, Odds, SidePools};
use crate::BPS_SCALE;

/// Values the engine writes back onto an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OddsQuote {
    pub meron_odds: Odds,
    pub wala_odds: Odds,
    pub commission_collected: Money,
}

impl OddsQuote {
    /// True when `event` already carries exactly these values. Writers use
    /// this to skip no-op updates, which keeps recompute-on-change from
    /// feeding itself.
    pub fn is_applied_to(&self, event: &EventRecord) -> bool {
        event.meron_odds == self.meron_odds
            && event.wala_odds == self.wala_odds
            && event.commission_collected == self.commission_collected
    }
}

/// Stateless pool-to-odds calculator.
pub struct OddsEngine;

impl OddsEngine {
    /// ## Example
    /// ```rust
    /// use ringside_core::money::Money;
    /// use ringside_core::odds::OddsEngine;
    /// use ringside_core::types::{CommissionRate, SidePools};
    ///
    /// let pools = SidePools::new(Money::from_pesos(1000), Money::zero(), Money::zero());
    /// let quote = OddsEngine::quote(&pools, CommissionRate::from_bps(1000));
    /// assert_eq!(quote.meron_odds.bps(), 19_000);
    /// assert!(quote.wala_odds.is_zero());
    /// assert_eq!(quote.commission_collected, Money::from_pesos(100));
    /// ```
    pub fn quote(pools: &SidePools, rate: CommissionRate) -> OddsQuote {
        let rate_bps = rate.bps().min(BPS_SCALE);
        let live = Odds::from_bps(BPS_SCALE + (BPS_SCALE - rate_bps));
        let side_odds = |pool: Money| if pool.is_positive() { live } else { Odds::zero() };

        OddsQuote {
            meron_odds: side_odds(pools.meron),
            wala_odds: side_odds(pools.wala),
            commission_collected: pools.total().commission(CommissionRate::from_bps(rate_bps)),
        }
    }

    /// Quote for an event's current pools.
    pub fn quote_event(event: &EventRecord, rate: CommissionRate) -> OddsQuote {
        Self::quote(&event.pools(), rate)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
