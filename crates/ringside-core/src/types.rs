//! # Domain Types
//!
//! Core domain types used throughout Ringside.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   LiveConfig    │   │   EventRecord   │   │   WagerRecord   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  event number   │   │  id, number     │   │  id YYYY-MM-N   │       │
//! │  │  session number │   │  side pools     │   │  side, amount   │       │
//! │  │  commission     │   │  odds, outcome  │   │  claimed flag   │       │
//! │  │  side open flags│   │  status         │   │  teller         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Odds       │   │ CommissionRate  │   │     Receipt     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  bps (u32)      │   │  QR payload     │       │
//! │  │  19000 = 1.90x  │   │  1000 = 10%     │   │  fields         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Event Lifecycle
//! ```text
//! OPEN/PENDING ──(close)──► CLOSED/PENDING ──(resolve)──► CLOSED/<outcome>
//!                                                          (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::BPS_SCALE;

// =============================================================================
// Odds
// =============================================================================

/// Decimal odds in basis points of the stake: 19000 = 1.90x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Odds(u32);

impl Odds {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Odds(bps)
    }

    /// Converts a decimal multiplier once at the boundary. Negative or
    /// non-finite input becomes zero odds.
    pub fn from_multiplier(multiplier: f64) -> Self {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Odds(0);
        }
        Odds((multiplier * BPS_SCALE as f64).round().min(u32::MAX as f64) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the multiplier as a float (for display only).
    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.0 as f64 / BPS_SCALE as f64
    }

    #[inline]
    pub const fn zero() -> Self {
        Odds(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Two decimals, rounded: `1.90`, `8.00`.
impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hundredths = (self.0 as u64 + 50) / 100;
        write!(f, "{}.{:02}", hundredths / 100, hundredths % 100)
    }
}

// =============================================================================
// Commission Rate
// =============================================================================

/// House commission in basis points: 1000 = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommissionRate(u32);

impl CommissionRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        CommissionRate(bps)
    }

    /// Converts an operator-entered fraction in `[0, 1]` (0.1 = 10%).
    ///
    /// ## Example
    /// ```rust
    /// use ringside_core::types::CommissionRate;
    ///
    /// assert_eq!(CommissionRate::from_fraction(0.1).unwrap().bps(), 1000);
    /// assert!(CommissionRate::from_fraction(1.5).is_err());
    /// ```
    pub fn from_fraction(fraction: f64) -> Result<Self, ValidationError> {
        crate::validation::validate_commission_fraction(fraction)?;
        Ok(CommissionRate((fraction * BPS_SCALE as f64).round() as u32))
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a fraction (for display only).
    #[inline]
    pub fn fraction(&self) -> f64 {
        self.0 as f64 / BPS_SCALE as f64
    }

    #[inline]
    pub const fn zero() -> Self {
        CommissionRate(0)
    }
}

// =============================================================================
// Side / Outcome / Status
// =============================================================================

/// The side a wager backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Meron,
    Wala,
    Draw,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Meron, Side::Wala, Side::Draw];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Side::Meron => "MERON",
            Side::Wala => "WALA",
            Side::Draw => "DRAW",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `meron`, `Meron` and `MERON` all parse.
impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Side::ALL
            .into_iter()
            .find(|side| side.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "side".to_string(),
                allowed: Side::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

/// Result of an event. `Pending` until an operator resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    #[default]
    Pending,
    Meron,
    Wala,
    Draw,
    Cancelled,
}

impl Outcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "PENDING",
            Outcome::Meron => "MERON",
            Outcome::Wala => "WALA",
            Outcome::Draw => "DRAW",
            Outcome::Cancelled => "CANCELLED",
        }
    }

    #[inline]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }

    /// Whether a wager on `side` wins under this outcome.
    pub fn favors(&self, side: Side) -> bool {
        self.as_str().eq_ignore_ascii_case(side.as_str())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Outcome; 5] = [
            Outcome::Pending,
            Outcome::Meron,
            Outcome::Wala,
            Outcome::Draw,
            Outcome::Cancelled,
        ];
        ALL.into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "outcome".to_string(),
                allowed: ALL.iter().map(|o| o.as_str().to_string()).collect(),
            })
    }
}

/// Whether an event takes wagers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    #[default]
    Open,
    Closed,
}

/// The two partitioned record families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Event,
    Wager,
}

impl EntityKind {
    /// Prefix used in partition and counter names.
    pub const fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Event => "events",
            EntityKind::Wager => "wagers",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "events" => Some(EntityKind::Event),
            "wagers" => Some(EntityKind::Wager),
            _ => None,
        }
    }
}

/// Sort direction for merged wager lists (by placement time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WagerOrder {
    Ascending,
    #[default]
    Descending,
}

// =============================================================================
// Side Pools
// =============================================================================

/// Total staked on each side of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SidePools {
    pub meron: Money,
    pub wala: Money,
    pub draw: Money,
}

impl SidePools {
    pub const fn new(meron: Money, wala: Money, draw: Money) -> Self {
        SidePools { meron, wala, draw }
    }

    pub fn get(&self, side: Side) -> Money {
        match side {
            Side::Meron => self.meron,
            Side::Wala => self.wala,
            Side::Draw => self.draw,
        }
    }

    pub fn total(&self) -> Money {
        self.meron + self.wala + self.draw
    }
}

// =============================================================================
// Live Config
// =============================================================================

/// The singleton operating state the operator console writes and every
/// terminal watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LiveConfig {
    pub current_event_number: i64,
    pub current_session_number: i64,
    pub commission_rate: CommissionRate,
    pub meron_open: bool,
    pub wala_open: bool,
    /// Float the operator issued to tellers for the session.
    pub petty_cash: Money,
}

impl LiveConfig {
    /// Draw has no toggle; it is open whenever the event is.
    pub fn is_side_open(&self, side: Side) -> bool {
        match side {
            Side::Meron => self.meron_open,
            Side::Wala => self.wala_open,
            Side::Draw => true,
        }
    }

    /// Whether `event` is the one this config points terminals at.
    pub fn is_active(&self, event: &EventRecord) -> bool {
        event.event_number == self.current_event_number
            && event.session_number == self.current_session_number
    }
}

// =============================================================================
// Event Record
// =============================================================================

/// One contest tellers take wagers on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventRecord {
    pub id: String,
    /// Event partition this record lives in (`events_2025_10`).
    pub partition_key: String,
    pub event_number: i64,
    pub session_number: i64,
    pub meron_pool: Money,
    pub wala_pool: Money,
    pub draw_pool: Money,
    pub meron_odds: Odds,
    pub wala_odds: Odds,
    /// Displayed draw odds. Operator-set, never recomputed.
    pub draw_odds: Odds,
    /// Fixed draw payout multiplier. Operator-set, never recomputed.
    pub draw_multiplier: Odds,
    pub commission_collected: Money,
    pub outcome: Outcome,
    pub status: EventStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn pools(&self) -> SidePools {
        SidePools::new(self.meron_pool, self.wala_pool, self.draw_pool)
    }

    /// Odds a winning wager on `side` is paid at. Draw pays the fixed
    /// multiplier, not the displayed draw odds.
    pub fn payout_odds(&self, side: Side) -> Odds {
        match side {
            Side::Meron => self.meron_odds,
            Side::Wala => self.wala_odds,
            Side::Draw => self.draw_multiplier,
        }
    }

    pub fn is_accepting_wagers(&self) -> bool {
        self.status == EventStatus::Open && !self.outcome.is_resolved()
    }
}

// =============================================================================
// Wager Record
// =============================================================================

/// One teller-placed stake. Identified by `YYYY-MM-NNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WagerRecord {
    pub id: String,
    /// Wager partition this record lives in (`wagers_2025_10`).
    pub partition_key: String,
    pub teller_id: String,
    pub teller_name: String,
    pub event_id: String,
    /// Partition of the referenced event.
    pub event_partition: String,
    pub event_number: i64,
    pub session_number: i64,
    pub side: Side,
    pub amount: Money,
    #[ts(as = "String")]
    pub placed_at: DateTime<Utc>,
    pub payout_claimed: bool,
    #[ts(as = "Option<String>")]
    pub payout_claimed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Receipt
// =============================================================================

/// Decoded QR payload printed on a bet receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    pub event_id: String,
    pub wager_id: String,
    pub teller_id: String,
    #[ts(as = "String")]
    pub placed_at: DateTime<Utc>,
    /// Event partition name.
    pub partition_key: String,
}

impl Receipt {
    pub fn for_wager(wager: &WagerRecord) -> Self {
        Receipt {
            event_id: wager.event_id.clone(),
            wager_id: wager.id.clone(),
            teller_id: wager.teller_id.clone(),
            placed_at: wager.placed_at,
            partition_key: wager.event_partition.clone(),
        }
    }
}

// =============================================================================
// Teller
// =============================================================================

/// The authenticated teller operating this terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TellerIdentity {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Ledger
// =============================================================================

/// Kind of cash movement in a teller's drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Float issued to the teller.
    CashIn,
    /// Payout handed to a bettor.
    CashOut,
    /// Stake taken from a bettor.
    Bet,
}

/// One cash movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub teller_id: String,
    pub kind: LedgerKind,
    pub amount: Money,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
    pub wager_id: Option<String>,
    pub event_number: Option<i64>,
    pub side: Option<Side>,
    pub reason: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
