//! # Money Module
//!
//! Provides the `Money` type for stakes, pools, payouts and teller float.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With float odds:                                                       │
//! │    500 × 1.9 = 949.9999999999999  ❌ short-pays the bettor              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer centavos × basis-point odds                      │
//! │    50_000 × 19_000 / 10_000 = 95_000 centavos = P950.00 exactly        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ringside_core::money::Money;
//! use ringside_core::types::Odds;
//!
//! let stake = Money::from_pesos(500);
//! let payout = stake.apply_odds(Odds::from_bps(19_000));
//! assert_eq!(payout.centavos(), 95_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{CommissionRate, Odds};
use crate::BPS_SCALE;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (1/100 peso).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Wager.amount ──► EventRecord.<side>_pool ──► OddsEngine ──► odds      │
/// │       │                                                                 │
/// │       └──► amount × odds ──► payout ──► BalanceGate(float) ──► CASH_OUT│
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    #[inline]
    pub const fn from_centavos(centavos: i64) -> Self {
        Money(centavos)
    }

    /// Creates a Money value from whole pesos.
    ///
    /// ## Example
    /// ```rust
    /// use ringside_core::money::Money;
    ///
    /// assert_eq!(Money::from_pesos(950).centavos(), 95_000);
    /// ```
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos * 100)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn centavos(&self) -> i64 {
        self.0
    }

    /// Returns the whole-peso portion (truncated toward zero).
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavo portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a stake by decimal odds, rounding half up to the centavo.
    ///
    /// ## Implementation
    /// `(centavos * odds_bps + 5000) / 10000`, computed in i128.
    ///
    /// ## Example
    /// ```rust
    /// use ringside_core::money::Money;
    /// use ringside_core::types::Odds;
    ///
    /// // Draw pays 8.00x
    /// let payout = Money::from_pesos(100).apply_odds(Odds::from_bps(80_000));
    /// assert_eq!(payout, Money::from_pesos(800));
    /// ```
    pub fn apply_odds(&self, odds: Odds) -> Money {
        Money(scale_bps(self.0, odds.bps()))
    }

    /// The house share of this amount at the given commission rate.
    ///
    /// ## Example
    /// ```rust
    /// use ringside_core::money::Money;
    /// use ringside_core::types::CommissionRate;
    ///
    /// let commission = Money::from_pesos(2000).commission(CommissionRate::from_bps(1000));
    /// assert_eq!(commission, Money::from_pesos(200));
    /// ```
    pub fn commission(&self, rate: CommissionRate) -> Money {
        Money(scale_bps(self.0, rate.bps()))
    }

    /// Receipt formatting: peso sign, thousands separators, centavos only
    /// when non-zero (`P1,000`, `P950.50`).
    pub fn receipt_display(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = group_thousands(self.pesos().unsigned_abs());
        if self.centavos_part() == 0 {
            format!("{sign}P{whole}")
        } else {
            format!("{sign}P{whole}.{:02}", self.centavos_part())
        }
    }
}

fn scale_bps(centavos: i64, bps: u32) -> i64 {
    let scale = BPS_SCALE as i128;
    let product = centavos as i128 * bps as i128;
    let rounded = if product >= 0 {
        (product + scale / 2) / scale
    } else {
        (product - scale / 2) / scale
    };
    rounded as i64
}

fn group_thousands(mut value: u64) -> String {
    let mut groups = Vec::new();
    loop {
        if value < 1000 {
            groups.push(value.to_string());
            break;
        }
        groups.push(format!("{:03}", value % 1000));
        value /= 1000;
    }
    groups.reverse();
    groups.join(",")
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Always shows centavos (`P1,000.00`); see [`Money::receipt_display`] for
/// the printed form.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}P{}.{:02}",
            sign,
            group_thousands(self.pesos().unsigned_abs()),
            self.centavos_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pesos() {
        assert_eq!(Money::from_pesos(950).centavos(), 95_000);
        assert_eq!(Money::from_centavos(95_050).pesos(), 950);
        assert_eq!(Money::from_centavos(95_050).centavos_part(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_pesos(950).to_string(), "P950.00");
        assert_eq!(Money::from_centavos(123_456_789).to_string(), "P1,234,567.89");
        assert_eq!(Money::from_centavos(-550).to_string(), "-P5.50");
    }

    #[test]
    fn test_receipt_display_drops_zero_centavos() {
        assert_eq!(Money::from_pesos(1000).receipt_display(), "P1,000");
        assert_eq!(Money::from_centavos(95_050).receipt_display(), "P950.50");
        assert_eq!(Money::zero().receipt_display(), "P0");
    }

    #[test]
    fn test_apply_odds_is_exact_for_common_stakes() {
        let odds = Odds::from_bps(19_000);
        assert_eq!(Money::from_pesos(500).apply_odds(odds), Money::from_pesos(950));
        assert_eq!(Money::from_pesos(100).apply_odds(odds), Money::from_pesos(190));
        assert_eq!(Money::zero().apply_odds(odds), Money::zero());
    }

    #[test]
    fn test_apply_odds_rounds_half_up() {
        // 1 centavo × 1.5x = 1.5 centavos → 2
        assert_eq!(Money::from_centavos(1).apply_odds(Odds::from_bps(15_000)).centavos(), 2);
        // 1 centavo × 1.4x = 1.4 centavos → 1
        assert_eq!(Money::from_centavos(1).apply_odds(Odds::from_bps(14_000)).centavos(), 1);
    }

    #[test]
    fn test_commission() {
        let rate = CommissionRate::from_bps(1000);
        assert_eq!(Money::from_pesos(2000).commission(rate), Money::from_pesos(200));
        assert_eq!(Money::from_pesos(2000).commission(CommissionRate::zero()), Money::zero());
    }

    #[test]
    fn test_sum_and_arithmetic() {
        let total: Money = [100, 250, 650].into_iter().map(Money::from_pesos).sum();
        assert_eq!(total, Money::from_pesos(1000));

        let mut float = Money::from_pesos(1000);
        float -= Money::from_pesos(950);
        float += Money::from_pesos(10);
        assert_eq!(float, Money::from_pesos(60));
        assert!(float.is_positive());
        assert!((Money::zero() - float).is_negative());
    }
}
