//! # Balance Gate
//!
//! A teller can only hand out cash they have. Payouts are refused unless
//! the drawer float is positive and covers the full amount.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

pub struct BalanceGate;

impl BalanceGate {
    /// `balance > 0 && balance >= payout`.
    pub fn can_payout(balance: Money, payout: Money) -> bool {
        balance.is_positive() && balance >= payout
    }

    /// Same check as [`BalanceGate::can_payout`], as an error.
    pub fn check(balance: Money, payout: Money) -> CoreResult<()> {
        if Self::can_payout(balance, payout) {
            Ok(())
        } else {
            Err(CoreError::InsufficientBalance { balance, payout })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_float_pays() {
        assert!(BalanceGate::can_payout(Money::from_pesos(950), Money::from_pesos(950)));
        assert!(BalanceGate::check(Money::from_pesos(1000), Money::from_pesos(950)).is_ok());
    }

    #[test]
    fn test_short_float_refused() {
        assert!(!BalanceGate::can_payout(Money::from_pesos(900), Money::from_pesos(950)));
        assert!(matches!(
            BalanceGate::check(Money::from_pesos(900), Money::from_pesos(950)),
            Err(CoreError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_empty_drawer_refuses_even_zero_payout() {
        assert!(!BalanceGate::can_payout(Money::zero(), Money::zero()));
        assert!(!BalanceGate::can_payout(Money::from_pesos(-10), Money::zero()));
    }
}
