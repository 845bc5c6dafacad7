//! # Validation Module
//!
//! Input rules checked before anything is allocated or written.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Terminal input (amount keypad, side buttons, config file)    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: business rule validation                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite CHECK constraints (pools ≥ 0, amount > 0, bps range)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest single stake a terminal accepts (P1,000,000).
pub const MAX_STAKE: Money = Money::from_pesos(1_000_000);

/// Real-world UTC offsets run from -12:00 to +14:00.
const MIN_OFFSET_MINUTES: i32 = -12 * 60;
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Validates a wager stake.
///
/// ## Example
/// ```rust
/// use ringside_core::money::Money;
/// use ringside_core::validation::validate_stake;
///
/// assert!(validate_stake(Money::from_pesos(500)).is_ok());
/// assert!(validate_stake(Money::zero()).is_err());
/// ```
pub fn validate_stake(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    if amount > MAX_STAKE {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_STAKE.centavos(),
        });
    }
    Ok(())
}

/// Validates an identifier that ends up in a receipt payload or a
/// partition name: non-empty, at most 64 characters, no `,` or `=`.
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }
    if value.contains([',', '=']) || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace, ',' or '='".to_string(),
        });
    }
    Ok(())
}

/// Validates a display name printed on receipts.
pub fn validate_display_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "teller_name".to_string(),
        });
    }
    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "teller_name".to_string(),
            max: 100,
        });
    }
    Ok(())
}

/// Commission must be a finite fraction in `[0, 1]`.
pub fn validate_commission_fraction(fraction: f64) -> ValidationResult<()> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(ValidationError::OutOfRange {
            field: "commission".to_string(),
            min: 0,
            max: 1,
        });
    }
    Ok(())
}

pub fn validate_utc_offset(minutes: i32) -> ValidationResult<()> {
    if !(MIN_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        return Err(ValidationError::OutOfRange {
            field: "utc_offset_minutes".to_string(),
            min: MIN_OFFSET_MINUTES as i64,
            max: MAX_OFFSET_MINUTES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_bounds() {
        assert!(validate_stake(Money::from_centavos(1)).is_ok());
        assert!(validate_stake(MAX_STAKE).is_ok());
        assert!(validate_stake(MAX_STAKE + Money::from_centavos(1)).is_err());
        assert!(validate_stake(Money::from_pesos(-5)).is_err());
    }

    #[test]
    fn test_identifier_rules() {
        assert!(validate_identifier("teller_id", "teller-9").is_ok());
        assert!(validate_identifier("teller_id", "").is_err());
        assert!(validate_identifier("teller_id", "a,b").is_err());
        assert!(validate_identifier("teller_id", "a=b").is_err());
        assert!(validate_identifier("teller_id", "a b").is_err());
        assert!(validate_identifier("teller_id", &"x".repeat(65)).is_err());
    }

    #[test]
    fn test_display_name() {
        assert!(validate_display_name("Ana Reyes").is_ok());
        assert!(validate_display_name("   ").is_err());
    }

    #[test]
    fn test_utc_offset_range() {
        assert!(validate_utc_offset(480).is_ok());
        assert!(validate_utc_offset(-720).is_ok());
        assert!(validate_utc_offset(14 * 60 + 1).is_err());
    }
}
