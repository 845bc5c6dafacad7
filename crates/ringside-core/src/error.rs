//! # Error Types
//!
//! Domain-specific error types for ringside-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ringside-core errors (this file)                                      │
//! │  ├── CoreError        - Wagering rule violations, receipt failures     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ringside-db errors                                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  ringside-sync errors                                                  │
//! │  └── SyncError        - What the terminal surfaces to the teller       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → Terminal              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::money::Money;
use crate::types::Side;

// =============================================================================
// Core Error
// =============================================================================

/// Wagering rule violations and receipt failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A timestamp could not be parsed or falls outside the partitionable range.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A partition name does not follow `<kind>_<YYYY>_<MM>`.
    #[error("Invalid partition name: {0}")]
    InvalidPartition(String),

    /// QR payload is missing a field, has an empty field, or a bad segment.
    ///
    /// ## When This Occurs
    /// ```text
    /// Scan "fight_id=F1,bet_id=2025-10-0042"
    ///      │
    ///      ▼
    /// ReceiptCodec::decode
    ///      │
    ///      ▼
    /// MalformedReceipt { reason: "missing field teller" }
    ///      │
    ///      ▼
    /// Terminal shows: "Invalid receipt" (nothing is mutated)
    /// ```
    #[error("Malformed receipt: {reason}")]
    MalformedReceipt { reason: String },

    /// No wager with this id in the receipt's teller partition.
    #[error("Wager not found: {0}")]
    WagerNotFound(String),

    /// No event with this id in the receipt's event partition.
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// The wager has already been paid out.
    #[error("Wager {wager_id} was already claimed at {}", display_claimed_at(.claimed_at))]
    AlreadyClaimed {
        wager_id: String,
        claimed_at: Option<DateTime<Utc>>,
    },

    /// The teller's float cannot cover the payout.
    #[error("Insufficient balance: float {balance}, payout {payout}")]
    InsufficientBalance { balance: Money, payout: Money },

    /// One of the two merged partitions could not be read.
    #[error("Partition {partition} unavailable: {reason}")]
    PartitionUnavailable { partition: String, reason: String },

    /// The month counter could not be incremented; a fallback id was issued.
    #[error("Counter {key} allocation failed: {reason}")]
    CounterAllocationFailed { key: String, reason: String },

    /// Wagers on this side are currently closed.
    #[error("Wagering on {0} is closed")]
    SideClosed(Side),

    /// The event no longer accepts wagers.
    #[error("Event #{0} is not accepting wagers")]
    EventClosed(i64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn display_claimed_at(claimed_at: &Option<DateTime<Utc>>) -> String {
    match claimed_at {
        Some(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => "an unknown time".to_string(),
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
