//! # Live Layer Error Types
//!
//! What the terminal gets back from the live layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Live Layer Error Categories                       │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Domain      │  │     Storage             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Core(..)       │  │  Database(..)           │ │
//! │  │  MissingTeller  │  │  AlreadyClaimed │  │  (transient ones are    │ │
//! │  │  ConfigLoad/Save│  │  Insufficient.. │  │   retryable)            │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │   Live state    │  │                 Internal                    │  │
//! │  │                 │  │                                             │  │
//! │  │  NotConfigured  │  │  ChannelError, ShuttingDown, Internal       │  │
//! │  │  NoActiveEvent  │  │                                             │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ringside_core::{CoreError, ValidationError};
use ringside_db::DbError;
use thiserror::Error;

/// Result type alias for live layer operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid terminal configuration.
    #[error("Invalid terminal configuration: {0}")]
    InvalidConfig(String),

    /// No teller configured for this terminal.
    #[error("Teller ID not configured. Set [teller] id or RINGSIDE_TELLER_ID.")]
    MissingTellerId,

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Wagering rule or receipt failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    // =========================================================================
    // Live State Errors
    // =========================================================================
    /// The live config has not been received yet.
    #[error("Live configuration not available yet")]
    NotConfigured,

    /// The config points at an event this terminal cannot see.
    #[error("Fight #{0} is not available on this terminal")]
    NoActiveEvent(i64),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Session is shutting down.
    #[error("Terminal session is shutting down")]
    ShuttingDown,

    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Core(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if repeating the same call later can succeed.
    ///
    /// A claim that lost to another terminal or was refused for lack of
    /// float is final. Retrying it is how double payouts happen.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Database(err) => err.is_transient(),
            SyncError::Core(CoreError::PartitionUnavailable { .. }) => true,
            SyncError::NotConfigured | SyncError::NoActiveEvent(_) => true,
            _ => false,
        }
    }

    /// Returns true if the teller should see this message as-is.
    pub fn is_user_facing(&self) -> bool {
        match self {
            SyncError::Core(err) => !matches!(
                err,
                CoreError::InvalidPartition(_) | CoreError::CounterAllocationFailed { .. }
            ),
            SyncError::NotConfigured | SyncError::NoActiveEvent(_) | SyncError::MissingTellerId => true,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingTellerId
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringside_core::Money;

    #[test]
    fn test_terminal_claim_states_are_not_retryable() {
        let claimed: SyncError = CoreError::AlreadyClaimed {
            wager_id: "2025-10-0001".into(),
            claimed_at: None,
        }
        .into();
        let short: SyncError = CoreError::InsufficientBalance {
            balance: Money::from_pesos(900),
            payout: Money::from_pesos(950),
        }
        .into();

        assert!(!claimed.is_retryable());
        assert!(!short.is_retryable());
        assert!(claimed.is_user_facing());
        assert!(short.is_user_facing());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Database(DbError::PoolExhausted).is_retryable());
        assert!(SyncError::NotConfigured.is_retryable());
        assert!(!SyncError::Database(DbError::not_found("Wager", "x")).is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_validation_converts_through_core() {
        let err: SyncError = ValidationError::MustBePositive {
            field: "amount".into(),
        }
        .into();
        assert!(matches!(err, SyncError::Core(CoreError::Validation(_))));
        assert_eq!(err.to_string(), "Validation error: amount must be positive");
    }
}
