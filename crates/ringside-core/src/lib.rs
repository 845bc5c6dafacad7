//! # ringside-core: Pure Wagering Logic
//!
//! Everything a teller terminal decides without touching storage: how pools
//! become odds, which monthly partition a record lives in, what a receipt
//! QR payload looks like, and whether a scanned receipt pays out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ringside Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              apps/terminal (headless teller terminal)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │   ringside-sync: session, merger, watcher, desk, guard          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ringside-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ partition │  │   odds    │  │  receipt  │  │settlement │  │   │
//! │  │   │ resolver  │  │  engine   │  │   codec   │  │ + balance │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │   merge   │  │  report   │  │   print   │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        ringside-db: SQLite partitions, counters, claims         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (events, wagers, live config, ledger)
//! - [`money`] - Money in centavos, odds and commission in basis points
//! - [`partition`] - Monthly partition naming and wager id formatting
//! - [`odds`] - Parimutuel odds and commission from side pools
//! - [`receipt`] - QR payload encode/decode
//! - [`balance`] - Teller float check before payouts
//! - [`settlement`] - Won/lost/pending decision for a scanned wager
//! - [`merge`] - Two-partition snapshot merge state
//! - [`report`] - Daily ledger totals and wager filtering
//! - [`print`] - Bet and payout receipt print jobs
//! - [`validation`] - Input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use ringside_core::money::Money;
//! use ringside_core::types::{CommissionRate, SidePools};
//! use ringside_core::odds::OddsEngine;
//!
//! let pools = SidePools::new(Money::from_pesos(1000), Money::from_pesos(1000), Money::zero());
//! let quote = OddsEngine::quote(&pools, CommissionRate::from_bps(1000));
//!
//! // 10% commission -> both sides pay 1.90x
//! assert_eq!(quote.meron_odds.bps(), 19000);
//! assert_eq!(Money::from_pesos(500).apply_odds(quote.meron_odds), Money::from_pesos(950));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod error;
pub mod merge;
pub mod money;
pub mod odds;
pub mod partition;
pub mod print;
pub mod receipt;
pub mod report;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use partition::{PartitionKey, PartitionPair, PartitionResolver};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default wall-clock offset for partition months (Asia/Manila, UTC+08:00).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 8 * 60;

/// Minimum digits in the sequence part of a wager id (`2025-10-0042`).
pub const SEQUENCE_WIDTH: usize = 4;

/// Basis points in 1.00x / 100%.
pub const BPS_SCALE: u32 = 10_000;
