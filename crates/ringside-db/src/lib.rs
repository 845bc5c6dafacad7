//! # ringside-db: Database Layer for Ringside
//!
//! SQLite storage for the live config, monthly event and wager partitions,
//! sequence counters and the teller ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ringside-sync (feeds, allocator, desk, guard)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  ringside-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ config, event │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ wager, counter│    │ 001_init.sql │  │   │
//! │  │   │               │    │ ledger        │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL), path from terminal.toml [storage]                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ringside_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ringside.db")).await?;
//! let events = db.events().list_session("events_2025_10", 3).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::config::LiveConfigRepository;
pub use repository::counter::CounterRepository;
pub use repository::event::EventRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::wager::{ClaimOutcome, WagerKey, WagerRepository};
