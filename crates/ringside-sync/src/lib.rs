//! # ringside-sync: Live Layer for Ringside
//!
//! Keeps a teller terminal current with the operator's live config, the
//! session's events and the teller's own wagers, and runs the operations
//! that change them: placing bets, pricing events and paying out.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ringside-sync                                    │
//! │                                                                         │
//! │  ┌────────────────────────────────────────────────────────────────┐    │
//! │  │                     TerminalSession                            │    │
//! │  │  (session.rs - owns every subscription of one terminal)        │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │           │                    │                      │                │
//! │           ▼                    ▼                      ▼                │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐   │
//! │  │ ConfigWatcher  │  │   StreamMerger     │  │   OddsReactor      │   │
//! │  │                │  │   ×2 (events,      │  │                    │   │
//! │  │ watch<Option<  │  │   wagers), each    │  │ pools or rate      │   │
//! │  │  LiveConfig>>  │  │   over 2 feeds     │  │ changed → reprice  │   │
//! │  └────────────────┘  └────────────────────┘  └────────────────────┘   │
//! │           ▲                    ▲                      │                │
//! │           └──────── ChangeBus (bus.rs) ◄──── LiveStore (store.rs)     │
//! │                                                   ▲                    │
//! │  ┌────────────────┐  ┌────────────────────┐       │                    │
//! │  │  WagerDesk     │  │  SettlementGuard   │───────┤                    │
//! │  │  + Counter     │──┤  + BalanceGate     │       │                    │
//! │  │    Allocator   │  │                    │  TellerLedger             │
//! │  └────────────────┘  └────────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use ringside_sync::{LiveStore, TerminalConfig, TerminalSession};
//!
//! let config = TerminalConfig::load(None)?;
//! let store = LiveStore::new(Database::new(DbConfig::new(&config.storage.db_path)).await?);
//! let session = TerminalSession::start(store, &config)?;
//! session.wait_ready().await?;
//! let placement = session.place(Side::Wala, Money::from_pesos(500)).await?;
//! ```

pub mod allocator;
pub mod bus;
pub mod config;
pub mod desk;
pub mod error;
pub mod feed;
pub mod guard;
pub mod ledger;
pub mod merger;
pub mod odds;
pub mod printer;
pub mod session;
pub mod store;
pub mod watcher;

pub use allocator::{AllocatedId, CounterAllocator};
pub use bus::{Change, ChangeBus};
pub use config::TerminalConfig;
pub use desk::{Placement, WagerDesk};
pub use error::{SyncError, SyncResult};
pub use guard::{Redemption, SettlementGuard};
pub use ledger::{DailyStatement, TellerLedger};
pub use merger::{MergedStream, StreamMerger};
pub use odds::OddsReactor;
pub use printer::{LogPrinter, ReceiptPrinter};
pub use session::TerminalSession;
pub use store::LiveStore;
pub use watcher::ConfigWatcher;
