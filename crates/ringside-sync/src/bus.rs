//! # Change Bus
//!
//! In-process push notifications. Every write that goes through
//! [`LiveStore`](crate::store::LiveStore) announces the scope it touched;
//! feeds listening on the bus reload that scope as a full snapshot.
//!
//! ```text
//!   LiveStore::record_placement ──► Change::Events { events_2025_10 }
//!                               ──► Change::Wagers { teller-9, wagers_2025_10 }
//!                               ──► Change::Ledger { teller-9 }
//!                                        │
//!                      broadcast (lossy: Lagged ⇒ reload everything)
//!                                        │
//!              ┌─────────────────┬───────┴─────────┬─────────────────┐
//!              ▼                 ▼                 ▼                 ▼
//!        events feed       events feed       wagers feed       ConfigWatcher
//!        (current)         (previous)        (current)
//! ```

use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// The scope a write touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Config,
    Events { partition: String },
    Wagers { teller_id: String, partition: String },
    Ledger { teller_id: String },
}

#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<Change>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChangeBus { tx }
    }

    /// Announces `change`. Having no listeners is normal.
    pub fn publish(&self, change: Change) {
        trace!(?change, listeners = self.tx.receiver_count(), "Publishing change");
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.tx.subscribe()
    }

    /// Live listeners; zero once every session has been torn down.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
