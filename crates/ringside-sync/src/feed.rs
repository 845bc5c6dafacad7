//! # Partition Feeds
//!
//! One feed per partition. A feed turns bus notifications into full
//! snapshots of its partition and hands them to the merger.
//!
//! ## Feed Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   subscribe to bus ──► load snapshot ──ok──► send Snapshot ──┐          │
//! │                            ▲    │                            │          │
//! │                            │   err                           ▼          │
//! │                            │    ▼                     wait for:         │
//! │                            │  send Failed             • relevant change │
//! │                            │  sleep(backoff)          • Lagged          │
//! │                            │    │                     • refresh tick    │
//! │                            └────┴────────────────────────────┘          │
//! │                                                                         │
//! │   cancelled (any point) ──► return, dropping the bus receiver           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use backoff::backoff::Backoff;
use ringside_core::merge::{Keyed, Slot};
use ringside_core::{EventRecord, PartitionKey, WagerRecord};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::{Change, ChangeBus};
use crate::config::LiveSettings;
use crate::error::SyncResult;
use crate::store::LiveStore;

/// Where a feed gets its snapshots from.
#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    type Item: Keyed + Clone + PartialEq + Send + Sync + 'static;

    /// Everything currently in `partition` that this source covers.
    async fn load(&self, partition: &PartitionKey) -> SyncResult<Vec<Self::Item>>;

    /// Whether `change` may have altered what `load(partition)` returns.
    fn is_relevant(&self, change: &Change, partition: &PartitionKey) -> bool;
}

/// What a feed tells its merger.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate<T> {
    Snapshot { slot: Slot, items: Vec<T> },
    Failed { slot: Slot, reason: String },
}

// =============================================================================
// Sources
// =============================================================================

/// Events of one session.
#[derive(Debug, Clone)]
pub struct EventSource {
    store: LiveStore,
    session_number: i64,
}

impl EventSource {
    pub fn new(store: LiveStore, session_number: i64) -> Self {
        EventSource { store, session_number }
    }
}

#[async_trait]
impl SnapshotSource for EventSource {
    type Item = EventRecord;

    async fn load(&self, partition: &PartitionKey) -> SyncResult<Vec<EventRecord>> {
        Ok(self
            .store
            .db()
            .events()
            .list_session(partition.as_str(), self.session_number)
            .await?)
    }

    fn is_relevant(&self, change: &Change, partition: &PartitionKey) -> bool {
        matches!(change, Change::Events { partition: p } if p == partition.as_str())
    }
}

/// One teller's wagers of one session.
#[derive(Debug, Clone)]
pub struct WagerSource {
    store: LiveStore,
    teller_id: String,
    session_number: i64,
}

impl WagerSource {
    pub fn new(store: LiveStore, teller_id: impl Into<String>, session_number: i64) -> Self {
        WagerSource {
            store,
            teller_id: teller_id.into(),
            session_number,
        }
    }
}

#[async_trait]
impl SnapshotSource for WagerSource {
    type Item = WagerRecord;

    async fn load(&self, partition: &PartitionKey) -> SyncResult<Vec<WagerRecord>> {
        Ok(self
            .store
            .db()
            .wagers()
            .list_session(&self.teller_id, partition.as_str(), self.session_number)
            .await?)
    }

    fn is_relevant(&self, change: &Change, partition: &PartitionKey) -> bool {
        matches!(
            change,
            Change::Wagers { teller_id, partition: p }
                if *teller_id == self.teller_id && p == partition.as_str()
        )
    }
}

// =============================================================================
// Feed Task
// =============================================================================

/// Runs one partition feed until `cancel` fires or the merger goes away.
pub(crate) async fn run_feed<S: SnapshotSource>(
    source: Arc<S>,
    slot: Slot,
    partition: PartitionKey,
    bus: ChangeBus,
    tx: mpsc::Sender<FeedUpdate<S::Item>>,
    settings: LiveSettings,
    cancel: CancellationToken,
) {
    // Subscribe before the first load so no write between the two is missed.
    let mut changes = bus.subscribe();
    let mut backoff = settings.backoff();
    let refresh = settings.refresh_interval();
    let mut ticker = interval_at(Instant::now() + refresh, refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(%partition, ?slot, "Partition feed started");

    loop {
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            loaded = source.load(&partition) => loaded,
        };

        match loaded {
            Ok(items) => {
                backoff.reset();
                if tx.send(FeedUpdate::Snapshot { slot, items }).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                warn!(%partition, error = %err, ?delay, "Partition feed failed, retrying");
                let failed = FeedUpdate::Failed {
                    slot,
                    reason: err.to_string(),
                };
                if tx.send(failed).await.is_err() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => continue,
                }
            }
        }

        // Wait for something worth reloading for.
        let keep_running = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break false,
                _ = ticker.tick() => break true,
                received = changes.recv() => match received {
                    Ok(change) if source.is_relevant(&change, &partition) => break true,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(%partition, skipped, "Feed lagged behind the bus, reloading");
                        break true;
                    }
                    Err(RecvError::Closed) => break false,
                },
            }
        };
        if !keep_running {
            break;
        }
    }

    debug!(%partition, ?slot, "Partition feed stopped");
}
