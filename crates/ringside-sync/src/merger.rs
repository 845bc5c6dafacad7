//! # Stream Merger
//!
//! Presents one list spanning the current and previous month partitions,
//! so a session that crosses midnight on the last day of a month keeps
//! seeing everything it placed.
//!
//! ## Task Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           MergedStream                                  │
//! │                                                                         │
//! │   feed(current)  ──┐                                                    │
//! │                    ├─► mpsc ──► merge task ──► watch<MergedView<T>>     │
//! │   feed(previous) ──┘            (PartitionMerge)        │               │
//! │                                                         ├─► subscribe() │
//! │                                                         └─► updates()   │
//! │                                                                         │
//! │   all three tasks share one CancellationToken (child of the caller's)  │
//! │   shutdown() / Drop cancels it; shutdown() also joins the tasks        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is published until both partitions have reported once, either
//! with a snapshot or with a failure. A failed partition keeps serving its
//! last good snapshot and is listed in [`MergedView::stale`].

use ringside_core::merge::{MergedView, PartitionMerge, Slot};
use ringside_core::PartitionPair;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::ChangeBus;
use crate::config::LiveSettings;
use crate::error::{SyncError, SyncResult};
use crate::feed::{run_feed, FeedUpdate, SnapshotSource};

const UPDATE_BUFFER: usize = 16;

pub struct StreamMerger;

impl StreamMerger {
    /// Starts both partition feeds and the merge task.
    ///
    /// `compare` orders the published items; ties are broken by id.
    pub fn spawn<S, C>(
        source: Arc<S>,
        pair: PartitionPair,
        bus: &ChangeBus,
        settings: &LiveSettings,
        compare: C,
        parent: &CancellationToken,
    ) -> MergedStream<S::Item>
    where
        S: SnapshotSource,
        C: Fn(&S::Item, &S::Item) -> Ordering + Send + 'static,
    {
        let cancel = parent.child_token();
        let (update_tx, update_rx) = mpsc::channel(UPDATE_BUFFER);
        let (view_tx, view_rx) = watch::channel(MergedView::default());

        let mut tasks = Vec::with_capacity(3);
        for (slot, partition) in [(Slot::Current, &pair.current), (Slot::Previous, &pair.previous)] {
            tasks.push(tokio::spawn(run_feed(
                Arc::clone(&source),
                slot,
                partition.clone(),
                bus.clone(),
                update_tx.clone(),
                settings.clone(),
                cancel.clone(),
            )));
        }
        drop(update_tx);

        tasks.push(tokio::spawn(merge_loop(
            PartitionMerge::new(&pair),
            update_rx,
            view_tx,
            compare,
            cancel.clone(),
        )));

        debug!(current = %pair.current, previous = %pair.previous, "Merged stream started");
        MergedStream {
            pair,
            view: view_rx,
            cancel,
            tasks,
        }
    }
}

async fn merge_loop<T, C>(
    mut state: PartitionMerge<T>,
    mut updates: mpsc::Receiver<FeedUpdate<T>>,
    view: watch::Sender<MergedView<T>>,
    compare: C,
    cancel: CancellationToken,
) where
    T: ringside_core::merge::Keyed + Clone + PartialEq,
    C: Fn(&T, &T) -> Ordering,
{
    loop {
        let update = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            update = updates.recv() => match update {
                Some(update) => update,
                None => break,
            },
        };

        let changed = match update {
            FeedUpdate::Snapshot { slot, items } => state.apply_snapshot(slot, items),
            FeedUpdate::Failed { slot, reason } => {
                let changed = state.mark_stale(slot, reason);
                if changed {
                    warn!(?slot, stale = ?state.stale_partitions(), "Serving last good snapshot for stale partition");
                }
                changed
            }
        };

        if changed && state.is_ready() {
            let next = state.view_by(&compare);
            view.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                *current = next;
                true
            });
        }
    }
}

// =============================================================================
// Merged Stream Handle
// =============================================================================

/// A running merge. Dropping it tears down both partition feeds.
pub struct MergedStream<T> {
    pair: PartitionPair,
    view: watch::Receiver<MergedView<T>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<T: Clone + Send + Sync + 'static> MergedStream<T> {
    pub fn partitions(&self) -> &PartitionPair {
        &self.pair
    }

    pub fn subscribe(&self) -> watch::Receiver<MergedView<T>> {
        self.view.clone()
    }

    /// The merged views as a `Stream`, starting with the current one.
    pub fn updates(&self) -> WatchStream<MergedView<T>> {
        WatchStream::new(self.view.clone())
    }

    pub fn current(&self) -> MergedView<T> {
        self.view.borrow().clone()
    }

    /// Waits for the first publish.
    pub async fn ready(&self) -> SyncResult<MergedView<T>> {
        let mut rx = self.view.clone();
        let view = rx
            .wait_for(|view| view.ready)
            .await
            .map_err(|_| SyncError::ChannelError("merged view channel closed".into()))?;
        Ok(view.clone())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels both feeds and the merge task and waits for them to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(err) = task.await {
                warn!(error = %err, "Merged stream task ended abnormally");
            }
        }
        debug!(current = %self.pair.current, "Merged stream stopped");
    }
}

impl<T> Drop for MergedStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Change;
    use crate::feed::{EventSource, WagerSource};
    use crate::testing;
    use async_trait::async_trait;
    use ringside_core::merge::events_newest_first;
    use ringside_core::{
        CoreError, EntityKind, EventRecord, PartitionKey, PartitionResolver, Side, WagerOrder, WagerRecord,
    };
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
    use std::time::Duration;
    use tokio_stream::StreamExt;

    fn october_pair(kind: EntityKind) -> PartitionPair {
        PartitionResolver::new(480).unwrap().resolve(kind, testing::at(12, 0)).unwrap()
    }

    #[tokio::test]
    async fn test_view_spans_both_partitions_newest_first() {
        let store = testing::store().await;
        let mut late = testing::event("F2", 2);
        late.partition_key = "events_2025_10".to_string();
        let mut early = testing::event("F1", 1);
        early.partition_key = "events_2025_09".to_string();
        store.insert_event(&early).await.unwrap();
        store.insert_event(&late).await.unwrap();

        let root = CancellationToken::new();
        let stream = StreamMerger::spawn(
            Arc::new(EventSource::new(store.clone(), 3)),
            october_pair(EntityKind::Event),
            store.bus(),
            &testing::live_settings(),
            events_newest_first,
            &root,
        );

        let view = stream.ready().await.unwrap();
        let numbers: Vec<i64> = view.items.iter().map(|e| e.event_number).collect();
        assert_eq!(numbers, vec![2, 1]);
        assert!(!view.is_degraded());

        stream.shutdown().await;
        assert_eq!(store.bus().receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_updates_follow_writes() {
        let store = testing::store().await;
        let event = testing::event("F77", 77);
        store.insert_event(&event).await.unwrap();

        let root = CancellationToken::new();
        let order = WagerOrder::Ascending;
        let stream = StreamMerger::spawn(
            Arc::new(WagerSource::new(store.clone(), "teller-9", 3)),
            october_pair(EntityKind::Wager),
            store.bus(),
            &testing::live_settings(),
            move |a: &WagerRecord, b: &WagerRecord| order.compare(a, b),
            &root,
        );
        assert!(stream.ready().await.unwrap().items.is_empty());

        let mut first = testing::wager("2025-10-0001", &event, Side::Meron, 100);
        first.placed_at = testing::at(12, 0);
        let mut second = testing::wager("2025-10-0002", &event, Side::Wala, 200);
        second.placed_at = testing::at(12, 5);
        store.record_placement(&second, &testing::bet_entry(&second)).await.unwrap();
        store.record_placement(&first, &testing::bet_entry(&first)).await.unwrap();

        let mut rx = stream.subscribe();
        let view = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|view| view.items.len() == 2),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        let ids: Vec<&str> = view.items.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["2025-10-0001", "2025-10-0002"]);

        drop(stream);
        root.cancel();
    }

    #[tokio::test]
    async fn test_update_stream_starts_with_current_view() {
        let store = testing::store().await;
        let root = CancellationToken::new();
        let stream = StreamMerger::spawn(
            Arc::new(EventSource::new(store.clone(), 3)),
            october_pair(EntityKind::Event),
            store.bus(),
            &testing::live_settings(),
            events_newest_first,
            &root,
        );
        stream.ready().await.unwrap();

        let mut updates = stream.updates();
        let first = updates.next().await.unwrap();
        assert!(first.ready);
        assert!(first.items.is_empty());

        store.insert_event(&testing::event("F5", 5)).await.unwrap();
        let next = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let view = updates.next().await.unwrap();
                if !view.items.is_empty() {
                    return view;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(next.items[0].event_number, 5);

        stream.shutdown().await;
        root.cancel();
    }

    /// Serves fixed events for one partition and fails the other.
    struct HalfBroken {
        healthy: PartitionKey,
        events: Vec<EventRecord>,
        broken: AtomicBool,
    }

    #[async_trait]
    impl SnapshotSource for HalfBroken {
        type Item = EventRecord;

        async fn load(&self, partition: &PartitionKey) -> SyncResult<Vec<EventRecord>> {
            if *partition == self.healthy || !self.broken.load(AtomicOrdering::SeqCst) {
                return Ok(self.events.iter().filter(|e| e.partition_key == partition.as_str()).cloned().collect());
            }
            Err(CoreError::PartitionUnavailable {
                partition: partition.to_string(),
                reason: "permission revoked".into(),
            }
            .into())
        }

        fn is_relevant(&self, change: &Change, _partition: &PartitionKey) -> bool {
            *change == Change::Config
        }
    }

    #[tokio::test]
    async fn test_failed_partition_is_stale_not_fatal() {
        let store = testing::store().await;
        let pair = october_pair(EntityKind::Event);
        let mut old = testing::event("F1", 1);
        old.partition_key = pair.previous.to_string();
        let new = testing::event("F2", 2);

        let source = Arc::new(HalfBroken {
            healthy: pair.current.clone(),
            events: vec![old, new],
            broken: AtomicBool::new(false),
        });
        let root = CancellationToken::new();
        let stream = StreamMerger::spawn(
            Arc::clone(&source),
            pair.clone(),
            store.bus(),
            &testing::live_settings(),
            events_newest_first,
            &root,
        );
        assert_eq!(stream.ready().await.unwrap().items.len(), 2);

        source.broken.store(true, AtomicOrdering::SeqCst);
        store.bus().publish(Change::Config);

        let mut rx = stream.subscribe();
        let view = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.is_degraded()))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(view.stale, vec![pair.previous.clone()]);
        assert_eq!(view.items.len(), 2, "last good snapshot is still served");

        source.broken.store(false, AtomicOrdering::SeqCst);
        let view = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| !v.is_degraded()))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(view.items.len(), 2);

        root.cancel();
        assert!(stream.is_cancelled());
        stream.shutdown().await;
    }

    #[tokio::test]
    async fn test_drop_releases_bus_subscriptions() {
        let store = testing::store().await;
        let root = CancellationToken::new();
        let stream = StreamMerger::spawn(
            Arc::new(EventSource::new(store.clone(), 3)),
            october_pair(EntityKind::Event),
            store.bus(),
            &testing::live_settings(),
            events_newest_first,
            &root,
        );
        stream.ready().await.unwrap();
        assert_eq!(store.bus().receiver_count(), 2);

        drop(stream);
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.bus().receiver_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
