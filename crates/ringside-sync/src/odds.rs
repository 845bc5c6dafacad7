//! # Odds Reactor
//!
//! Re-prices events whenever their pools or the commission rate change.
//!
//! ```text
//!   config watch ──┐
//!                  ├──► reprice(events, rate) ──► apply_quote (only if different)
//!   events view  ──┘                                   │
//!        ▲                                             ▼
//!        └──────────── Change::Events ◄──────── LiveStore
//! ```
//!
//! The write-back changes the events view, which wakes the reactor again;
//! the second pass finds every quote already applied and writes nothing.

use ringside_core::merge::MergedView;
use ringside_core::odds::OddsEngine;
use ringside_core::{CommissionRate, EventRecord, LiveConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::store::LiveStore;

/// Writes fresh odds for every unresolved event in `events`. Returns how
/// many events were actually updated.
pub async fn reprice(store: &LiveStore, events: &[EventRecord], rate: CommissionRate) -> SyncResult<usize> {
    let mut updated = 0;
    for event in events.iter().filter(|e| !e.outcome.is_resolved()) {
        let quote = OddsEngine::quote_event(event, rate);
        if quote.is_applied_to(event) {
            continue;
        }
        if store.apply_quote(&event.partition_key, &event.id, &quote).await? {
            debug!(
                event = event.event_number,
                meron_odds = %quote.meron_odds,
                wala_odds = %quote.wala_odds,
                commission = %quote.commission_collected,
                "Odds updated"
            );
            updated += 1;
        }
    }
    Ok(updated)
}

pub struct OddsReactor;

impl OddsReactor {
    pub fn spawn(
        store: LiveStore,
        mut config: watch::Receiver<Option<LiveConfig>>,
        mut events: watch::Receiver<MergedView<EventRecord>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let rate = config.borrow_and_update().as_ref().map(|c| c.commission_rate);
                let view = events.borrow_and_update().clone();
                if let Some(rate) = rate {
                    if view.ready {
                        if let Err(err) = reprice(&store, &view.items, rate).await {
                            warn!(error = %err, "Failed to write odds");
                        }
                    }
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    changed = config.changed() => if changed.is_err() { break },
                    changed = events.changed() => if changed.is_err() { break },
                }
            }
            debug!("Odds reactor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use ringside_core::{Money, Odds, Outcome, Side};

    #[tokio::test]
    async fn test_reprice_writes_two_sided_odds_and_commission() {
        let store = testing::store().await;
        let mut event = testing::event("F77", 77);
        event.wala_pool = Money::from_pesos(1000);
        event.draw_pool = Money::from_pesos(100);
        store.insert_event(&event).await.unwrap();

        let rate = CommissionRate::from_bps(1000);
        assert_eq!(reprice(&store, &[event.clone()], rate).await.unwrap(), 1);

        let stored = store.db().events().get("events_2025_10", "F77").await.unwrap().unwrap();
        assert_eq!(stored.meron_odds, Odds::zero());
        assert_eq!(stored.wala_odds, Odds::from_bps(19_000));
        assert_eq!(stored.commission_collected, Money::from_pesos(110));
        assert_eq!(stored.draw_odds, event.draw_odds, "draw terms are operator-owned");

        // Recomputing from identical inputs writes nothing.
        assert_eq!(reprice(&store, &[stored], rate).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resolved_events_are_left_alone() {
        let store = testing::store().await;
        let mut event = testing::event("F77", 77);
        event.meron_pool = Money::from_pesos(500);
        store.insert_event(&event).await.unwrap();
        store.resolve_event("events_2025_10", "F77", Outcome::Meron).await.unwrap();
        let resolved = store.db().events().get("events_2025_10", "F77").await.unwrap().unwrap();

        assert_eq!(reprice(&store, &[resolved], CommissionRate::from_bps(1000)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reactor_follows_placements() {
        let store = testing::store().await;
        let event = testing::event("F77", 77);
        store.insert_event(&event).await.unwrap();

        let (_config_tx, config_rx) = watch::channel(Some(testing::config()));
        let (events_tx, events_rx) = watch::channel(MergedView::default());
        let cancel = CancellationToken::new();
        let task = OddsReactor::spawn(store.clone(), config_rx, events_rx, cancel.clone());

        let wager = testing::wager("2025-10-0001", &event, Side::Meron, 500);
        store.record_placement(&wager, &testing::bet_entry(&wager)).await.unwrap();
        let placed = store.db().events().get("events_2025_10", "F77").await.unwrap().unwrap();

        let mut rx = store.bus().subscribe();
        events_tx.send_replace(MergedView {
            items: vec![placed],
            ready: true,
            stale: vec![],
        });
        rx.recv().await.unwrap();

        let stored = store.db().events().get("events_2025_10", "F77").await.unwrap().unwrap();
        assert_eq!(stored.meron_odds, Odds::from_bps(19_000));
        assert_eq!(stored.commission_collected, Money::from_pesos(50));

        cancel.cancel();
        task.await.unwrap();
    }
}
