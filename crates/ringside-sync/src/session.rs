//! # Terminal Session
//!
//! Everything one logged-in teller terminal keeps running, owned by one
//! object. Dropping or shutting down the session stops all of it.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TerminalSession                                                        │
//! │  └── root CancellationToken                                             │
//! │      ├── ConfigWatcher                                                  │
//! │      └── supervisor task                                                │
//! │          └── generation token (one at a time)                           │
//! │              ├── MergedStream<EventRecord>  (2 feeds + merge)           │
//! │              ├── MergedStream<WagerRecord>  (2 feeds + merge)           │
//! │              ├── OddsReactor                                            │
//! │              └── 2 forwarders into the session's stable views           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Generations
//! A generation is keyed by session number, event number and the two
//! partition pairs. When the live config moves to another event or
//! session, or the local month rolls over (checked every refresh tick),
//! the old generation is cancelled and joined before the next one starts.
//! Views handed out by [`TerminalSession::events`] survive the switch;
//! they go back to not-ready until the new generation has reported.

use chrono::{DateTime, Utc};
use ringside_core::merge::{events_newest_first, MergedView};
use ringside_core::report::{WagerFilter, WagerLine};
use ringside_core::{
    CoreResult, EntityKind, EventRecord, LiveConfig, Money, PartitionPair, PartitionResolver, Side,
    TellerIdentity, WagerOrder, WagerRecord,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{LiveSettings, TerminalConfig};
use crate::desk::{Placement, WagerDesk};
use crate::error::{SyncError, SyncResult};
use crate::feed::{EventSource, WagerSource};
use crate::guard::{Redemption, SettlementGuard};
use crate::ledger::TellerLedger;
use crate::merger::{MergedStream, StreamMerger};
use crate::odds::OddsReactor;
use crate::store::LiveStore;
use crate::watcher::ConfigWatcher;

// =============================================================================
// Generation Key
// =============================================================================

/// What a set of subscriptions was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationKey {
    pub session_number: i64,
    pub event_number: i64,
    pub events: PartitionPair,
    pub wagers: PartitionPair,
}

impl GenerationKey {
    pub fn new(config: &LiveConfig, resolver: &PartitionResolver, at: DateTime<Utc>) -> CoreResult<Self> {
        Ok(GenerationKey {
            session_number: config.current_session_number,
            event_number: config.current_event_number,
            events: resolver.resolve(EntityKind::Event, at)?,
            wagers: resolver.resolve(EntityKind::Wager, at)?,
        })
    }
}

type ViewSender<T> = Arc<watch::Sender<MergedView<T>>>;

struct Generation {
    key: GenerationKey,
    cancel: CancellationToken,
    events: MergedStream<EventRecord>,
    wagers: MergedStream<WagerRecord>,
    tasks: Vec<JoinHandle<()>>,
}

impl Generation {
    async fn shutdown(self) {
        self.cancel.cancel();
        self.events.shutdown().await;
        self.wagers.shutdown().await;
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Session task ended abnormally");
            }
        }
        debug!(session = self.key.session_number, event = self.key.event_number, "Generation stopped");
    }
}

/// Copies one generation's view into the session's long-lived channel.
fn forward<T>(mut from: WatchStream<MergedView<T>>, to: ViewSender<T>, cancel: CancellationToken) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                view = from.next() => match view {
                    Some(view) => {
                        to.send_replace(view);
                    }
                    None => break,
                },
            }
        }
    })
}

// =============================================================================
// Supervisor
// =============================================================================

struct Supervisor {
    store: LiveStore,
    resolver: PartitionResolver,
    teller_id: String,
    settings: LiveSettings,
    order: WagerOrder,
    events_tx: ViewSender<EventRecord>,
    wagers_tx: ViewSender<WagerRecord>,
    generation_tx: watch::Sender<u64>,
    root: CancellationToken,
}

impl Supervisor {
    async fn run(self, mut config_rx: watch::Receiver<Option<LiveConfig>>) {
        let refresh = self.settings.refresh_interval();
        let mut ticker = interval_at(Instant::now() + refresh, refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut current: Option<Generation> = None;

        loop {
            let config = config_rx.borrow_and_update().clone();
            let wanted = match config {
                None => None,
                Some(config) => match GenerationKey::new(&config, &self.resolver, Utc::now()) {
                    Ok(key) => Some(key),
                    Err(err) => {
                        warn!(error = %err, "Cannot resolve partitions, keeping current subscriptions");
                        current.as_ref().map(|g| g.key.clone())
                    }
                },
            };

            if current.as_ref().map(|g| &g.key) != wanted.as_ref() {
                if let Some(old) = current.take() {
                    info!(
                        session = old.key.session_number,
                        event = old.key.event_number,
                        "Tearing down session subscriptions"
                    );
                    old.shutdown().await;
                }
                current = wanted.map(|key| self.start(key, &config_rx));
            }

            tokio::select! {
                biased;
                _ = self.root.cancelled() => break,
                changed = config_rx.changed() => if changed.is_err() { break },
                _ = ticker.tick() => {}
            }
        }

        if let Some(generation) = current.take() {
            generation.shutdown().await;
        }
        debug!("Session supervisor stopped");
    }

    fn start(&self, key: GenerationKey, config_rx: &watch::Receiver<Option<LiveConfig>>) -> Generation {
        let cancel = self.root.child_token();
        self.events_tx.send_replace(MergedView::default());
        self.wagers_tx.send_replace(MergedView::default());

        let events = StreamMerger::spawn(
            Arc::new(EventSource::new(self.store.clone(), key.session_number)),
            key.events.clone(),
            self.store.bus(),
            &self.settings,
            events_newest_first,
            &cancel,
        );
        let order = self.order;
        let wagers = StreamMerger::spawn(
            Arc::new(WagerSource::new(self.store.clone(), self.teller_id.clone(), key.session_number)),
            key.wagers.clone(),
            self.store.bus(),
            &self.settings,
            move |a: &WagerRecord, b: &WagerRecord| order.compare(a, b),
            &cancel,
        );

        let tasks = vec![
            forward(events.updates(), Arc::clone(&self.events_tx), cancel.clone()),
            forward(wagers.updates(), Arc::clone(&self.wagers_tx), cancel.clone()),
            OddsReactor::spawn(self.store.clone(), config_rx.clone(), events.subscribe(), cancel.clone()),
        ];

        self.generation_tx.send_modify(|n| *n += 1);
        info!(
            session = key.session_number,
            event = key.event_number,
            events = %key.events.current,
            wagers = %key.wagers.current,
            "Session subscriptions started"
        );

        Generation {
            key,
            cancel,
            events,
            wagers,
            tasks,
        }
    }
}

// =============================================================================
// Terminal Session
// =============================================================================

pub struct TerminalSession {
    store: LiveStore,
    teller: TellerIdentity,
    desk: WagerDesk,
    guard: SettlementGuard,
    ledger: TellerLedger,
    watcher: Option<ConfigWatcher>,
    config_rx: watch::Receiver<Option<LiveConfig>>,
    events_rx: watch::Receiver<MergedView<EventRecord>>,
    wagers_rx: watch::Receiver<MergedView<WagerRecord>>,
    generation_rx: watch::Receiver<u64>,
    root: CancellationToken,
    supervisor: Option<JoinHandle<()>>,
}

impl TerminalSession {
    /// Starts watching the live config and, once it arrives, the event and
    /// wager partitions it points at. Must be called inside a Tokio runtime.
    pub fn start(store: LiveStore, config: &TerminalConfig) -> SyncResult<Self> {
        config.validate()?;
        let resolver = config.resolver()?;
        let teller = config.teller_identity();
        let root = CancellationToken::new();

        let watcher = ConfigWatcher::spawn(store.clone(), config.live.refresh_interval(), &root);
        let config_rx = watcher.subscribe();
        let (events_tx, events_rx) = watch::channel(MergedView::default());
        let (wagers_tx, wagers_rx) = watch::channel(MergedView::default());
        let (generation_tx, generation_rx) = watch::channel(0);

        let supervisor = Supervisor {
            store: store.clone(),
            resolver,
            teller_id: teller.id.clone(),
            settings: config.live.clone(),
            order: config.live.wager_order,
            events_tx: Arc::new(events_tx),
            wagers_tx: Arc::new(wagers_tx),
            generation_tx,
            root: root.clone(),
        };
        let supervisor = tokio::spawn(supervisor.run(config_rx.clone()));

        info!(teller = %teller.id, "Terminal session started");
        Ok(TerminalSession {
            desk: WagerDesk::new(store.clone(), resolver, teller.clone()),
            guard: SettlementGuard::new(store.clone(), resolver, teller.clone()),
            ledger: TellerLedger::new(store.clone(), resolver, teller.id.clone()),
            store,
            teller,
            watcher: Some(watcher),
            config_rx,
            events_rx,
            wagers_rx,
            generation_rx,
            root,
            supervisor: Some(supervisor),
        })
    }

    pub fn teller(&self) -> &TellerIdentity {
        &self.teller
    }

    pub fn store(&self) -> &LiveStore {
        &self.store
    }

    pub fn desk(&self) -> &WagerDesk {
        &self.desk
    }

    pub fn guard(&self) -> &SettlementGuard {
        &self.guard
    }

    pub fn ledger(&self) -> &TellerLedger {
        &self.ledger
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn live_config(&self) -> Option<LiveConfig> {
        self.config_rx.borrow().clone()
    }

    pub fn config_updates(&self) -> watch::Receiver<Option<LiveConfig>> {
        self.config_rx.clone()
    }

    /// Events of the current session, highest event number first.
    pub fn events(&self) -> watch::Receiver<MergedView<EventRecord>> {
        self.events_rx.clone()
    }

    /// This teller's wagers of the current session.
    pub fn wagers(&self) -> watch::Receiver<MergedView<WagerRecord>> {
        self.wagers_rx.clone()
    }

    /// How many subscription generations have been started so far.
    pub fn generations(&self) -> u64 {
        *self.generation_rx.borrow()
    }

    /// The event the live config points at, if this terminal can see it.
    pub fn active_event(&self) -> Option<EventRecord> {
        let config = self.live_config()?;
        self.active_event_for(&config)
    }

    fn active_event_for(&self, config: &LiveConfig) -> Option<EventRecord> {
        self.events_rx.borrow().items.iter().find(|e| config.is_active(e)).cloned()
    }

    /// Wagers matching `filter`, in the configured order, with their
    /// event's current state.
    pub fn wager_lines(&self, filter: &WagerFilter) -> Vec<WagerLine> {
        let events = self.events_rx.borrow().items.clone();
        let wagers = self.wagers_rx.borrow().items.clone();
        filter.apply(&wagers, &events)
    }

    /// Waits until the live config has arrived and both views are ready.
    pub async fn wait_ready(&self) -> SyncResult<()> {
        let closed = |_| SyncError::ChannelError("session channel closed".into());
        self.config_rx.clone().wait_for(Option::is_some).await.map_err(closed)?;
        self.events_rx.clone().wait_for(|v| v.ready).await.map_err(closed)?;
        self.wagers_rx.clone().wait_for(|v| v.ready).await.map_err(closed)?;
        Ok(())
    }

    // =========================================================================
    // Teller Operations
    // =========================================================================

    /// Places a wager on the active event.
    pub async fn place(&self, side: Side, amount: Money) -> SyncResult<Placement> {
        if self.root.is_cancelled() {
            return Err(SyncError::ShuttingDown);
        }
        let config = self.live_config().ok_or(SyncError::NotConfigured)?;
        let event = self
            .active_event_for(&config)
            .ok_or(SyncError::NoActiveEvent(config.current_event_number))?;
        self.desk.place(&config, &event, side, amount).await
    }

    /// Redeems a scanned receipt against this teller's drawer.
    pub async fn redeem(&self, payload: &str) -> SyncResult<Redemption> {
        if self.root.is_cancelled() {
            return Err(SyncError::ShuttingDown);
        }
        let balance = self.ledger.balance(Utc::now()).await?;
        self.guard.redeem(payload, balance).await
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Cancels every subscription and waits for all tasks to exit.
    pub async fn shutdown(mut self) {
        self.root.cancel();
        if let Some(supervisor) = self.supervisor.take() {
            if let Err(err) = supervisor.await {
                warn!(error = %err, "Session supervisor ended abnormally");
            }
        }
        if let Some(watcher) = self.watcher.take() {
            watcher.shutdown().await;
        }
        info!(teller = %self.teller.id, "Terminal session stopped");
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
