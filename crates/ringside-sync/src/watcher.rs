//! # Config Watcher
//!
//! Keeps the latest administrative live config in a `watch` channel.
//! Subscribers are only woken when the config actually changed.

use ringside_core::LiveConfig;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::Change;
use crate::store::LiveStore;

pub struct ConfigWatcher {
    rx: watch::Receiver<Option<LiveConfig>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Starts watching. The first load happens immediately; after that the
    /// config is reloaded on every config change and every `refresh`.
    pub fn spawn(store: LiveStore, refresh: Duration, parent: &CancellationToken) -> Self {
        let cancel = parent.child_token();
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(watch_loop(store, refresh, tx, cancel.clone()));
        ConfigWatcher {
            rx,
            cancel,
            task: Some(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LiveConfig>> {
        self.rx.clone()
    }

    pub fn current(&self) -> Option<LiveConfig> {
        self.rx.borrow().clone()
    }

    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "Config watcher ended abnormally");
            }
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn watch_loop(
    store: LiveStore,
    refresh: Duration,
    tx: watch::Sender<Option<LiveConfig>>,
    cancel: CancellationToken,
) {
    let mut changes = store.bus().subscribe();
    let mut ticker = interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            received = changes.recv() => match received {
                Ok(Change::Config) | Err(RecvError::Lagged(_)) => {}
                Ok(_) => continue,
                Err(RecvError::Closed) => break,
            },
        }

        match store.db().live_config().get().await {
            Ok(next) => {
                let changed = tx.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    *current = next.clone();
                    true
                });
                if changed {
                    if let Some(config) = &next {
                        info!(
                            event = config.current_event_number,
                            session = config.current_session_number,
                            commission_bps = config.commission_rate.bps(),
                            meron_open = config.meron_open,
                            wala_open = config.wala_open,
                            "Live config updated"
                        );
                    }
                }
            }
            // Keep serving the last config we saw.
            Err(err) => warn!(error = %err, "Failed to reload live config"),
        }
    }

    debug!("Config watcher stopped");
}
