//! # Live Store
//!
//! The database plus the change bus. Writes made through here are
//! announced so every open view reloads the scope they touched; reads go
//! straight to the repositories via [`LiveStore::db`].

use chrono::{DateTime, Utc};
use ringside_core::odds::OddsQuote;
use ringside_core::{EventRecord, LedgerEntry, LiveConfig, Odds, Outcome, WagerRecord};
use ringside_db::{ClaimOutcome, Database, DbResult, WagerKey};

use crate::bus::{Change, ChangeBus};

#[derive(Debug, Clone)]
pub struct LiveStore {
    db: Database,
    bus: ChangeBus,
}

impl LiveStore {
    pub fn new(db: Database) -> Self {
        Self::with_bus(db, ChangeBus::default())
    }

    pub fn with_bus(db: Database, bus: ChangeBus) -> Self {
        LiveStore { db, bus }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    // =========================================================================
    // Operator writes
    // =========================================================================

    pub async fn put_config(&self, config: &LiveConfig, at: DateTime<Utc>) -> DbResult<()> {
        self.db.live_config().put(config, at).await?;
        self.bus.publish(Change::Config);
        Ok(())
    }

    pub async fn insert_event(&self, event: &EventRecord) -> DbResult<()> {
        self.db.events().insert(event).await?;
        self.publish_events(&event.partition_key);
        Ok(())
    }

    pub async fn set_draw_terms(&self, partition: &str, id: &str, draw_odds: Odds, draw_multiplier: Odds) -> DbResult<()> {
        self.db.events().set_draw_terms(partition, id, draw_odds, draw_multiplier).await?;
        self.publish_events(partition);
        Ok(())
    }

    pub async fn close_event(&self, partition: &str, id: &str) -> DbResult<()> {
        self.db.events().close(partition, id).await?;
        self.publish_events(partition);
        Ok(())
    }

    pub async fn resolve_event(&self, partition: &str, id: &str, outcome: Outcome) -> DbResult<()> {
        self.db.events().resolve(partition, id, outcome).await?;
        self.publish_events(partition);
        Ok(())
    }

    // =========================================================================
    // Terminal writes
    // =========================================================================

    /// Writes odds; announces only when something actually changed.
    pub async fn apply_quote(&self, partition: &str, id: &str, quote: &OddsQuote) -> DbResult<bool> {
        let changed = self.db.events().apply_quote(partition, id, quote).await?;
        if changed {
            self.publish_events(partition);
        }
        Ok(changed)
    }

    pub async fn record_placement(&self, wager: &WagerRecord, entry: &LedgerEntry) -> DbResult<()> {
        self.db.wagers().record_placement(wager, entry).await?;
        self.publish_events(&wager.event_partition);
        self.bus.publish(Change::Wagers {
            teller_id: wager.teller_id.clone(),
            partition: wager.partition_key.clone(),
        });
        self.bus.publish(Change::Ledger {
            teller_id: entry.teller_id.clone(),
        });
        Ok(())
    }

    pub async fn claim(&self, key: &WagerKey, at: DateTime<Utc>) -> DbResult<ClaimOutcome> {
        let outcome = self.db.wagers().claim(key, at).await?;
        if matches!(outcome, ClaimOutcome::Claimed { .. }) {
            self.bus.publish(Change::Wagers {
                teller_id: key.teller_id.clone(),
                partition: key.partition_key.clone(),
            });
        }
        Ok(outcome)
    }

    pub async fn append_ledger(&self, entry: &LedgerEntry) -> DbResult<()> {
        self.db.ledger().append(entry).await?;
        self.bus.publish(Change::Ledger {
            teller_id: entry.teller_id.clone(),
        });
        Ok(())
    }

    fn publish_events(&self, partition: &str) {
        self.bus.publish(Change::Events {
            partition: partition.to_string(),
        });
    }
}
