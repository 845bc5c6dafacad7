//! # Wager Desk
//!
//! Takes a bet at the counter.
//!
//! ## Placement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place(config, event, WALA, P500)                                      │
//! │                                                                         │
//! │  1. validate stake            P0 / negative / over limit → Validation   │
//! │  2. event open & pending?     no → EventClosed                          │
//! │  3. side open?                no → SideClosed (DRAW follows the event)  │
//! │  4. allocate id               counter, or flagged fallback              │
//! │  5. encode QR payload         before anything is written                │
//! │  6. one transaction:          pool += stake, insert wager, bet ledger   │
//! │  7. BET RECEIPT print job                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, DurationRound, Utc};
use ringside_core::print::PrintJob;
use ringside_core::receipt::ReceiptCodec;
use ringside_core::validation::validate_stake;
use ringside_core::{
    CoreError, EntityKind, EventRecord, LedgerEntry, LedgerKind, LiveConfig, Money, PartitionResolver, Receipt,
    Side, TellerIdentity, WagerRecord,
};
use ringside_db::DbError;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocator::CounterAllocator;
use crate::error::{SyncError, SyncResult};
use crate::store::LiveStore;

/// A placed wager and what to hand the bettor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub wager: WagerRecord,
    pub qr_payload: String,
    /// The id came from the fallback path and may collide.
    pub degraded: bool,
    pub print_job: PrintJob,
}

#[derive(Debug, Clone)]
pub struct WagerDesk {
    store: LiveStore,
    allocator: CounterAllocator,
    resolver: PartitionResolver,
    teller: TellerIdentity,
}

impl WagerDesk {
    pub fn new(store: LiveStore, resolver: PartitionResolver, teller: TellerIdentity) -> Self {
        let allocator = CounterAllocator::new(store.db().counters(), resolver);
        WagerDesk {
            store,
            allocator,
            resolver,
            teller,
        }
    }

    pub fn teller(&self) -> &TellerIdentity {
        &self.teller
    }

    pub async fn place(&self, config: &LiveConfig, event: &EventRecord, side: Side, amount: Money) -> SyncResult<Placement> {
        self.place_at(config, event, side, amount, Utc::now()).await
    }

    /// Places a wager stamped `at`, cut to whole milliseconds so the stored
    /// wager and its receipt carry the same instant.
    pub async fn place_at(
        &self,
        config: &LiveConfig,
        event: &EventRecord,
        side: Side,
        amount: Money,
        at: DateTime<Utc>,
    ) -> SyncResult<Placement> {
        validate_stake(amount)?;
        let at = at
            .duration_trunc(Duration::milliseconds(1))
            .map_err(|err| CoreError::InvalidTimestamp(format!("{at}: {err}")))?;
        if !event.is_accepting_wagers() {
            return Err(CoreError::EventClosed(event.event_number).into());
        }
        if !config.is_side_open(side) {
            return Err(CoreError::SideClosed(side).into());
        }

        let allocated = self.allocator.allocate(EntityKind::Wager, at).await?;
        let partition = self.resolver.current(EntityKind::Wager, at)?;

        let wager = WagerRecord {
            id: allocated.id,
            partition_key: partition.to_string(),
            teller_id: self.teller.id.clone(),
            teller_name: self.teller.name.clone(),
            event_id: event.id.clone(),
            event_partition: event.partition_key.clone(),
            event_number: event.event_number,
            session_number: event.session_number,
            side,
            amount,
            placed_at: at,
            payout_claimed: false,
            payout_claimed_at: None,
        };
        let qr_payload = ReceiptCodec::encode(&Receipt::for_wager(&wager))?;

        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            teller_id: self.teller.id.clone(),
            kind: LedgerKind::Bet,
            amount,
            recorded_at: at,
            wager_id: Some(wager.id.clone()),
            event_number: Some(event.event_number),
            side: Some(side),
            reason: format!("Bet placed on {} - Fight #{}", side, event.event_number),
        };

        self.store
            .record_placement(&wager, &entry)
            .await
            .map_err(|err| match err {
                DbError::NotFound { .. } => SyncError::Core(CoreError::EventClosed(event.event_number)),
                other => SyncError::Database(other),
            })?;

        if allocated.degraded {
            warn!(wager_id = %wager.id, "Wager placed under a fallback identifier");
        }
        info!(
            wager_id = %wager.id,
            event = event.event_number,
            side = %side,
            amount = %amount,
            teller = %self.teller.id,
            "Wager placed"
        );

        let print_job = PrintJob::bet_receipt(&wager, qr_payload.clone(), self.resolver.offset());
        Ok(Placement {
            wager,
            qr_payload,
            degraded: allocated.degraded,
            print_job,
        })
    }
}
