//! # Settlement Guard
//!
//! Redeems a scanned bet receipt exactly once.
//!
//! ## Redemption Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decode payload                 → MalformedReceipt                      │
//! │  load wager (receipt teller,                                            │
//! │    month of placed_at, then the                                         │
//! │    neighbouring months)         → WagerNotFound                         │
//! │  already claimed?               → AlreadyClaimed { claimed_at }         │
//! │  receipt matches wager?         → MalformedReceipt                      │
//! │  load event                     → EventNotFound                         │
//! │  assess                         PENDING / LOST → payout 0, no writes    │
//! │  float covers payout?           → InsufficientBalance, no writes        │
//! │  conditional claim              lost the race → AlreadyClaimed          │
//! │  ─────────── claim is durable; nothing below can undo it ───────────   │
//! │  CASH_OUT ledger entry          failure is logged only                  │
//! │  PAYOUT RECEIPT print job                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use ringside_core::balance::BalanceGate;
use ringside_core::print::PrintJob;
use ringside_core::receipt::ReceiptCodec;
use ringside_core::settlement::{Assessment, Settlement, SettlementStatus};
use ringside_core::{
    CoreError, EntityKind, LedgerEntry, LedgerKind, Money, PartitionKey, PartitionResolver, Receipt,
    TellerIdentity, WagerRecord,
};
use ringside_db::{ClaimOutcome, WagerKey};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SyncResult;
use crate::store::LiveStore;

/// Widest gap between two terminals' UTC offsets.
const MAX_OFFSET_SPREAD_HOURS: i64 = 48;

/// Result of a redemption that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redemption {
    pub assessment: Assessment,
    /// The wager as stored after this call.
    pub wager: WagerRecord,
    /// Set only when this call claimed the payout.
    pub print_job: Option<PrintJob>,
}

impl Redemption {
    pub fn status(&self) -> SettlementStatus {
        self.assessment.status
    }

    pub fn payout(&self) -> Money {
        self.assessment.payout
    }
}

#[derive(Debug, Clone)]
pub struct SettlementGuard {
    store: LiveStore,
    resolver: PartitionResolver,
    /// The teller paying out; the CASH_OUT leaves this drawer.
    teller: TellerIdentity,
}

impl SettlementGuard {
    pub fn new(store: LiveStore, resolver: PartitionResolver, teller: TellerIdentity) -> Self {
        SettlementGuard {
            store,
            resolver,
            teller,
        }
    }

    /// Redeems a scanned QR payload against the paying teller's `balance`.
    pub async fn redeem(&self, payload: &str, balance: Money) -> SyncResult<Redemption> {
        let receipt = ReceiptCodec::decode(payload)?;
        self.redeem_receipt(&receipt, balance, Utc::now()).await
    }

    pub async fn redeem_receipt(&self, receipt: &Receipt, balance: Money, at: DateTime<Utc>) -> SyncResult<Redemption> {
        let (key, wager) = self.find_wager(receipt).await?;

        Settlement::ensure_unclaimed(&wager)?;
        Settlement::ensure_matches(receipt, &wager)?;

        let event_partition = PartitionKey::parse(&receipt.partition_key).map_err(|err| CoreError::MalformedReceipt {
            reason: err.to_string(),
        })?;
        let event = self
            .store
            .db()
            .events()
            .get(event_partition.as_str(), &receipt.event_id)
            .await?
            .ok_or_else(|| CoreError::EventNotFound(receipt.event_id.clone()))?;

        let assessment = Settlement::assess(&wager, &event);
        if assessment.status != SettlementStatus::Won {
            info!(
                wager_id = %wager.id,
                status = ?assessment.status,
                outcome = %assessment.outcome,
                "Receipt checked, nothing to pay"
            );
            return Ok(Redemption {
                assessment,
                wager,
                print_job: None,
            });
        }

        BalanceGate::check(balance, assessment.payout)?;

        let claimed_at = match self.store.claim(&key, at).await? {
            ClaimOutcome::Claimed { claimed_at } => claimed_at,
            ClaimOutcome::AlreadyClaimed { claimed_at } => {
                return Err(CoreError::AlreadyClaimed {
                    wager_id: wager.id,
                    claimed_at,
                }
                .into())
            }
            ClaimOutcome::NotFound => return Err(CoreError::WagerNotFound(wager.id).into()),
        };
        info!(
            wager_id = %wager.id,
            payout = %assessment.payout,
            teller = %self.teller.id,
            "Payout claimed"
        );

        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            teller_id: self.teller.id.clone(),
            kind: LedgerKind::CashOut,
            amount: assessment.payout,
            recorded_at: claimed_at,
            wager_id: Some(wager.id.clone()),
            event_number: Some(wager.event_number),
            side: Some(wager.side),
            reason: format!("Payout for {} - Fight #{}", wager.id, wager.event_number),
        };
        if let Err(err) = self.store.append_ledger(&entry).await {
            warn!(wager_id = %wager.id, error = %err, "Payout claimed but CASH_OUT entry was not recorded");
        }

        let wager = WagerRecord {
            payout_claimed: true,
            payout_claimed_at: Some(claimed_at),
            ..wager
        };
        let print_job = PrintJob::payout_receipt(&wager, &assessment, self.resolver.offset());
        Ok(Redemption {
            assessment,
            wager,
            print_job: Some(print_job),
        })
    }

    /// Loads the wager a receipt points at.
    ///
    /// The placing terminal picked the partition in its own offset, which
    /// can put `placed_at` in the month before or after ours.
    async fn find_wager(&self, receipt: &Receipt) -> SyncResult<(WagerKey, WagerRecord)> {
        let pair = self.resolver.resolve(EntityKind::Wager, receipt.placed_at)?;
        let next = receipt
            .placed_at
            .checked_add_signed(Duration::hours(MAX_OFFSET_SPREAD_HOURS))
            .and_then(|later| self.resolver.current(EntityKind::Wager, later).ok());
        let mut candidates = vec![pair.current];
        for key in std::iter::once(pair.previous).chain(next) {
            if !candidates.contains(&key) {
                candidates.push(key);
            }
        }

        let wagers = self.store.db().wagers();
        for partition in candidates {
            let key = WagerKey {
                teller_id: receipt.teller_id.clone(),
                partition_key: partition.to_string(),
                wager_id: receipt.wager_id.clone(),
            };
            if let Some(wager) = wagers.get(&key).await? {
                return Ok((key, wager));
            }
        }
        Err(CoreError::WagerNotFound(receipt.wager_id.clone()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::testing;
    use chrono::TimeZone;
    use ringside_core::{Odds, Outcome, Side};

    struct Fixture {
        guard: SettlementGuard,
        store: LiveStore,
        payload: String,
    }

    /// P500 on MERON at 1.90, with the event resolved to `outcome`.
    async fn fixture(outcome: Outcome) -> Fixture {
        let store = testing::store().await;
        let mut event = testing::event("F77", 77);
        event.meron_pool = Money::from_pesos(500);
        event.meron_odds = Odds::from_bps(19_000);
        store.insert_event(&event).await.unwrap();
        if outcome.is_resolved() {
            store.resolve_event("events_2025_10", "F77", outcome).await.unwrap();
        }

        let wager = testing::wager("2025-10-0001", &event, Side::Meron, 500);
        store.db().wagers().insert(&wager).await.unwrap();
        let payload = ReceiptCodec::encode(&Receipt::for_wager(&wager)).unwrap();

        let guard = SettlementGuard::new(store.clone(), PartitionResolver::new(480).unwrap(), testing::teller());
        Fixture { guard, store, payload }
    }

    async fn stored_wager(store: &LiveStore) -> WagerRecord {
        let key = WagerKey {
            teller_id: "teller-9".into(),
            partition_key: "wagers_2025_10".into(),
            wager_id: "2025-10-0001".into(),
        };
        store.db().wagers().get(&key).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_winning_receipt_pays_once() {
        let f = fixture(Outcome::Meron).await;

        let first = f.guard.redeem(&f.payload, Money::from_pesos(1000)).await.unwrap();
        assert_eq!(first.status(), SettlementStatus::Won);
        assert_eq!(first.payout(), Money::from_pesos(950));
        let job = first.print_job.unwrap();
        assert_eq!(job.title, "PAYOUT RECEIPT");
        assert!(job.lines.contains(&"PAYOUT: P950".to_string()));

        let claimed_at = stored_wager(&f.store).await.payout_claimed_at;
        assert!(claimed_at.is_some());

        let err = f.guard.redeem(&f.payload, Money::from_pesos(1000)).await.unwrap_err();
        match err {
            SyncError::Core(CoreError::AlreadyClaimed { claimed_at: at, .. }) => assert_eq!(at, claimed_at),
            other => panic!("expected AlreadyClaimed, got {other:?}"),
        }

        let wager = stored_wager(&f.store).await;
        assert!(wager.payout_claimed);
        assert_eq!(wager.payout_claimed_at, claimed_at, "claim time never moves");

        let entries = f
            .store
            .db()
            .ledger()
            .list_between("teller-9", testing::at(0, 0), Utc::now() + chrono::Duration::days(1))
            .await
            .unwrap();
        let payouts: Vec<&LedgerEntry> = entries.iter().filter(|e| e.kind == LedgerKind::CashOut).collect();
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].amount, Money::from_pesos(950));
    }

    #[tokio::test]
    async fn test_short_float_refuses_without_claiming() {
        let f = fixture(Outcome::Meron).await;

        let err = f.guard.redeem(&f.payload, Money::from_pesos(900)).await.unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::InsufficientBalance { .. })));
        assert!(!stored_wager(&f.store).await.payout_claimed);

        // Topped up, the same receipt goes through.
        let paid = f.guard.redeem(&f.payload, Money::from_pesos(1000)).await.unwrap();
        assert_eq!(paid.payout(), Money::from_pesos(950));
    }

    #[tokio::test]
    async fn test_pending_event_pays_nothing_and_changes_nothing() {
        let f = fixture(Outcome::Pending).await;
        let before = stored_wager(&f.store).await;

        let result = f.guard.redeem(&f.payload, Money::from_pesos(1000)).await.unwrap();
        assert_eq!(result.status(), SettlementStatus::Pending);
        assert_eq!(result.payout(), Money::zero());
        assert!(result.print_job.is_none());
        assert_eq!(stored_wager(&f.store).await, before);
    }

    #[tokio::test]
    async fn test_losing_receipt_is_not_claimed() {
        let f = fixture(Outcome::Wala).await;
        let result = f.guard.redeem(&f.payload, Money::from_pesos(1000)).await.unwrap();
        assert_eq!(result.status(), SettlementStatus::Lost);
        assert_eq!(result.payout(), Money::zero());
        assert!(!stored_wager(&f.store).await.payout_claimed);
    }

    #[tokio::test]
    async fn test_lookup_failures() {
        let f = fixture(Outcome::Meron).await;

        let err = f.guard.redeem("fight_id=F77,bet_id=2025-10-0001", Money::from_pesos(1000)).await.unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::MalformedReceipt { .. })));

        let unknown = f.payload.replace("bet_id=2025-10-0001", "bet_id=2025-10-0999");
        let err = f.guard.redeem(&unknown, Money::from_pesos(1000)).await.unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::WagerNotFound(_))));

        let forged = f.payload.replace("fight_id=F77", "fight_id=F78");
        let err = f.guard.redeem(&forged, Money::from_pesos(1000)).await.unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::MalformedReceipt { .. })));
    }

    /// Stores a wager placed at 00:30 on October 1st, +08:00, in `partition`.
    async fn boundary_wager(store: &LiveStore, partition: &str) -> String {
        let event = store.db().events().get("events_2025_10", "F77").await.unwrap().unwrap();
        let wager = WagerRecord {
            id: "2025-10-0002".to_string(),
            partition_key: partition.to_string(),
            placed_at: Utc.with_ymd_and_hms(2025, 9, 30, 16, 30, 0).unwrap(),
            ..testing::wager("2025-10-0002", &event, Side::Meron, 500)
        };
        store.db().wagers().insert(&wager).await.unwrap();
        ReceiptCodec::encode(&Receipt::for_wager(&wager)).unwrap()
    }

    #[tokio::test]
    async fn test_redeems_wager_filed_in_the_previous_month() {
        let f = fixture(Outcome::Meron).await;
        let payload = boundary_wager(&f.store, "wagers_2025_09").await;

        let paid = f.guard.redeem(&payload, Money::from_pesos(1000)).await.unwrap();
        assert_eq!(paid.status(), SettlementStatus::Won);
        assert_eq!(paid.wager.partition_key, "wagers_2025_09");
        assert!(paid.wager.payout_claimed);
    }

    #[tokio::test]
    async fn test_redeems_wager_filed_in_the_next_month() {
        let f = fixture(Outcome::Meron).await;
        let payload = boundary_wager(&f.store, "wagers_2025_10").await;

        // A UTC terminal reads 2025-09-30T16:30Z as September.
        let guard = SettlementGuard::new(f.store.clone(), PartitionResolver::new(0).unwrap(), testing::teller());
        let paid = guard.redeem(&payload, Money::from_pesos(1000)).await.unwrap();
        assert_eq!(paid.payout(), Money::from_pesos(950));

        let err = guard.redeem(&payload, Money::from_pesos(1000)).await.unwrap_err();
        assert!(matches!(err, SyncError::Core(CoreError::AlreadyClaimed { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_pay_once() {
        let f = fixture(Outcome::Meron).await;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let guard = f.guard.clone();
            let payload = f.payload.clone();
            handles.push(tokio::spawn(async move { guard.redeem(&payload, Money::from_pesos(5000)).await }));
        }

        let mut paid = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(redemption) => {
                    assert_eq!(redemption.payout(), Money::from_pesos(950));
                    paid += 1;
                }
                Err(SyncError::Core(CoreError::AlreadyClaimed { .. })) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(paid, 1);
    }
}
