//! # Counter Allocator
//!
//! Issues `YYYY-MM-NNNN` identifiers from the month's counter.
//!
//! ```text
//! allocate(Wager, 2025-10-15T04:00Z)
//!     │
//!     ├─► partition  wagers_2025_10  (resolver, local month)
//!     ├─► counter    wagers_counter_2025_10
//!     │
//!     ├─ increment ok ───► "2025-10-0042"            degraded = false
//!     └─ increment err ──► "2025-10-" + last 4 digits
//!                          of epoch millis            degraded = true
//! ```
//!
//! The increment is a single atomic statement in the database, so
//! concurrent allocators never see the same value.

use chrono::{DateTime, Utc};
use ringside_core::partition::{format_fallback_id, format_sequence_id};
use ringside_core::{CoreError, EntityKind, PartitionResolver};
use ringside_db::{CounterRepository, DbError};
use serde::Serialize;
use tracing::{trace, warn};

use crate::error::SyncResult;

/// An identifier and whether it came from the fallback path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatedId {
    pub id: String,
    /// Not guaranteed unique; the operator should be told.
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct CounterAllocator {
    counters: CounterRepository,
    resolver: PartitionResolver,
}

impl CounterAllocator {
    pub fn new(counters: CounterRepository, resolver: PartitionResolver) -> Self {
        CounterAllocator { counters, resolver }
    }

    /// Only an unusable timestamp is an error; storage failures degrade.
    pub async fn allocate(&self, kind: EntityKind, at: DateTime<Utc>) -> SyncResult<AllocatedId> {
        let partition = self.resolver.current(kind, at)?;
        let (year, month) = partition.month();
        let key = partition.counter_key();

        let sequence = self.counters.increment(&key).await.and_then(|value| {
            u64::try_from(value).map_err(|_| DbError::corrupt("Counter", format!("{key} holds {value}")))
        });

        match sequence {
            Ok(sequence) => {
                let id = format_sequence_id(year, month, sequence);
                trace!(%key, %id, "Identifier allocated");
                Ok(AllocatedId { id, degraded: false })
            }
            Err(err) => {
                let failure = CoreError::CounterAllocationFailed {
                    key,
                    reason: err.to_string(),
                };
                let id = format_fallback_id(year, month, at.timestamp_millis());
                warn!(error = %failure, %id, "Issuing fallback identifier; uniqueness not guaranteed");
                Ok(AllocatedId { id, degraded: true })
            }
        }
    }
}
