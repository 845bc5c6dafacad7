//! # Partition Merge State
//!
//! The pure half of the stream merger: two partitions push full snapshots
//! in any order, and this state turns them into one deduplicated list.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  snapshot(P, items)  → everything previously attributed to P is        │
//! │                        replaced by `items`                              │
//! │  failure(P, reason)  → P keeps its last good snapshot, marked stale    │
//! │  ready               → both partitions have reported (or failed) once  │
//! │  same id in both     → the partition that reported it last wins        │
//! │  replayed snapshot   → no change                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::partition::{PartitionKey, PartitionPair};
use crate::types::{EventRecord, WagerOrder, WagerRecord};

/// Records that carry a stable identity across snapshots.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for EventRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for WagerRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Which of the two partitions a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Current,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotHealth {
    /// No snapshot or failure seen yet.
    Waiting,
    Live,
    Stale { reason: String },
}

#[derive(Debug)]
struct SlotState<T> {
    partition: PartitionKey,
    health: SlotHealth,
    /// Delivery order of the last snapshot that changed this slot.
    seq: u64,
    entries: HashMap<String, T>,
}

impl<T> SlotState<T> {
    fn new(partition: PartitionKey) -> Self {
        SlotState {
            partition,
            health: SlotHealth::Waiting,
            seq: 0,
            entries: HashMap::new(),
        }
    }
}

/// What subscribers of a merged stream see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedView<T> {
    pub items: Vec<T>,
    /// False until both partitions have reported at least once.
    pub ready: bool,
    /// Partitions currently serving their last good snapshot.
    pub stale: Vec<PartitionKey>,
}

impl<T> Default for MergedView<T> {
    fn default() -> Self {
        MergedView {
            items: Vec::new(),
            ready: false,
            stale: Vec::new(),
        }
    }
}

impl<T> MergedView<T> {
    pub fn is_degraded(&self) -> bool {
        !self.stale.is_empty()
    }
}

/// Merge state for one current/previous partition pair.
#[derive(Debug)]
pub struct PartitionMerge<T> {
    current: SlotState<T>,
    previous: SlotState<T>,
    clock: u64,
}

impl<T: Keyed + Clone + PartialEq> PartitionMerge<T> {
    pub fn new(pair: &PartitionPair) -> Self {
        PartitionMerge {
            current: SlotState::new(pair.current.clone()),
            previous: SlotState::new(pair.previous.clone()),
            clock: 0,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotState<T> {
        match slot {
            Slot::Current => &mut self.current,
            Slot::Previous => &mut self.previous,
        }
    }

    /// Replaces everything attributed to `slot` with `items`. Returns
    /// whether the merged contents may have changed.
    pub fn apply_snapshot(&mut self, slot: Slot, items: Vec<T>) -> bool {
        let entries: HashMap<String, T> = items
            .into_iter()
            .map(|item| (item.key().to_string(), item))
            .collect();

        self.clock += 1;
        let clock = self.clock;
        let state = self.slot_mut(slot);
        let was_live = state.health == SlotHealth::Live;
        state.health = SlotHealth::Live;

        if was_live && state.entries == entries {
            return false;
        }
        state.entries = entries;
        state.seq = clock;
        true
    }

    /// Marks `slot` stale; its last good snapshot keeps being served.
    pub fn mark_stale(&mut self, slot: Slot, reason: impl Into<String>) -> bool {
        let state = self.slot_mut(slot);
        let reason = reason.into();
        if matches!(&state.health, SlotHealth::Stale { reason: r } if *r == reason) {
            return false;
        }
        state.health = SlotHealth::Stale { reason };
        true
    }

    pub fn health(&self, slot: Slot) -> &SlotHealth {
        match slot {
            Slot::Current => &self.current.health,
            Slot::Previous => &self.previous.health,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.current.health != SlotHealth::Waiting && self.previous.health != SlotHealth::Waiting
    }

    pub fn stale_partitions(&self) -> Vec<PartitionKey> {
        [&self.current, &self.previous]
            .into_iter()
            .filter(|s| matches!(s.health, SlotHealth::Stale { .. }))
            .map(|s| s.partition.clone())
            .collect()
    }

    /// Union of both slots, one entry per id, unordered.
    pub fn items(&self) -> Vec<T> {
        let (older, newer) = if self.current.seq >= self.previous.seq {
            (&self.previous, &self.current)
        } else {
            (&self.current, &self.previous)
        };

        let mut merged: HashMap<&str, &T> = older.entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        merged.extend(newer.entries.iter().map(|(k, v)| (k.as_str(), v)));
        merged.into_values().cloned().collect()
    }

    /// Snapshot of the merged contents sorted with `compare`.
    pub fn view_by<F>(&self, compare: F) -> MergedView<T>
    where
        F: Fn(&T, &T) -> Ordering,
    {
        let mut items = self.items();
        items.sort_by(|a, b| compare(a, b).then_with(|| a.key().cmp(b.key())));
        MergedView {
            items,
            ready: self.is_ready(),
            stale: self.stale_partitions(),
        }
    }
}

// =============================================================================
// Orderings
// =============================================================================

/// Events by event number, highest first.
pub fn events_newest_first(a: &EventRecord, b: &EventRecord) -> Ordering {
    b.event_number.cmp(&a.event_number)
}

impl WagerOrder {
    /// Wagers by placement time in this direction.
    pub fn compare(&self, a: &WagerRecord, b: &WagerRecord) -> Ordering {
        match self {
            WagerOrder::Ascending => a.placed_at.cmp(&b.placed_at),
            WagerOrder::Descending => b.placed_at.cmp(&a.placed_at),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityKind;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: &'static str,
        value: u32,
    }

    impl Keyed for Row {
        fn key(&self) -> &str {
            self.id
        }
    }

    fn row(id: &'static str, value: u32) -> Row {
        Row { id, value }
    }

    fn pair() -> PartitionPair {
        PartitionPair {
            current: PartitionKey::new(EntityKind::Event, 2025, 11).unwrap(),
            previous: PartitionKey::new(EntityKind::Event, 2025, 10).unwrap(),
        }
    }

    fn sorted(merge: &PartitionMerge<Row>) -> Vec<Row> {
        merge.view_by(|a, b| a.id.cmp(b.id)).items
    }

    /// Every interleaving of two delivery sequences.
    fn interleavings(a: &[Vec<Row>], b: &[Vec<Row>]) -> Vec<Vec<(Slot, Vec<Row>)>> {
        if a.is_empty() {
            return vec![b.iter().cloned().map(|s| (Slot::Previous, s)).collect()];
        }
        if b.is_empty() {
            return vec![a.iter().cloned().map(|s| (Slot::Current, s)).collect()];
        }
        let mut out = Vec::new();
        for mut rest in interleavings(&a[1..], b) {
            rest.insert(0, (Slot::Current, a[0].clone()));
            out.push(rest);
        }
        for mut rest in interleavings(a, &b[1..]) {
            rest.insert(0, (Slot::Previous, b[0].clone()));
            out.push(rest);
        }
        out
    }

    #[test]
    fn test_not_ready_until_both_report() {
        let mut merge = PartitionMerge::new(&pair());
        merge.apply_snapshot(Slot::Current, vec![row("a", 1)]);
        assert!(!merge.is_ready());
        merge.apply_snapshot(Slot::Previous, vec![]);
        assert!(merge.is_ready());
    }

    #[test]
    fn test_snapshot_replaces_only_its_partition() {
        let mut merge = PartitionMerge::new(&pair());
        merge.apply_snapshot(Slot::Current, vec![row("a", 1), row("b", 1)]);
        merge.apply_snapshot(Slot::Previous, vec![row("z", 1)]);
        merge.apply_snapshot(Slot::Current, vec![row("b", 2)]);
        assert_eq!(sorted(&merge), vec![row("b", 2), row("z", 1)]);
    }

    #[test]
    fn test_final_view_independent_of_interleaving() {
        let current = vec![
            vec![row("c1", 1)],
            vec![row("c1", 2), row("c2", 1)],
            vec![row("c2", 2), row("c3", 1)],
        ];
        let previous = vec![vec![row("p1", 1), row("p2", 1)], vec![row("p2", 2)]];
        let expected = vec![row("c2", 2), row("c3", 1), row("p2", 2)];

        let orders = interleavings(&current, &previous);
        assert_eq!(orders.len(), 10);
        for order in orders {
            let mut merge = PartitionMerge::new(&pair());
            for (slot, snapshot) in order {
                merge.apply_snapshot(slot, snapshot);
            }
            assert!(merge.is_ready());
            assert_eq!(sorted(&merge), expected);
        }
    }

    #[test]
    fn test_duplicate_id_taken_from_last_reporter() {
        let mut merge = PartitionMerge::new(&pair());
        merge.apply_snapshot(Slot::Previous, vec![row("x", 1)]);
        merge.apply_snapshot(Slot::Current, vec![row("x", 2)]);
        assert_eq!(sorted(&merge), vec![row("x", 2)]);

        merge.apply_snapshot(Slot::Previous, vec![row("x", 3)]);
        assert_eq!(sorted(&merge), vec![row("x", 3)]);

        // Previous drops it; Current's copy resurfaces.
        merge.apply_snapshot(Slot::Previous, vec![]);
        assert_eq!(sorted(&merge), vec![row("x", 2)]);
    }

    #[test]
    fn test_replayed_snapshot_is_a_no_op() {
        let mut merge = PartitionMerge::new(&pair());
        merge.apply_snapshot(Slot::Previous, vec![row("x", 1)]);
        merge.apply_snapshot(Slot::Current, vec![row("x", 2)]);
        assert!(!merge.apply_snapshot(Slot::Previous, vec![row("x", 1)]));
        assert_eq!(sorted(&merge), vec![row("x", 2)]);
    }

    #[test]
    fn test_stale_partition_keeps_last_good_snapshot() {
        let mut merge = PartitionMerge::new(&pair());
        merge.apply_snapshot(Slot::Current, vec![row("a", 1)]);
        merge.apply_snapshot(Slot::Previous, vec![row("p", 1)]);
        assert!(merge.mark_stale(Slot::Previous, "disk I/O error"));
        assert!(!merge.mark_stale(Slot::Previous, "disk I/O error"));

        let view = merge.view_by(|a, b| a.id.cmp(b.id));
        assert_eq!(view.items, vec![row("a", 1), row("p", 1)]);
        assert_eq!(view.stale, vec![pair().previous]);
        assert!(view.is_degraded());

        merge.apply_snapshot(Slot::Previous, vec![row("p", 1)]);
        assert!(merge.stale_partitions().is_empty());
    }

    #[test]
    fn test_failure_before_first_snapshot_still_unblocks() {
        let mut merge = PartitionMerge::new(&pair());
        merge.apply_snapshot(Slot::Current, vec![row("a", 1)]);
        merge.mark_stale(Slot::Previous, "unavailable");
        assert!(merge.is_ready());
        assert_eq!(sorted(&merge), vec![row("a", 1)]);
    }
}
