//! # Partition Resolver
//!
//! Events and wagers are stored in one partition per calendar month. A
//! terminal reads the current month and the previous one so that records
//! written just before midnight on the 1st stay visible after rollover.
//!
//! ## Naming
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  partition   <kind>_<YYYY>_<MM>           events_2025_10               │
//! │  counter     <kind>_counter_<YYYY>_<MM>   wagers_counter_2025_10       │
//! │  wager id    <YYYY>-<MM>-<NNNN>           2025-10-0042                 │
//! │                                                                         │
//! │  Month is taken in the terminal's wall-clock offset (default +08:00).  │
//! │  2025-10-31T16:30Z is already November in Manila.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::EntityKind;
use crate::SEQUENCE_WIDTH;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

// =============================================================================
// Partition Key
// =============================================================================

/// A monthly partition name such as `events_2025_10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Builds the partition name for `kind` in the given month.
    pub fn new(kind: EntityKind, year: i32, month: u32) -> CoreResult<Self> {
        check_month(year, month)?;
        Ok(PartitionKey(format!("{}_{:04}_{:02}", kind.prefix(), year, month)))
    }

    /// Parses and validates a partition name.
    ///
    /// ## Example
    /// ```rust
    /// use ringside_core::partition::PartitionKey;
    /// use ringside_core::types::EntityKind;
    ///
    /// let key = PartitionKey::parse("events_2025_10").unwrap();
    /// assert_eq!(key.kind(), EntityKind::Event);
    /// assert_eq!(key.month(), (2025, 10));
    /// assert!(PartitionKey::parse("events_2025_13").is_err());
    /// ```
    pub fn parse(name: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidPartition(name.to_string());

        let mut parts = name.rsplitn(3, '_');
        let month = parts.next().ok_or_else(invalid)?;
        let year = parts.next().ok_or_else(invalid)?;
        let prefix = parts.next().ok_or_else(invalid)?;

        let kind = EntityKind::from_prefix(prefix).ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        PartitionKey::new(kind, year, month).map_err(|_| invalid())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> EntityKind {
        // Constructed only through `new`, so the prefix is always known.
        if self.0.starts_with(EntityKind::Event.prefix()) {
            EntityKind::Event
        } else {
            EntityKind::Wager
        }
    }

    /// `(year, month)` encoded in the name.
    pub fn month(&self) -> (i32, u32) {
        let tail = &self.0[self.0.len() - 7..];
        let year = tail[..4].parse().unwrap_or(MIN_YEAR);
        let month = tail[5..].parse().unwrap_or(1);
        (year, month)
    }

    /// Counter document key for ids allocated in this partition's month.
    pub fn counter_key(&self) -> String {
        let (year, month) = self.month();
        format!("{}_counter_{:04}_{:02}", self.kind().prefix(), year, month)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Partition Pair
// =============================================================================

/// The two partitions a live view reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartitionPair {
    pub current: PartitionKey,
    pub previous: PartitionKey,
}

// =============================================================================
// Resolver
// =============================================================================

/// Maps timestamps to monthly partitions in a fixed wall-clock offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionResolver {
    offset: FixedOffset,
}

impl PartitionResolver {
    /// Creates a resolver for a UTC offset in minutes (`480` = +08:00).
    pub fn new(utc_offset_minutes: i32) -> CoreResult<Self> {
        crate::validation::validate_utc_offset(utc_offset_minutes)?;
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            CoreError::Validation(ValidationError::OutOfRange {
                field: "utc_offset_minutes".to_string(),
                min: -24 * 60 + 1,
                max: 24 * 60 - 1,
            })
        })?;
        Ok(PartitionResolver { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar `(year, month)` of `at` in this resolver's offset.
    pub fn month_of(&self, at: DateTime<Utc>) -> CoreResult<(i32, u32)> {
        let local = at.with_timezone(&self.offset);
        let (year, month) = (local.year(), local.month());
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CoreError::InvalidTimestamp(format!(
                "{at} is outside years {MIN_YEAR}-{MAX_YEAR}"
            )));
        }
        Ok((year, month))
    }

    /// Current and previous partition names for `kind` at `at`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use ringside_core::partition::PartitionResolver;
    /// use ringside_core::types::EntityKind;
    ///
    /// let resolver = PartitionResolver::new(480).unwrap();
    /// let at = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
    /// let pair = resolver.resolve(EntityKind::Wager, at).unwrap();
    /// assert_eq!(pair.current.as_str(), "wagers_2025_01");
    /// assert_eq!(pair.previous.as_str(), "wagers_2024_12");
    /// ```
    pub fn resolve(&self, kind: EntityKind, at: DateTime<Utc>) -> CoreResult<PartitionPair> {
        let (year, month) = self.month_of(at)?;
        let (prev_year, prev_month) = previous_month(year, month);
        let previous = if prev_year < MIN_YEAR {
            // Year 1 January has no predecessor; read the current month twice.
            PartitionKey::new(kind, year, month)?
        } else {
            PartitionKey::new(kind, prev_year, prev_month)?
        };
        Ok(PartitionPair {
            current: PartitionKey::new(kind, year, month)?,
            previous,
        })
    }

    /// The partition `kind` records written at `at` go into.
    pub fn current(&self, kind: EntityKind, at: DateTime<Utc>) -> CoreResult<PartitionKey> {
        let (year, month) = self.month_of(at)?;
        PartitionKey::new(kind, year, month)
    }
}

// =============================================================================
// Identifier Formatting
// =============================================================================

/// Formats an allocated sequence number as a wager id: `2025-10-0042`.
pub fn format_sequence_id(year: i32, month: u32, sequence: u64) -> String {
    format!("{:04}-{:02}-{:0width$}", year, month, sequence, width = SEQUENCE_WIDTH)
}

/// Degraded-mode id built from the last four digits of a millisecond clock.
/// Not collision-free; callers must flag it.
pub fn format_fallback_id(year: i32, month: u32, epoch_millis: i64) -> String {
    let tail = epoch_millis.rem_euclid(10_i64.pow(SEQUENCE_WIDTH as u32));
    format!("{:04}-{:02}-{:0width$}", year, month, tail, width = SEQUENCE_WIDTH)
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn check_month(year: i32, month: u32) -> CoreResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
        return Err(CoreError::InvalidTimestamp(format!(
            "{year:04}-{month:02} is not a partitionable month"
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn manila() -> PartitionResolver {
        PartitionResolver::new(480).unwrap()
    }

    #[test]
    fn test_resolve_mid_month() {
        let at = Utc.with_ymd_and_hms(2025, 10, 14, 4, 0, 0).unwrap();
        let pair = manila().resolve(EntityKind::Event, at).unwrap();
        assert_eq!(pair.current.as_str(), "events_2025_10");
        assert_eq!(pair.previous.as_str(), "events_2025_09");
    }

    #[test]
    fn test_resolve_january_rolls_back_to_december() {
        let at = Utc.with_ymd_and_hms(2025, 1, 10, 4, 0, 0).unwrap();
        let pair = manila().resolve(EntityKind::Wager, at).unwrap();
        assert_eq!(pair.current.as_str(), "wagers_2025_01");
        assert_eq!(pair.previous.as_str(), "wagers_2024_12");
    }

    #[test]
    fn test_month_uses_local_offset() {
        // 16:30 UTC on Oct 31 is 00:30 on Nov 1 in Manila.
        let at = Utc.with_ymd_and_hms(2025, 10, 31, 16, 30, 0).unwrap();
        assert_eq!(manila().month_of(at).unwrap(), (2025, 11));

        let utc = PartitionResolver::new(0).unwrap();
        assert_eq!(utc.month_of(at).unwrap(), (2025, 10));
    }

    #[test]
    fn test_out_of_range_year_is_invalid_timestamp() {
        let at = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            manila().resolve(EntityKind::Event, at),
            Err(CoreError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            PartitionKey::new(EntityKind::Event, 2025, 13),
            Err(CoreError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_invalid_offset_rejected() {
        assert!(PartitionResolver::new(24 * 60).is_err());
        assert!(PartitionResolver::new(-300).is_ok());
    }

    #[test]
    fn test_parse_partition_names() {
        let key = PartitionKey::parse("wagers_2024_12").unwrap();
        assert_eq!(key.kind(), EntityKind::Wager);
        assert_eq!(key.month(), (2024, 12));
        assert_eq!(key.counter_key(), "wagers_counter_2024_12");

        for bad in ["", "events", "events_2025", "fights_2025_10", "events_25_10", "events_2025_1", "events_2025_00"] {
            assert!(PartitionKey::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_format_sequence_id() {
        assert_eq!(format_sequence_id(2025, 10, 42), "2025-10-0042");
        assert_eq!(format_sequence_id(2025, 1, 1), "2025-01-0001");
        assert_eq!(format_sequence_id(2025, 10, 12345), "2025-10-12345");
    }

    #[test]
    fn test_format_fallback_id_keeps_last_four_digits() {
        assert_eq!(format_fallback_id(2025, 10, 1_760_000_001_234), "2025-10-1234");
        assert_eq!(format_fallback_id(2025, 10, 7), "2025-10-0007");
    }
}
