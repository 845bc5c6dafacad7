//! # Receipt Codec
//!
//! The QR payload printed on every bet receipt and scanned at payout.
//!
//! ## Wire Format
//! ```text
//! fight_id=<eventId>,bet_id=<wagerId>,teller=<tellerId>,
//! timestamp=<RFC3339>,fight_collection=<eventPartition>
//!
//! - comma-separated key=value segments, one line
//! - order is irrelevant on decode, unknown keys are ignored
//! - values may not contain ',' or '=' (encode refuses them)
//! - values may not start or end with whitespace (decode trims it)
//! - timestamps carry millisecond precision, finer digits are dropped
//! ```

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::Receipt;

pub const KEY_EVENT_ID: &str = "fight_id";
pub const KEY_WAGER_ID: &str = "bet_id";
pub const KEY_TELLER_ID: &str = "teller";
pub const KEY_PLACED_AT: &str = "timestamp";
pub const KEY_PARTITION: &str = "fight_collection";

/// Encodes and decodes receipt QR payloads.
pub struct ReceiptCodec;

impl ReceiptCodec {
    /// ## Example
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use ringside_core::receipt::ReceiptCodec;
    /// use ringside_core::types::Receipt;
    ///
    /// let receipt = Receipt {
    ///     event_id: "F1".into(),
    ///     wager_id: "2025-10-0042".into(),
    ///     teller_id: "T9".into(),
    ///     placed_at: Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, 0).unwrap(),
    ///     partition_key: "events_2025_10".into(),
    /// };
    /// assert_eq!(
    ///     ReceiptCodec::encode(&receipt).unwrap(),
    ///     "fight_id=F1,bet_id=2025-10-0042,teller=T9,timestamp=2025-10-14T12:00:00.000Z,fight_collection=events_2025_10"
    /// );
    /// ```
    pub fn encode(receipt: &Receipt) -> CoreResult<String> {
        let placed_at = receipt.placed_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let fields = [
            (KEY_EVENT_ID, receipt.event_id.as_str()),
            (KEY_WAGER_ID, receipt.wager_id.as_str()),
            (KEY_TELLER_ID, receipt.teller_id.as_str()),
            (KEY_PLACED_AT, placed_at.as_str()),
            (KEY_PARTITION, receipt.partition_key.as_str()),
        ];

        let mut segments = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            check_value(key, value)?;
            segments.push(format!("{key}={value}"));
        }
        Ok(segments.join(","))
    }

    /// Decodes a scanned payload. Surrounding whitespace is ignored.
    pub fn decode(payload: &str) -> CoreResult<Receipt> {
        let mut event_id = None;
        let mut wager_id = None;
        let mut teller_id = None;
        let mut placed_at = None;
        let mut partition_key = None;

        for segment in payload.trim().split(',') {
            let (key, value) = segment.split_once('=').ok_or_else(|| malformed(format!(
                "segment '{segment}' is not key=value"
            )))?;
            let slot = match key.trim() {
                KEY_EVENT_ID => &mut event_id,
                KEY_WAGER_ID => &mut wager_id,
                KEY_TELLER_ID => &mut teller_id,
                KEY_PLACED_AT => &mut placed_at,
                KEY_PARTITION => &mut partition_key,
                _ => continue,
            };
            *slot = Some(value.trim().to_string());
        }

        let placed_at = require(KEY_PLACED_AT, placed_at)?;
        Ok(Receipt {
            event_id: require(KEY_EVENT_ID, event_id)?,
            wager_id: require(KEY_WAGER_ID, wager_id)?,
            teller_id: require(KEY_TELLER_ID, teller_id)?,
            placed_at: parse_timestamp(&placed_at)?,
            partition_key: require(KEY_PARTITION, partition_key)?,
        })
    }
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp(format!("'{value}': {e}")))
}

fn check_value(key: &str, value: &str) -> CoreResult<()> {
    if value.is_empty() {
        return Err(malformed(format!("{key} is empty")));
    }
    if value.contains([',', '=']) {
        return Err(malformed(format!("{key} contains a reserved character")));
    }
    if value.trim() != value {
        return Err(malformed(format!("{key} has surrounding whitespace")));
    }
    Ok(())
}

fn require(key: &str, value: Option<String>) -> CoreResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(malformed(format!("{key} is empty"))),
        None => Err(malformed(format!("missing field {key}"))),
    }
}

fn malformed(reason: String) -> CoreError {
    CoreError::MalformedReceipt { reason }
}

// =============================================================================
// Unit Tests
// =============================================================================
