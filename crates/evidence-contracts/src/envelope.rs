//! The record envelope: the unit of durability in a day-file.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque producer payload.  The log never inspects its shape.
pub type EventPayload = Value;

/// One line of a day-file.
///
/// `prev_hash` is `None` (serialized as JSON `null`) for the first record of a
/// file and the predecessor's `record_hash` for every later record.
/// `record_hash` commits to `event`, `prev_hash` and `timestamp` only.
///
/// `timestamp` is kept as the exact string that was hashed.  Re-rendering a
/// parsed `DateTime` could change its bytes and with them the hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEnvelope {
    /// RFC 3339 UTC timestamp with microsecond precision.
    pub timestamp: String,

    /// Hash of the preceding record in the same day-file.
    pub prev_hash: Option<String>,

    /// The producer payload, stored verbatim.
    pub event: EventPayload,

    /// Lowercase hex SHA-256 of the canonical `{event, prev_hash, timestamp}`.
    pub record_hash: String,
}

impl RecordEnvelope {
    /// Parse the stored timestamp.  `None` if it is not valid RFC 3339.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// True when this record opens its day-file's chain.
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }
}

/// Render `ts` the way envelopes store it, e.g. `2025-12-24T00:00:00.000000Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
