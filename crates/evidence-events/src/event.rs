//! The common event frame shared by every event type.

use chrono::{DateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::payload::PayloadKind;

/// Version of the event frame emitted by this crate.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// An evidence event carrying a `P` payload.
///
/// Unknown top-level fields are rejected, and `event_type` must equal
/// `P::EVENT_TYPE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "P: PayloadKind"))]
pub struct Event<P: PayloadKind> {
    pub schema_version: String,
    pub event_id: Uuid,
    #[serde(deserialize_with = "expect_event_type::<P, _>")]
    pub event_type: String,
    /// Emitting service, e.g. `"ingestion"`, `"indexer"`, `"rag-api"`.
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub payload: P,
}

impl<P: PayloadKind> Event<P> {
    /// A fresh event with a random id, stamped now.
    pub fn new(service: impl Into<String>, payload: P) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            event_id: Uuid::new_v4(),
            event_type: P::EVENT_TYPE.to_string(),
            service: service.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Serialize to the JSON object submitted as a record's `data`.
    pub fn to_data(&self) -> serde_json::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(serde_json::Error::custom("event did not serialize to an object")),
        }
    }
}

/// Stamp `service` onto `event` and return the object to submit.
///
/// Producers should emit events only through this function.
pub fn make_event<P: PayloadKind>(
    mut event: Event<P>,
    service: &str,
) -> serde_json::Result<Map<String, Value>> {
    event.service = service.to_string();
    event.to_data()
}

fn expect_event_type<'de, P, D>(deserializer: D) -> Result<String, D::Error>
where
    P: PayloadKind,
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw == P::EVENT_TYPE {
        Ok(raw)
    } else {
        Err(D::Error::custom(format!(
            "expected event_type '{}', got '{}'",
            P::EVENT_TYPE,
            raw
        )))
    }
}
