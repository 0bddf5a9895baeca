//! Canonical JSON serialization.
//!
//! The byte form is a strict function of the value: object keys are sorted at
//! every depth, arrays keep their order, and output is compact UTF-8 with `,`
//! and `:` separators.  The appender and the verifier both hash through
//! `canonical_json`; there is no second implementation.

use serde::Serialize;
use serde_json::{Map, Value};

use evidence_contracts::error::{EvidenceError, EvidenceResult};

/// Serialize `v` to canonical JSON bytes.
pub fn canonical_json(v: &impl Serialize) -> EvidenceResult<Vec<u8>> {
    let value = serde_json::to_value(v).map_err(|e| EvidenceError::Serialization {
        reason: format!("cannot convert to JSON value: {}", e),
    })?;
    serde_json::to_vec(&sort_json(value)).map_err(|e| EvidenceError::Serialization {
        reason: format!("cannot encode canonical JSON: {}", e),
    })
}

// serde_json's default map is already ordered, but `preserve_order` can be
// switched on by any crate in the build graph through feature unification.
fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}
