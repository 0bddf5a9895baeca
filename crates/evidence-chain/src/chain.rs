//! Hash-chain primitives: hashing, sealing, and per-record linkage checks.
//!
//! Hash input is the canonical JSON of exactly three fields:
//!   `{"event": …, "prev_hash": …, "timestamp": …}`
//! `record_hash` is never part of its own input.

use serde::Serialize;
use sha2::{Digest, Sha256};

use evidence_contracts::{
    envelope::{EventPayload, RecordEnvelope},
    error::{EvidenceError, EvidenceResult},
};

use crate::canonical::canonical_json;

#[derive(Serialize)]
struct HashedFields<'a> {
    event: &'a EventPayload,
    prev_hash: Option<&'a str>,
    timestamp: &'a str,
}

/// Compute the record hash for the given fields.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_record(
    event: &EventPayload,
    prev_hash: Option<&str>,
    timestamp: &str,
) -> EvidenceResult<String> {
    let bytes = canonical_json(&HashedFields {
        event,
        prev_hash,
        timestamp,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Build a complete envelope linked to `prev_hash`.
pub fn seal(
    event: EventPayload,
    prev_hash: Option<String>,
    timestamp: String,
) -> EvidenceResult<RecordEnvelope> {
    let record_hash = hash_record(&event, prev_hash.as_deref(), &timestamp)?;
    Ok(RecordEnvelope {
        timestamp,
        prev_hash,
        event,
        record_hash,
    })
}

/// Check one record against the chain position it claims.
///
/// Linkage is checked before the hash, so a record that is both relinked and
/// rehashed reports `ChainBroken`.  `line` is only used for error reporting.
pub fn check_record(
    line: usize,
    record: &RecordEnvelope,
    expected_prev: Option<&str>,
) -> EvidenceResult<()> {
    if record.prev_hash.as_deref() != expected_prev {
        return Err(EvidenceError::ChainBroken {
            line,
            expected: expected_prev.map(str::to_owned),
            found: record.prev_hash.clone(),
        });
    }

    let recomputed = hash_record(&record.event, record.prev_hash.as_deref(), &record.timestamp)?;
    if record.record_hash != recomputed {
        return Err(EvidenceError::HashMismatch {
            line,
            expected: recomputed,
            found: record.record_hash.clone(),
        });
    }

    Ok(())
}

/// Verify an in-memory sequence of records as if it were a whole day-file.
///
/// Records are numbered from 1.  Returns the terminal hash, `None` for an
/// empty slice.
pub fn verify_records(records: &[RecordEnvelope]) -> EvidenceResult<Option<String>> {
    let mut expected_prev: Option<&str> = None;
    for (idx, record) in records.iter().enumerate() {
        check_record(idx + 1, record, expected_prev)?;
        expected_prev = Some(record.record_hash.as_str());
    }
    Ok(expected_prev.map(str::to_owned))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn build_chain(n: usize) -> Vec<RecordEnvelope> {
        let mut prev = None;
        let mut out = Vec::new();
        for i in 0..n {
            let env = seal(
                json!({"event_type": "test", "sequence": i}),
                prev.clone(),
                format!("2025-12-24T00:00:0{}.000000Z", i),
            )
            .unwrap();
            prev = Some(env.record_hash.clone());
            out.push(env);
        }
        out
    }

    #[test]
    fn hash_is_lowercase_sha256_hex() {
        let h = hash_record(&json!({"a": 1}), None, "2025-12-24T00:00:00.000000Z").unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn hash_ignores_event_key_order() {
        let a = hash_record(&json!({"x": 1, "y": 2}), None, "t").unwrap();
        let b = hash_record(&json!({"y": 2, "x": 1}), None, "t").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hash_commits_to_every_field() {
        let base = hash_record(&json!({"a": 1}), None, "t").unwrap();
        assert_ne!(base, hash_record(&json!({"a": 2}), None, "t").unwrap());
        assert_ne!(base, hash_record(&json!({"a": 1}), Some("00"), "t").unwrap());
        assert_ne!(base, hash_record(&json!({"a": 1}), None, "u").unwrap());
    }

    #[test]
    fn hash_matches_documented_input_layout() {
        let expected = hex::encode(Sha256::digest(
            br#"{"event":{"a":1},"prev_hash":null,"timestamp":"2025-12-24T00:00:00Z"}"#,
        ));
        let actual = hash_record(&json!({"a": 1}), None, "2025-12-24T00:00:00Z").unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn sealed_chain_verifies() {
        let records = build_chain(3);
        assert!(records[0].prev_hash.is_none());
        assert_eq!(records[1].prev_hash.as_deref(), Some(records[0].record_hash.as_str()));
        assert_eq!(
            verify_records(&records).unwrap(),
            Some(records[2].record_hash.clone())
        );
    }

    #[test]
    fn empty_chain_is_valid() {
        assert_eq!(verify_records(&[]).unwrap(), None);
    }

    #[test]
    fn tampered_event_is_a_hash_mismatch_at_its_own_position() {
        let mut records = build_chain(3);
        records[1].event = json!({"event_type": "test", "sequence": 99});

        match verify_records(&records) {
            Err(EvidenceError::HashMismatch { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected HashMismatch at 2, got {:?}", other),
        }
    }

    #[test]
    fn relinked_record_is_a_chain_break() {
        let mut records = build_chain(3);
        records[2].prev_hash = None;

        match verify_records(&records) {
            Err(EvidenceError::ChainBroken { line, expected, found }) => {
                assert_eq!(line, 3);
                assert_eq!(expected, Some(records[1].record_hash.clone()));
                assert_eq!(found, None);
            }
            other => panic!("expected ChainBroken at 3, got {:?}", other),
        }
    }
}
