//! Outcomes returned by append and verification operations.

use serde::{Deserialize, Serialize};

use crate::day::DayId;

/// What a single successful append produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReceipt {
    /// The day-file the record was written to.
    pub day: DayId,
    /// The timestamp string stored in the envelope.
    pub timestamp: String,
    /// The chain tail the record linked against.
    pub prev_hash: Option<String>,
    /// The hash of the new record, now the day's chain tail.
    pub record_hash: String,
}

/// One event of a batch that was not durably appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Zero-based position of the event in the submitted batch.
    pub index: usize,
    pub detail: String,
}

/// Per-event accounting for a batch submission.
///
/// Batches are not atomic: `appended` holds every event that reached disk, in
/// order, and `failed` every event that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub appended: Vec<AppendReceipt>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn appended_count(&self) -> usize {
        self.appended.len()
    }
}

/// Result of a successful verification pass over one day-file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub day: DayId,

    /// Number of records whose linkage and hash were checked.
    pub verified_lines: usize,

    /// `record_hash` of the last verified record, `None` for an empty file.
    pub terminal_hash: Option<String>,

    /// True when the file ended in an unterminated, unparseable line, which
    /// is what an append still in flight looks like to a reader.
    pub trailing_partial: bool,
}
