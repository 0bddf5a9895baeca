//! Request and response bodies of the evidence logger's HTTP interface.
//!
//! Producers and the server both use these types, so the wire shape is
//! defined exactly once.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{day::DayId, report::BatchFailure};

/// One submitted event.  `data` is stored verbatim as the record's `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub data: Map<String, Value>,
}

/// Body of `POST /events`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBatch {
    pub events: Vec<EvidenceRecord>,
}

impl EvidenceBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: Map<String, Value>) -> &mut Self {
        self.events.push(EvidenceRecord { data });
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Body of a successful `POST /events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub count: usize,
}

/// Body of a `POST /events` where at least one event was not appended.
///
/// `count` is the number of events durably appended; `failed` lists every
/// event that was not, by its zero-based index in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFailureResponse {
    pub status: String,
    pub count: usize,
    pub failed: Vec<BatchFailure>,
}

/// Body of a successful `GET /verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: String,
    pub date: DayId,
    pub verified_lines: usize,
    pub terminal_hash: Option<String>,
    pub trailing_partial: bool,
}

/// Body of every client or server error response.
///
/// `kind` and `line` are only set for verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            kind: None,
            line: None,
        }
    }
}
