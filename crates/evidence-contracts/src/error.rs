//! Error types for the evidence log.
//!
//! Every fallible operation in the workspace returns `EvidenceResult<T>`.
//! Verification variants carry the physical line number so an operator can
//! go straight to the damaged record.

use thiserror::Error;

/// The unified error type for the evidence log.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// The underlying storage failed (disk full, permission denied, ...).
    #[error("storage I/O failed: {reason}")]
    Io { reason: String },

    /// A record or payload could not be serialized.
    #[error("serialization failed: {reason}")]
    Serialization { reason: String },

    /// A day identifier did not have the `YYYY-MM-DD` shape.
    #[error("invalid day identifier '{input}', expected YYYY-MM-DD")]
    InvalidDay { input: String },

    /// No log file exists for the requested day.
    #[error("log file not found for {day}")]
    NotFound { day: String },

    /// A line in a day-file could not be parsed as a record envelope.
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// A record's `prev_hash` does not match its predecessor's `record_hash`.
    #[error("hash chain broken at line {line}")]
    ChainBroken {
        line: usize,
        expected: Option<String>,
        found: Option<String>,
    },

    /// A record's stored `record_hash` does not match the recomputed hash.
    #[error("record hash mismatch at line {line}")]
    HashMismatch {
        line: usize,
        expected: String,
        found: String,
    },

    /// The last line of a day-file is unreadable and strict recovery is on.
    #[error("cannot recover chain tail for {day}: {reason}")]
    CorruptTail { day: String, reason: String },

    /// A batch submission contained no events.
    #[error("no events provided")]
    EmptyBatch,

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A chain-tail lock was poisoned by a panicking writer.
    #[error("chain state lock poisoned: {reason}")]
    LockPoisoned { reason: String },
}

impl EvidenceError {
    /// True for the three verification outcomes that indicate tampering or
    /// corruption of a day-file.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::ChainBroken { .. } | Self::HashMismatch { .. }
        )
    }

    /// The physical line number an integrity failure refers to.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Malformed { line, .. }
            | Self::ChainBroken { line, .. }
            | Self::HashMismatch { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EvidenceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            reason: e.to_string(),
        }
    }
}

/// Convenience alias used throughout the evidence crates.
pub type EvidenceResult<T> = Result<T, EvidenceError>;
