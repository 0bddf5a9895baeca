//! # evidence-chain
//!
//! Durable, append-only, SHA-256 hash-chained evidence log with one file per
//! UTC calendar day.
//!
//! ## Overview
//!
//! Every event is wrapped in a `RecordEnvelope` that links to the previous
//! record of the same day-file via its hash.  Editing, removing, or
//! reordering any record breaks the chain and is reported by the verifier
//! with the line number of the first bad record.
//!
//! - [`canonical`] — key-sorted compact JSON, the only hash input encoding
//! - [`rotation`]  — timestamp → day-file
//! - [`recover`]   — chain tail from the last line of an existing day-file
//! - [`appender`]  — `EvidenceLog`, the per-day locked writer
//! - [`verifier`]  — whole-file verification
//!
//! ## Usage
//!
//! ```rust,ignore
//! use evidence_chain::{AppendOptions, EvidenceLog};
//!
//! let log = EvidenceLog::open("data/logs", AppendOptions::default())?;
//! let receipt = log.append(&serde_json::json!({"event_type": "query"}), chrono::Utc::now())?;
//! let report = log.verify(receipt.day)?;
//! ```

pub mod appender;
pub mod canonical;
pub mod chain;
pub mod recover;
pub mod rotation;
pub mod verifier;

pub use appender::{AppendOptions, EvidenceLog, FileSink, LineSink};
pub use canonical::canonical_json;
pub use chain::{check_record, hash_record, seal, verify_records};
pub use recover::{recover_day, recover_tail, RecoveredTail, RecoveryPolicy};
pub use rotation::{day_for, file_for, path_for_day};
pub use verifier::{verify_day, verify_file};

// ── Tests ─────────────────────────────────────────────────────────────────────
