//! # evidence-contracts
//!
//! Shared types and errors for the evidence log.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod day;
pub mod envelope;
pub mod error;
pub mod report;
pub mod wire;

pub use day::DayId;
pub use envelope::{format_timestamp, EventPayload, RecordEnvelope};
pub use error::{EvidenceError, EvidenceResult};
pub use report::{AppendReceipt, BatchFailure, BatchOutcome, VerifyReport};
pub use wire::{
    ErrorResponse, EvidenceBatch, EvidenceRecord, PartialFailureResponse, SubmitResponse,
    VerifyResponse,
};
