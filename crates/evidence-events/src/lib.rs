//! # evidence-events
//!
//! The typed events producer services emit into the evidence log.
//!
//! The log stores whatever object it is given; this crate is the contract
//! producers agree on among themselves.  Build an [`Event`], turn it into a
//! submittable object with [`make_event`], and collect objects into an
//! [`EvidenceBatch`] for `POST /events`.
//!
//! ```rust,ignore
//! use evidence_events::{make_event, Event, EvidenceBatch, QueryPayload};
//!
//! let ev = Event::new("rag-api", QueryPayload { question: q.into(), ..Default::default() });
//! let mut batch = EvidenceBatch::new();
//! batch.push(make_event(ev, "rag-api")?);
//! ```

pub mod event;
pub mod payload;

pub use event::{make_event, Event, SCHEMA_VERSION};
pub use evidence_contracts::wire::EvidenceBatch;
pub use payload::{
    AnswerPayload, DailyBriefPayload, EvaluationPayload, IndexPayload, IndexStatus,
    IngestionPayload, PayloadKind, QueryPayload,
};

pub type IngestionEvent = Event<IngestionPayload>;
pub type IndexEvent = Event<IndexPayload>;
pub type QueryEvent = Event<QueryPayload>;
pub type AnswerEvent = Event<AnswerPayload>;
pub type DailyBriefEvent = Event<DailyBriefPayload>;
pub type EvaluationEvent = Event<EvaluationPayload>;
