//! Payload schemas, one per event type.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// A payload schema and the `event_type` string it is emitted under.
pub trait PayloadKind: Serialize + DeserializeOwned {
    const EVENT_TYPE: &'static str;
}

/// A file picked up by the ingestion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionPayload {
    pub file_path: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub sha256: String,
    #[serde(default)]
    pub source_host: Option<String>,
}

impl PayloadKind for IngestionPayload {
    const EVENT_TYPE: &'static str = "ingestion";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Success,
    Error,
}

/// A document chunked and embedded by the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPayload {
    pub document_id: String,
    pub num_chunks: u64,
    pub embedding_model: String,
    pub status: IndexStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PayloadKind for IndexPayload {
    const EVENT_TYPE: &'static str = "index";
}

/// A question received by the RAG API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub question: String,
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub query_embedding_id: Option<String>,
}

impl PayloadKind for QueryPayload {
    const EVENT_TYPE: &'static str = "query";
}

/// An answer returned by the RAG API.
///
/// `citations` entries look like
/// `{"doc_id": "...", "chunk_id": "...", "score": 0.92}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub question: String,
    pub answer: String,
    pub citations: Vec<Map<String, Value>>,
    pub latency_ms: u64,
    pub model_name: String,
    #[serde(default)]
    pub abstained: bool,
}

impl PayloadKind for AnswerPayload {
    const EVENT_TYPE: &'static str = "answer";
}

/// A generated daily brief.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBriefPayload {
    pub brief_path: String,
    pub num_items: u64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl PayloadKind for DailyBriefPayload {
    const EVENT_TYPE: &'static str = "daily_brief";
}

/// One scored test case of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPayload {
    pub evaluation_run_id: String,
    pub test_case_id: String,
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub failure_reasons: Vec<String>,
}

impl PayloadKind for EvaluationPayload {
    const EVENT_TYPE: &'static str = "evaluation";
}
