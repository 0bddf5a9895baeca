//! HTTP interface of the evidence logger.
//!
//! | Method | Path       | Purpose                                   |
//! |--------|------------|-------------------------------------------|
//! | POST   | `/events`  | append a batch of events                  |
//! | GET    | `/verify`  | verify one day-file (`?date=YYYY-MM-DD`)  |
//! | GET    | `/healthz` | liveness                                  |
//!
//! Each handler is a thin wrapper around an `*_impl` function returning the
//! success body or an `HttpErr`, so the behaviour can be tested without a
//! socket.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use evidence_chain::EvidenceLog;
use evidence_contracts::{
    DayId, ErrorResponse, EventPayload, EvidenceBatch, EvidenceError, PartialFailureResponse,
    SubmitResponse, VerifyResponse,
};

use crate::clock::{Clock, SystemClock};
use crate::config::LoggerConfig;

pub const NO_EVENTS_DETAIL: &str = "No events provided";
pub const INVALID_DATE_DETAIL: &str = "Invalid date format, expected YYYY-MM-DD";
pub const NOT_FOUND_DETAIL: &str = "Log file not found for specified date";

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub log: Arc<EvidenceLog>,
    pub clock: Arc<dyn Clock>,
    /// Upper bound on appending one batch; `None` means unbounded.
    pub batch_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(log: Arc<EvidenceLog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            log,
            clock,
            batch_timeout: None,
        }
    }

    /// Open the log directory named by `cfg` and wrap it with the system clock.
    pub fn from_config(cfg: &LoggerConfig) -> Result<Self, EvidenceError> {
        let log = EvidenceLog::open(&cfg.log_dir, cfg.append_options())?;
        Ok(Self {
            log: Arc::new(log),
            clock: Arc::new(SystemClock),
            batch_timeout: cfg.batch_timeout(),
        })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Error(ErrorResponse),
    PartialFailure(PartialFailureResponse),
}

/// A non-2xx response.
#[derive(Debug, Clone)]
pub struct HttpErr {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl HttpErr {
    fn detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::Error(ErrorResponse::new(detail)),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self::detail(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for HttpErr {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/events", post(submit_events))
        .route("/verify", get(verify_day))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn submit_events(
    State(state): State<AppState>,
    payload: Result<Json<EvidenceBatch>, JsonRejection>,
) -> Response {
    let batch = match payload {
        Ok(Json(batch)) => batch,
        Err(rejection) => {
            warn!(
                status = %rejection.status(),
                error = %rejection.body_text(),
                "rejected event batch"
            );
            return HttpErr::detail(rejection.status(), rejection.body_text()).into_response();
        }
    };
    match submit_events_impl(&state, batch).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    pub date: Option<String>,
}

async fn verify_day(State(state): State<AppState>, Query(params): Query<VerifyParams>) -> Response {
    match verify_day_impl(&state, params.date.as_deref()).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ── Implementations ───────────────────────────────────────────────────────────

/// Append every event of `batch` with one shared timestamp.
///
/// Any event that did not reach disk turns the response into a 500
/// `partial_failure` that still reports how many events were appended.
pub async fn submit_events_impl(
    state: &AppState,
    batch: EvidenceBatch,
) -> Result<SubmitResponse, HttpErr> {
    if batch.is_empty() {
        return Err(HttpErr::detail(StatusCode::BAD_REQUEST, NO_EVENTS_DETAIL));
    }

    let events: Vec<EventPayload> = batch
        .events
        .into_iter()
        .map(|record| serde_json::Value::Object(record.data))
        .collect();
    let ts = state.clock.now();
    let deadline = state.batch_timeout.map(|t| Instant::now() + t);
    let log = Arc::clone(&state.log);

    let outcome = tokio::task::spawn_blocking(move || log.append_batch(&events, ts, deadline))
        .await
        .map_err(|e| {
            error!(error = %e, "append task did not complete");
            HttpErr::internal("append task did not complete")
        })?
        .map_err(|e| match e {
            EvidenceError::EmptyBatch => HttpErr::detail(StatusCode::BAD_REQUEST, NO_EVENTS_DETAIL),
            other => {
                error!(error = %other, "event batch rejected");
                HttpErr::internal(other.to_string())
            }
        })?;

    if outcome.is_complete() {
        Ok(SubmitResponse {
            status: "ok".to_string(),
            count: outcome.appended_count(),
        })
    } else {
        Err(HttpErr {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody::PartialFailure(PartialFailureResponse {
                status: "partial_failure".to_string(),
                count: outcome.appended_count(),
                failed: outcome.failed,
            }),
        })
    }
}

/// Verify the day-file for `date`, or for the clock's current UTC day.
pub async fn verify_day_impl(
    state: &AppState,
    date: Option<&str>,
) -> Result<VerifyResponse, HttpErr> {
    let day = match date {
        Some(raw) => DayId::parse(raw)
            .map_err(|_| HttpErr::detail(StatusCode::BAD_REQUEST, INVALID_DATE_DETAIL))?,
        None => DayId::from_timestamp(state.clock.now()),
    };

    let log = Arc::clone(&state.log);
    let report = tokio::task::spawn_blocking(move || log.verify(day))
        .await
        .map_err(|e| {
            error!(error = %e, "verify task did not complete");
            HttpErr::internal("verify task did not complete")
        })?
        .map_err(verify_error)?;

    Ok(VerifyResponse {
        status: "ok".to_string(),
        date: report.day,
        verified_lines: report.verified_lines,
        terminal_hash: report.terminal_hash,
        trailing_partial: report.trailing_partial,
    })
}

fn verify_error(err: EvidenceError) -> HttpErr {
    let (detail, kind) = match &err {
        EvidenceError::NotFound { .. } => {
            return HttpErr::detail(StatusCode::NOT_FOUND, NOT_FOUND_DETAIL);
        }
        EvidenceError::ChainBroken { line, .. } => {
            (format!("Hash chain broken at line {}", line), "chain_broken")
        }
        EvidenceError::HashMismatch { line, .. } => {
            (format!("Record hash mismatch at line {}", line), "hash_mismatch")
        }
        EvidenceError::Malformed { line, .. } => {
            (format!("Malformed record at line {}", line), "malformed")
        }
        other => {
            error!(error = %other, "verification could not run");
            return HttpErr::internal(other.to_string());
        }
    };
    warn!(error = %err, "day-file failed verification");
    HttpErr {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorBody::Error(ErrorResponse {
            detail,
            kind: Some(kind.to_string()),
            line: err.line(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
