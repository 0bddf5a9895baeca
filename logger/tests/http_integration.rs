use std::sync::Arc;

use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use evidence_chain::{AppendOptions, EvidenceLog};
use evidence_events::{make_event, EvidenceBatch, QueryEvent, QueryPayload};
use evidence_logger::{http, AppState, FixedClock};

struct Server {
    base: String,
    dir: TempDir,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Server {
    async fn start(max_body_bytes: usize) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");

        let log = EvidenceLog::open(dir.path(), AppendOptions::default()).expect("open log");
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 12, 24, 9, 30, 0).unwrap());
        let state = AppState::new(Arc::new(log), Arc::new(clock));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = http::serve(listener, http::router(state, max_body_bytes), async move {
                let _ = rx.await;
            })
            .await;
        });

        Self {
            base: format!("http://{addr}"),
            dir,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

fn query_batch(questions: &[&str]) -> EvidenceBatch {
    let mut batch = EvidenceBatch::new();
    for q in questions {
        let ev = QueryEvent::new(
            "unset",
            QueryPayload {
                question: q.to_string(),
                ..Default::default()
            },
        );
        batch.push(make_event(ev, "rag-api").expect("event data"));
    }
    batch
}

#[tokio::test]
async fn submit_then_verify_over_http() {
    let server = Server::start(1024 * 1024).await;
    let client = reqwest::Client::new();

    let health = client
        .get(format!("{}/healthz", server.base))
        .send()
        .await
        .expect("healthz");
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.json::<Value>().await.expect("json"), json!({"status": "ok"}));

    for questions in [&["first", "second"][..], &["third"][..]] {
        let resp = client
            .post(format!("{}/events", server.base))
            .json(&query_batch(questions))
            .send()
            .await
            .expect("submit");
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body, json!({"status": "ok", "count": questions.len()}));
    }

    let resp = client
        .get(format!("{}/verify?date=2025-12-24", server.base))
        .send()
        .await
        .expect("verify");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["date"], "2025-12-24");
    assert_eq!(body["verified_lines"], 3);
    assert_eq!(body["trailing_partial"], false);

    let stored = std::fs::read_to_string(server.dir.path().join("evidence-2025-12-24.jsonl"))
        .expect("day-file");
    let last: Value = serde_json::from_str(stored.lines().last().expect("line")).expect("record");
    assert_eq!(last["record_hash"], body["terminal_hash"]);
    assert_eq!(last["event"]["service"], "rag-api");
    assert_eq!(last["event"]["payload"]["question"], "third");

    server.stop().await;
}

#[tokio::test]
async fn client_errors_over_http() {
    let server = Server::start(1024).await;
    let client = reqwest::Client::new();

    let empty = client
        .post(format!("{}/events", server.base))
        .json(&json!({"events": []}))
        .send()
        .await
        .expect("empty");
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    let body: Value = empty.json().await.expect("json");
    assert_eq!(body["detail"], "No events provided");

    let bad_date = client
        .get(format!("{}/verify?date=2025-02-30", server.base))
        .send()
        .await
        .expect("bad date");
    assert_eq!(bad_date.status(), StatusCode::BAD_REQUEST);
    let body: Value = bad_date.json().await.expect("json");
    assert_eq!(body["detail"], "Invalid date format, expected YYYY-MM-DD");

    let missing = client
        .get(format!("{}/verify?date=2001-01-01", server.base))
        .send()
        .await
        .expect("missing");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.expect("json");
    assert_eq!(body["detail"], "Log file not found for specified date");

    let oversized = client
        .post(format!("{}/events", server.base))
        .json(&json!({"events": [{"data": {"blob": "x".repeat(4096)}}]}))
        .send()
        .await
        .expect("oversized");
    assert_eq!(oversized.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let not_json = client
        .post(format!("{}/events", server.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("not json");
    assert!(not_json.status().is_client_error());

    assert_eq!(
        std::fs::read_dir(server.dir.path()).expect("dir").count(),
        0,
        "no request above may create a day-file"
    );

    server.stop().await;
}
