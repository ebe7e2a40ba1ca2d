//! End-to-end tests for medicheck-client.
//!
//! Each test starts a throwaway axum server on `127.0.0.1:0` that plays the
//! MediCheck backend, then drives the public API against it over real HTTP.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use medicheck_client::{
    markdown_to_html, validate_file, validate_stream, validate_to_file, ClientConfig,
    ControllerState, ErrorKind, MemoryView, RenderFormat, ResponseMode, SubmitOutcome,
    ValidateError, ValidationController, Verdict,
};
use serde_json::{json, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

const BUFFERED: &str = "/api/validate-summary";
const STREAM: &str = "/api/validate-summary-stream";

/// Bodies the mock received, in order.
type Received = Arc<Mutex<Vec<Value>>>;

/// Route library logs to the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serve `app` on an ephemeral port and return its base URL.
async fn spawn(app: Router) -> String {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

/// A buffered endpoint answering every POST with `status` and a raw body.
async fn buffered_server(status: StatusCode, body: &'static str) -> (String, Received) {
    let received: Received = Arc::default();
    let app = Router::new()
        .route(
            BUFFERED,
            post(
                move |State(seen): State<Received>, Json(payload): Json<Value>| async move {
                    seen.lock().unwrap().push(payload);
                    Response::builder()
                        .status(status)
                        .header("content-type", "application/json")
                        .body(Body::from(body))
                        .unwrap()
                },
            ),
        )
        .with_state(received.clone());
    (spawn(app).await, received)
}

/// Pause between streamed chunks, long enough for each to arrive on its own.
const CHUNK_GAP: Duration = Duration::from_millis(50);

/// An endpoint at `path` that answers `status`, sends `first`, then drops
/// the connection mid-body.
async fn broken_body_server(
    path: &'static str,
    status: StatusCode,
    first: &'static str,
) -> String {
    let app = Router::new().route(
        path,
        post(move || async move {
            let body = futures::stream::iter([
                Ok::<_, std::io::Error>(first),
                Err(std::io::Error::other("backend crashed")),
            ])
            .then(|item| async move {
                tokio::time::sleep(CHUNK_GAP).await;
                item
            });
            Response::builder()
                .status(status)
                .header("content-type", "text/markdown; charset=utf-8")
                .body(Body::from_stream(body))
                .unwrap()
        }),
    );
    spawn(app).await
}

/// A streaming endpoint that sends `chunks` with a short pause between them.
async fn streaming_server(chunks: Vec<&'static str>) -> String {
    let app = Router::new().route(
        STREAM,
        post(move |Json(_payload): Json<Value>| {
            let chunks = chunks.clone();
            async move {
                let body = futures::stream::iter(chunks).then(|c| async move {
                    tokio::time::sleep(CHUNK_GAP).await;
                    Ok::<_, std::io::Error>(c)
                });
                Response::builder()
                    .header("content-type", "text/markdown; charset=utf-8")
                    .body(Body::from_stream(body))
                    .unwrap()
            }
        }),
    );
    spawn(app).await
}

fn config(base: &str, mode: ResponseMode) -> ClientConfig {
    ClientConfig::builder()
        .base_url(base)
        .mode(mode)
        .format(RenderFormat::Html)
        .request_timeout_secs(10)
        .build()
        .expect("valid config")
}

fn json_file(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("temp file");
    f.write_all(contents.as_bytes()).expect("write temp file");
    f
}

const SUMMARY: &str = r#"{
  "patient_demographics": {"full_name": "Jane Roe", "dob": "1980-02-01"},
  "insurance_details": {"provider": "Acme Health", "policy_number": "P-1"}
}"#;

// ── Buffered endpoint ────────────────────────────────────────────────────────

#[tokio::test]
async fn buffered_message_is_rendered_and_payload_sent_verbatim() {
    let (base, received) = buffered_server(StatusCode::OK, r#"{"message":"OK"}"#).await;
    let f = json_file(SUMMARY);

    let report = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .expect("validation succeeds");

    assert_eq!(report.raw, "OK");
    assert_eq!(report.rendered, "OK");
    assert_eq!(report.chunks, 1);

    let expected: Value = serde_json::from_str(SUMMARY).unwrap();
    assert_eq!(received.lock().unwrap().as_slice(), &[expected]);
}

#[tokio::test]
async fn buffered_error_status_surfaces_detail() {
    let (base, _) = buffered_server(StatusCode::BAD_REQUEST, r#"{"detail":"bad input"}"#).await;
    let f = json_file(SUMMARY);

    let err = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .unwrap_err();

    assert!(matches!(err, ValidateError::Server { status: 400, .. }));
    assert_eq!(err.to_string(), "bad input");
    assert_eq!(err.kind(), ErrorKind::Server);
}

#[tokio::test]
async fn buffered_error_without_detail_is_generic_server_error() {
    let (base, _) = buffered_server(StatusCode::INTERNAL_SERVER_ERROR, "{}").await;
    let f = json_file(SUMMARY);

    let err = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Server error.");
}

#[tokio::test]
async fn buffered_reply_with_null_fields_still_renders() {
    let (base, _) =
        buffered_server(StatusCode::OK, r#"{"message":"OK","missing_fields":null}"#).await;
    let f = json_file(SUMMARY);

    let report = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .unwrap();

    assert_eq!(report.rendered, "OK");
}

#[tokio::test]
async fn buffered_fastapi_validation_error_is_server_error() {
    let (base, _) = buffered_server(
        StatusCode::UNPROCESSABLE_ENTITY,
        r#"{"detail":[{"loc":["body"],"msg":"field required","type":"missing"}]}"#,
    )
    .await;
    let f = json_file(SUMMARY);

    let err = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .unwrap_err();

    assert!(matches!(err, ValidateError::Server { status: 422, .. }));
    assert_eq!(err.to_string(), "field required");
}

#[tokio::test]
async fn buffered_reply_without_message_is_reported() {
    for body in ["{}", "", r#"{"message":""}"#] {
        let (base, _) = buffered_server(StatusCode::OK, body).await;
        let f = json_file(SUMMARY);

        let err = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
            .await
            .unwrap_err();

        assert!(matches!(err, ValidateError::NoMessage), "body {body:?}");
        assert_eq!(err.to_string(), "No message found in server reply.");
    }
}

#[tokio::test]
async fn buffered_non_json_reply_is_invalid_response() {
    let (base, _) = buffered_server(StatusCode::OK, "<html>gateway</html>").await;
    let f = json_file(SUMMARY);

    let err = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .unwrap_err();

    assert!(matches!(err, ValidateError::InvalidResponse { .. }));
    assert_eq!(err.to_string(), "Invalid response from server.");
}

#[tokio::test]
async fn buffered_verdict_fields_are_parsed() {
    let body = r#"{
        "message": "Summary is missing required fields.",
        "insurance_summary": true,
        "valid_summary": false,
        "missing_fields": ["hpi.onset", "hpi.duration", "diagnosis.icd10"],
        "suggestions": ["Add the onset date"],
        "request_id": "abc"
    }"#;
    let (base, _) = buffered_server(StatusCode::OK, body).await;
    let f = json_file(SUMMARY);

    let report = validate_file(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .unwrap();
    let reply = report.reply.expect("buffered report carries the reply");

    match reply.verdict() {
        Some(Verdict::ValidationFailed {
            missing,
            suggestions,
        }) => {
            assert_eq!(missing.len(), 2);
            assert_eq!(missing[0].section, "hpi");
            assert_eq!(suggestions, vec!["Add the onset date".to_string()]);
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
    assert_eq!(reply.extra.get("request_id"), Some(&json!("abc")));
}

// ── Streaming endpoint ───────────────────────────────────────────────────────

#[tokio::test]
async fn streamed_markdown_is_fully_rerendered() {
    let base = streaming_server(vec!["# Hel", "lo\n\n", "- item **one**\n"]).await;
    let f = json_file(SUMMARY);

    let report = validate_file(f.path(), &config(&base, ResponseMode::Streaming))
        .await
        .unwrap();

    let full = "# Hello\n\n- item **one**\n";
    assert_eq!(report.raw, full);
    assert_eq!(report.rendered, markdown_to_html(full));
    assert!(report.reply.is_none());
    assert!(report.chunks >= 1);
}

#[tokio::test]
async fn streamed_error_status_is_server_error() {
    let app = Router::new().route(
        STREAM,
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"detail": "payload rejected"})),
            )
                .into_response()
        }),
    );
    let base = spawn(app).await;
    let f = json_file(SUMMARY);

    let err = validate_file(f.path(), &config(&base, ResponseMode::Streaming))
        .await
        .unwrap_err();

    assert!(matches!(err, ValidateError::Server { status: 422, .. }));
    assert_eq!(err.to_string(), "payload rejected");
}

#[tokio::test]
async fn broken_error_body_is_transport_error() {
    let base = broken_body_server(STREAM, StatusCode::INTERNAL_SERVER_ERROR, "partial").await;
    let f = json_file(SUMMARY);

    let err = validate_file(f.path(), &config(&base, ResponseMode::Streaming))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport, "got {err:?}");
}

#[tokio::test]
async fn validate_stream_yields_raw_chunks() {
    let base = streaming_server(vec!["✅ Approved", "\n\nAll checks passed."]).await;
    let f = json_file(SUMMARY);

    let mut stream = validate_stream(f.path(), &config(&base, ResponseMode::Buffered))
        .await
        .unwrap();
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk.unwrap());
    }

    assert_eq!(text, "✅ Approved\n\nAll checks passed.");
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    // Bind then drop, so the port is very likely closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let f = json_file(SUMMARY);

    let err = validate_file(
        f.path(),
        &config(&format!("http://{addr}"), ResponseMode::Buffered),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
}

// ── Output ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn validate_to_file_writes_rendered_reply() {
    let base = streaming_server(vec!["## Result\n", "Approved"]).await;
    let f = json_file(SUMMARY);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out/verdict.html");

    let report = validate_to_file(f.path(), &out, &config(&base, ResponseMode::Streaming))
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, report.rendered);
    assert!(written.contains("<h2>Result</h2>"));
}

// ── Controller over HTTP ─────────────────────────────────────────────────────

#[tokio::test]
async fn controller_streams_into_view_and_hides_spinner() {
    let base = streaming_server(vec!["# Hel", "lo"]).await;
    let f = json_file(SUMMARY);
    let mut c =
        ValidationController::new(&config(&base, ResponseMode::Streaming), MemoryView::new())
            .unwrap();

    c.handle_file_selected(Some(f.path())).await;
    assert!(c.view().submit_enabled);

    let outcome = c.handle_submit().await;

    assert!(matches!(outcome, SubmitOutcome::Done(_)));
    assert_eq!(c.view().content, markdown_to_html("# Hello"));
    assert!(!c.view().loading);
    assert!(matches!(c.state(), ControllerState::Done { .. }));

    // Each chunk re-renders the whole document so far.
    let history = &c.view().history;
    let partial = history
        .iter()
        .position(|h| *h == markdown_to_html("# Hel"))
        .expect("first chunk rendered on its own");
    let full = history
        .iter()
        .position(|h| *h == markdown_to_html("# Hello"))
        .expect("full document rendered");
    assert!(partial < full);
}

#[tokio::test]
async fn controller_shows_inline_error_when_stream_breaks() {
    let base = broken_body_server(STREAM, StatusCode::OK, "# Partial\n").await;
    let f = json_file(SUMMARY);
    let mut c =
        ValidationController::new(&config(&base, ResponseMode::Streaming), MemoryView::new())
            .unwrap();

    c.handle_file_selected(Some(f.path())).await;
    let outcome = c.handle_submit().await;

    match outcome {
        SubmitOutcome::Failed(e) => assert_eq!(e.kind(), ErrorKind::Transport, "got {e:?}"),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(!c.view().loading);
    assert!(c
        .view()
        .content
        .starts_with("<span class=\"error\">Error: "));
    assert!(matches!(c.state(), ControllerState::Failed { .. }));
    assert!(c.view().submit_enabled);
}

#[tokio::test]
async fn controller_renders_server_error_inline() {
    let (base, _) = buffered_server(StatusCode::BAD_REQUEST, r#"{"detail":"bad input"}"#).await;
    let f = json_file(SUMMARY);
    let mut c =
        ValidationController::new(&config(&base, ResponseMode::Buffered), MemoryView::new())
            .unwrap();

    c.handle_file_selected(Some(f.path())).await;
    let outcome = c.handle_submit().await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(
        c.view().content,
        "<span class=\"error\">Error: bad input</span>"
    );
    assert!(!c.view().loading);
    assert!(c.view().submit_enabled);
}

#[tokio::test]
async fn controller_never_submits_invalid_json() {
    let (base, received) = buffered_server(StatusCode::OK, r#"{"message":"OK"}"#).await;
    let f = json_file("{\"truncated\": ");
    let mut c =
        ValidationController::new(&config(&base, ResponseMode::Buffered), MemoryView::new())
            .unwrap();

    c.handle_file_selected(Some(f.path())).await;
    let outcome = c.handle_submit().await;

    assert!(matches!(outcome, SubmitOutcome::Skipped));
    assert!(received.lock().unwrap().is_empty());
    assert!(c.view().content.contains("Invalid JSON file."));
}
