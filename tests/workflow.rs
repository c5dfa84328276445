//! Integration tests: the workflow talking to a real parse API on loopback.
//!
//! Each test binds its own server on `127.0.0.1:0` with private temp
//! directories, so tests run in parallel without sharing state.
//!
//! Run with:
//!   cargo test --test workflow -- --nocapture

#![cfg(feature = "server")]

use axum::{http::StatusCode, routing::post, Router};
use krushflow_parser::pipeline::storage::{CLIENT_KEY, SERVER_KEY};
use krushflow_parser::server::{self, sessions::SessionStore};
use krushflow_parser::{
    Confirmation, Document, ServerConfig, Workflow, WorkflowConfig, WorkflowObserver,
    GENERIC_FAILURE_MESSAGE,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs to the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Start the parse API on an ephemeral port; returns its base URL.
async fn spawn_api(data_dir: &Path) -> String {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        addr: addr.to_string(),
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    tokio::spawn(server::serve_on(listener, config, std::future::pending()));
    format!("http://{addr}")
}

/// Start a stand-in endpoint that rejects every submission with 500.
async fn spawn_failing_api() -> String {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/api/parse",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    tokio::spawn(async move { axum::serve(listener, app).await.ok() });
    format!("http://{addr}")
}

fn workflow(endpoint: &str, storage: &Path, persist_client_side: bool) -> Workflow {
    let config = WorkflowConfig::builder()
        .endpoint(endpoint)
        .storage_dir(storage)
        .simulated_delay_ms(0)
        .persist_client_side(persist_client_side)
        .build()
        .unwrap();
    Workflow::new(config).unwrap()
}

fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, vec![0x5a; len]).unwrap();
    p
}

#[derive(Default)]
struct Recorder {
    failures: Mutex<Vec<String>>,
    completed: Mutex<Vec<usize>>,
    capacity_alerts: Mutex<Vec<(usize, usize)>>,
    last_documents: Mutex<usize>,
}

impl WorkflowObserver for Recorder {
    fn on_documents_changed(&self, documents: &[Document]) {
        *self.last_documents.lock().unwrap() = documents.len();
    }
    fn on_capacity_exceeded(&self, accepted: usize, capacity: usize) {
        self.capacity_alerts.lock().unwrap().push((accepted, capacity));
    }
    fn on_parse_complete(&self, result_count: usize) {
        self.completed.lock().unwrap().push(result_count);
    }
    fn on_parse_failed(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}

// ── Parse-and-persist ────────────────────────────────────────────────────────

#[tokio::test]
async fn parse_produces_one_result_per_document() {
    let data = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    let url = spawn_api(data.path()).await;

    let recorder = Arc::new(Recorder::default());
    let mut wf = workflow(&url, storage.path(), false).with_observer(recorder.clone());
    wf.add_paths([
        write_file(files.path(), "scan.png", 2048),
        write_file(files.path(), "contract.pdf", 512),
        write_file(files.path(), "photo.jpg", 10),
    ])
    .await;

    let outcome = wf.parse_and_persist().await.unwrap().unwrap();
    assert_eq!(outcome.result_count, 3);
    assert!(outcome.server_cached);
    assert!(!outcome.client_saved);

    let results = wf.parsed_results();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].filename, "scan.png");
    assert_eq!(results[0].size, "2.00 KB");
    assert_eq!(results[0].metadata.format, "png");
    assert_eq!(results[0].extracted_text, "[Parsed content from scan.png]");
    assert_eq!(results[1].filename, "contract.pdf");
    assert_eq!(results[1].size, "0.50 KB");

    // The server recorded the batch as its first session.
    let response = outcome.server_response.unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["session_id"], 1);
    assert_eq!(response["total_documents"], 3);

    let sessions = SessionStore::new(data.path()).load().await.unwrap();
    assert_eq!(sessions.sessions.len(), 1);
    assert_eq!(sessions.sessions[0].documents[1].filename, "contract.pdf");

    // Server-echo slot is always written; the client slot was not opted in.
    assert!(wf.store().slot_path(SERVER_KEY).exists());
    assert!(!wf.store().slot_path(CLIENT_KEY).exists());
    assert_eq!(*recorder.completed.lock().unwrap(), vec![3]);
    assert!(recorder.failures.lock().unwrap().is_empty());
}

#[tokio::test]
async fn client_copy_survives_a_reload() {
    let data = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    let url = spawn_api(data.path()).await;

    let mut wf = workflow(&url, storage.path(), true);
    wf.add_paths([
        write_file(files.path(), "a.png", 100),
        write_file(files.path(), "b.pdf", 200),
    ])
    .await;
    let outcome = wf.parse_and_persist().await.unwrap().unwrap();
    assert!(outcome.client_saved);

    let mut reloaded = workflow(&url, storage.path(), false);
    let report = reloaded.restore().await;
    assert_eq!(report.client_documents, 2);
    assert_eq!(report.server_results, 2);
    assert_eq!(reloaded.documents(), wf.documents());
    assert_eq!(reloaded.parsed_results(), wf.parsed_results());
}

#[tokio::test]
async fn rejected_submission_caches_nothing() {
    let storage = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    let url = spawn_failing_api().await;

    let recorder = Arc::new(Recorder::default());
    let mut wf = workflow(&url, storage.path(), true).with_observer(recorder.clone());
    wf.add_paths([write_file(files.path(), "a.png", 64)]).await;

    let err = wf.parse_and_persist().await.unwrap_err();
    assert!(err.to_string().contains("500"), "unexpected error: {err}");

    assert!(wf.parsed_results().is_empty());
    assert_eq!(wf.documents().len(), 1);
    assert!(!wf.store().slot_path(SERVER_KEY).exists());
    assert!(!wf.store().slot_path(CLIENT_KEY).exists());
    assert_eq!(
        *recorder.failures.lock().unwrap(),
        vec![GENERIC_FAILURE_MESSAGE.to_string()]
    );
    assert!(recorder.completed.lock().unwrap().is_empty());
}

// ── Intake and clearing ──────────────────────────────────────────────────────

#[tokio::test]
async fn thirty_two_images_stage_thirty() {
    let storage = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();

    let recorder = Arc::new(Recorder::default());
    let mut wf = workflow("http://127.0.0.1:9", storage.path(), false).with_observer(recorder.clone());
    let paths: Vec<PathBuf> = (0..32)
        .map(|i| write_file(files.path(), &format!("img{i:02}.jpg"), 16))
        .collect();

    let report = wf.add_paths(&paths).await;
    assert_eq!(report.accepted, 30);
    assert!(report.capacity_exceeded());
    assert_eq!(wf.documents().len(), 30);
    assert_eq!(wf.documents()[29].name, "img29.jpg");
    assert_eq!(*recorder.capacity_alerts.lock().unwrap(), vec![(30, 30)]);
    assert_eq!(*recorder.last_documents.lock().unwrap(), 30);
}

#[tokio::test]
async fn confirmed_clear_wipes_documents_and_results() {
    let data = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    let url = spawn_api(data.path()).await;

    let mut wf = workflow(&url, storage.path(), true);
    wf.add_paths([write_file(files.path(), "a.png", 8)]).await;
    wf.parse_and_persist().await.unwrap();

    assert!(!wf.clear_all(Confirmation::Declined).await);
    assert_eq!(wf.documents().len(), 1);
    assert_eq!(wf.parsed_results().len(), 1);

    assert!(wf.clear_all(Confirmation::Confirmed).await);
    assert!(wf.documents().is_empty());
    assert!(wf.parsed_results().is_empty());
    assert!(!wf.store().slot_path(CLIENT_KEY).exists());
}
