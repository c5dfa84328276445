//! The staging workflow controller.
//!
//! [`Workflow`] owns the staged documents and the current parse results and
//! is the only thing that mutates them. A view renders what the controller
//! reports through its [`WorkflowObserver`]; it never holds the collections
//! itself.
//!
//! ## Parse-and-persist
//!
//! ```text
//! Idle ──parse──▶ Parsing ──(delay → extract → submit → cache)──▶ Idle
//! ```
//!
//! The batch is submitted before anything is cached locally, so a rejected
//! submission leaves both storage slots and the previous results untouched.

use crate::config::WorkflowConfig;
use crate::document::{Document, DocumentId, ParsedResult};
use crate::error::ParserError;
use crate::observer::{NoopObserver, SharedObserver, GENERIC_FAILURE_MESSAGE};
use crate::pipeline::extract::{extract_all, Extractor, PlaceholderExtractor};
use crate::pipeline::intake::{self, CandidateFile, IntakeReport};
use crate::pipeline::remote::RemoteClient;
use crate::pipeline::storage::{ClientSnapshot, LocalStore, ServerSnapshot};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Where the parse state machine currently is.
///
/// `Parsing` is only held inside [`Workflow::parse_and_persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Parsing,
}

/// Explicit answer to "clear all documents and data?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(v: bool) -> Self {
        if v {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

/// Summary of a successful parse-and-persist run.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub result_count: usize,
    /// JSON body of the endpoint's answer, when it sent one.
    pub server_response: Option<serde_json::Value>,
    /// The server-echo slot was written.
    pub server_cached: bool,
    /// The client slot was written (only attempted when opted in).
    pub client_saved: bool,
    pub duration_ms: u64,
}

/// What [`Workflow::restore`] found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub client_documents: usize,
    pub client_results: usize,
    pub server_results: usize,
}

/// Controller owning the staged documents and their results.
pub struct Workflow {
    config: WorkflowConfig,
    documents: Vec<Document>,
    parsed_results: Vec<ParsedResult>,
    phase: Phase,
    store: LocalStore,
    remote: RemoteClient,
    extractor: Arc<dyn Extractor>,
    observer: SharedObserver,
}

impl Workflow {
    /// Create an empty workflow. Nothing is loaded until [`Workflow::restore`].
    pub fn new(config: WorkflowConfig) -> Result<Self, ParserError> {
        let remote = RemoteClient::from_config(&config)?;
        let store = LocalStore::new(config.storage_dir.clone());
        Ok(Self {
            config,
            documents: Vec::new(),
            parsed_results: Vec::new(),
            phase: Phase::Idle,
            store,
            remote,
            extractor: Arc::new(PlaceholderExtractor),
            observer: Arc::new(NoopObserver),
        })
    }

    /// Replace the placeholder extraction engine.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn parsed_results(&self) -> &[ParsedResult] {
        &self.parsed_results
    }

    /// Current phase.
    ///
    /// [`Workflow::parse_and_persist`] borrows the workflow mutably for the
    /// whole run, so any caller able to ask sees `Idle`. Views that need the
    /// busy state follow `on_parse_start` and `on_parse_complete` /
    /// `on_parse_failed` on the observer instead.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn remaining_slots(&self) -> usize {
        self.config.capacity.saturating_sub(self.documents.len())
    }

    pub fn persist_client_side(&self) -> bool {
        self.config.persist_client_side
    }

    /// The opt-in toggle for the client slot.
    pub fn set_persist_client_side(&mut self, enabled: bool) {
        self.config.persist_client_side = enabled;
    }

    // ── Restore ─────────────────────────────────────────────────────────────

    /// Reload both storage slots.
    ///
    /// The client slot repopulates documents and results; the server slot,
    /// when it holds results, then overwrites the results. No merge.
    pub async fn restore(&mut self) -> RestoreReport {
        let mut report = RestoreReport::default();

        match self.store.load_client().await {
            Ok(Some(snapshot)) => {
                let mut documents = snapshot.documents;
                if documents.len() > self.config.capacity {
                    warn!(
                        "Client snapshot holds {} documents; keeping the first {}",
                        documents.len(),
                        self.config.capacity
                    );
                    documents.truncate(self.config.capacity);
                }
                self.documents = documents;
                self.parsed_results = snapshot.parsed_results;
                report.client_documents = self.documents.len();
                report.client_results = self.parsed_results.len();

                if !self.parsed_results.is_empty() {
                    self.observer.on_results(&self.parsed_results);
                }
                self.observer.on_documents_changed(&self.documents);
                info!(
                    "Loaded {} documents from client storage",
                    report.client_documents
                );
            }
            Ok(None) => debug!("No client snapshot"),
            Err(e) => error!("Client storage load failed: {e}"),
        }

        match self.store.load_server().await {
            Ok(Some(snapshot)) if !snapshot.documents.is_empty() => {
                report.server_results = snapshot.documents.len();
                self.parsed_results = snapshot.documents;
                self.observer.on_results(&self.parsed_results);
                info!(
                    "Loaded {} results from server storage ({})",
                    report.server_results, snapshot.timestamp
                );
            }
            Ok(_) => debug!("No server snapshot"),
            Err(e) => error!("Server storage load failed: {e}"),
        }

        report
    }

    // ── Intake / removal ────────────────────────────────────────────────────

    /// Stage files from disk.
    pub async fn add_paths<P: AsRef<Path>>(&mut self, paths: impl IntoIterator<Item = P>) -> IntakeReport {
        let candidates = paths.into_iter().map(CandidateFile::from_path).collect();
        self.add_files(candidates).await
    }

    /// Stage already-described candidate files.
    pub async fn add_files(&mut self, candidates: Vec<CandidateFile>) -> IntakeReport {
        let (documents, report) =
            intake::intake(candidates, self.remaining_slots(), self.config.read_concurrency).await;
        self.documents.extend(documents);

        if report.capacity_exceeded() {
            warn!(
                "Capacity reached: {} staged, {} rejected (max {})",
                report.accepted, report.over_capacity, self.config.capacity
            );
            self.observer
                .on_capacity_exceeded(report.accepted, self.config.capacity);
        }
        info!("Intake: {report}");
        self.observer.on_documents_changed(&self.documents);
        report
    }

    /// Remove the document with `id`. Returns `false` if it was not staged.
    pub fn remove(&mut self, id: DocumentId) -> bool {
        let Some(pos) = self.documents.iter().position(|d| d.id == id) else {
            debug!("remove: {id} not staged");
            return false;
        };
        let removed = self.documents.remove(pos);
        debug!("Removed '{}' ({id})", removed.name);
        self.observer.on_documents_changed(&self.documents);
        true
    }

    /// Empty documents and results. Also deletes the client slot when local
    /// persistence is enabled. Does nothing unless confirmed.
    pub async fn clear_all(&mut self, confirmation: Confirmation) -> bool {
        if confirmation != Confirmation::Confirmed {
            debug!("clear_all declined");
            return false;
        }

        self.documents.clear();
        self.parsed_results.clear();
        self.observer.on_documents_changed(&self.documents);
        self.observer.on_results_cleared();

        if self.config.persist_client_side {
            if let Err(e) = self.store.remove_client().await {
                error!("Client storage delete failed: {e}");
            }
        }

        info!("All data cleared");
        true
    }

    // ── Parse ───────────────────────────────────────────────────────────────

    /// Run the parse-and-persist sequence over every staged document.
    ///
    /// Returns `Ok(None)` without any side effect when nothing is staged.
    ///
    /// # Errors
    /// Any [`ParserError`] from the submission. The observer only ever sees
    /// [`GENERIC_FAILURE_MESSAGE`]; the detail goes to the log.
    pub async fn parse_and_persist(&mut self) -> Result<Option<ParseOutcome>, ParserError> {
        if self.documents.is_empty() {
            debug!("Nothing staged; parse skipped");
            return Ok(None);
        }

        let start = Instant::now();
        let count = self.documents.len();
        self.phase = Phase::Parsing;
        self.observer.on_parse_start(count);
        info!("Parsing {count} documents");

        let result = self.run_parse(start).await;

        self.phase = Phase::Idle;
        match result {
            Ok(outcome) => {
                info!(
                    "Parse complete: {} results in {}ms",
                    outcome.result_count, outcome.duration_ms
                );
                self.observer.on_parse_complete(outcome.result_count);
                Ok(Some(outcome))
            }
            Err(e) => {
                error!("Parsing error: {e}");
                self.observer.on_parse_failed(GENERIC_FAILURE_MESSAGE);
                Err(e)
            }
        }
    }

    async fn run_parse(&mut self, start: Instant) -> Result<ParseOutcome, ParserError> {
        // ── Step 1: Simulated processing ─────────────────────────────────────
        if self.config.simulated_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.simulated_delay_ms)).await;
        }

        // ── Step 2: Extract ─────────────────────────────────────────────────
        let results = extract_all(self.extractor.as_ref(), &self.documents);

        // ── Step 3: Submit raw documents ────────────────────────────────────
        let server_response = self.remote.submit(&self.documents).await?;

        // ── Step 4: Commit and cache ────────────────────────────────────────
        self.parsed_results = results;
        self.observer.on_results(&self.parsed_results);

        let timestamp = Utc::now();
        let server_snapshot = ServerSnapshot {
            documents: self.parsed_results.clone(),
            timestamp,
            count: self.parsed_results.len(),
        };
        let server_cached = match self.store.save_server(&server_snapshot).await {
            Ok(()) => true,
            Err(e) => {
                error!("Server-echo cache write failed: {e}");
                false
            }
        };

        let client_saved = if self.config.persist_client_side {
            let snapshot = ClientSnapshot {
                documents: self.documents.clone(),
                parsed_results: self.parsed_results.clone(),
                timestamp,
            };
            match self.store.save_client(&snapshot).await {
                Ok(()) => true,
                Err(e) => {
                    error!("Client storage save failed: {e}");
                    false
                }
            }
        } else {
            false
        };

        Ok(ParseOutcome {
            result_count: self.parsed_results.len(),
            server_response,
            server_cached,
            client_saved,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
