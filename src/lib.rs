//! # krushflow-parser
//!
//! Stage a batch of image and PDF files, derive a result per file, and
//! persist the batch both locally and to a parse API.
//!
//! ## Workflow Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Intake    drop non-image/PDF types, fill at most `capacity` slots
//!  ├─ 2. Encode    read each file into a base64 data URI
//!  ├─ 3. Extract   one ParsedResult per Document (pluggable Extractor)
//!  ├─ 4. Submit    POST the raw batch to `{endpoint}/api/parse`
//!  └─ 5. Cache     server-echo slot always, client slot when opted in
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use krushflow_parser::{Workflow, WorkflowConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WorkflowConfig::builder()
//!         .endpoint("http://127.0.0.1:5000")
//!         .storage_dir("/tmp/krushflow")
//!         .build()?;
//!     let mut workflow = Workflow::new(config)?;
//!     workflow.restore().await;
//!
//!     let report = workflow.add_paths(["receipt.jpg", "contract.pdf"]).await;
//!     eprintln!("{report}");
//!
//!     if let Some(outcome) = workflow.parse_and_persist().await? {
//!         eprintln!("{} results", outcome.result_count);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `krushflow` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables [`server`], the parse API (axum + tower-http + image) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod observer;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServerConfig, WorkflowConfig, WorkflowConfigBuilder, DEFAULT_CAPACITY};
pub use document::{format_size, Dimension, Document, DocumentId, ParsedMetadata, ParsedResult};
pub use error::{ParserError, StorageError};
pub use observer::{NoopObserver, SharedObserver, WorkflowObserver, GENERIC_FAILURE_MESSAGE};
pub use pipeline::extract::{Extractor, PlaceholderExtractor};
pub use pipeline::intake::{CandidateFile, IntakeReport};
pub use pipeline::storage::{ClientSnapshot, LocalStore, ServerSnapshot};
pub use workflow::{Confirmation, ParseOutcome, Phase, RestoreReport, Workflow};
