//! Error types for the krushflow-parser library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ParserError`]: **Fatal** for one invocation: the remote endpoint
//!   rejected the batch, could not be reached, or the configuration is
//!   invalid. Returned as `Err(ParserError)` from
//!   [`crate::workflow::Workflow::parse_and_persist`] and the server entry
//!   point.
//!
//! * [`StorageError`]: **Non-fatal**: a local-storage slot could not be
//!   read or written. The workflow logs these and carries on; they are never
//!   surfaced to the user.
//!
//! Validation failures (unsupported type, capacity exceeded) are not errors
//! at all. They are counted in [`crate::pipeline::intake::IntakeReport`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the krushflow-parser library.
#[derive(Debug, Error)]
pub enum ParserError {
    // ── Remote errors ─────────────────────────────────────────────────────
    /// The parse endpoint answered with a non-success status.
    #[error("Parse endpoint '{url}' rejected the batch with HTTP {status}")]
    RemoteRejected { url: String, status: u16 },

    /// The request never produced a response (DNS, refused, reset …).
    #[error("Could not reach parse endpoint '{url}': {reason}\nIs `krushflow serve` running?")]
    RemoteUnreachable { url: String, reason: String },

    /// The optional request timeout elapsed.
    #[error("Parse endpoint '{url}' did not answer within {secs}s")]
    RemoteTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Server errors ─────────────────────────────────────────────────────
    /// Binding the listener or running the accept loop failed.
    #[error("Server error on '{addr}': {source}")]
    Serve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal local-storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading, writing, renaming or deleting a slot file failed.
    #[error("Storage I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The value could not be serialised to JSON.
    #[error("Could not serialise '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The slot exists but does not hold the expected JSON.
    #[error("Slot '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
