//! Pipeline stages of the document staging workflow.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ encode ──▶ (staged) ──▶ extract ──▶ remote ──▶ storage
//! (filter,    (data URI)              (Extractor)  (POST)    (client /
//!  capacity)                                                  server slots)
//! ```
//!
//! 1. [`intake`] : drop unsupported types, apply the capacity policy, read files
//! 2. [`encode`] : wrap file bytes as base64 data URIs (and decode them back)
//! 3. [`extract`]: derive one `ParsedResult` per document behind a trait
//! 4. [`remote`] : submit the raw batch; the only stage with network I/O
//! 5. [`storage`]: best-effort JSON slots for client and server snapshots

pub mod encode;
pub mod extract;
pub mod intake;
pub mod remote;
pub mod storage;
