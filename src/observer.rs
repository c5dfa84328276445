//! Observer trait for workflow events.
//!
//! Inject an [`Arc<dyn WorkflowObserver>`] via
//! [`crate::workflow::Workflow::with_observer`] to refresh a view whenever
//! the staged set changes, show a busy indicator while a parse runs, and
//! display results. The library never prints; everything user-facing goes
//! through here.
//!
//! # Example
//!
//! ```rust
//! use krushflow_parser::{Document, WorkflowObserver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl WorkflowObserver for Counter {
//!     fn on_documents_changed(&self, documents: &[Document]) {
//!         self.0.store(documents.len(), Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::document::{Document, ParsedResult};
use std::sync::Arc;

/// The one message shown when a parse fails, whatever the cause.
pub const GENERIC_FAILURE_MESSAGE: &str = "Error parsing documents. Please try again.";

/// Called by [`crate::workflow::Workflow`] as its state changes.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait WorkflowObserver: Send + Sync {
    /// The staged collection changed (add, remove, clear, restore).
    fn on_documents_changed(&self, documents: &[Document]) {
        let _ = documents;
    }

    /// An intake ran out of slots.
    ///
    /// # Arguments
    /// * `accepted`: supported files that fitted in the remaining slots
    /// * `capacity`: configured maximum
    fn on_capacity_exceeded(&self, accepted: usize, capacity: usize) {
        let _ = (accepted, capacity);
    }

    /// A parse started; the trigger is unavailable until it ends.
    fn on_parse_start(&self, document_count: usize) {
        let _ = document_count;
    }

    /// Results should be displayed (after a parse or a restore).
    fn on_results(&self, results: &[ParsedResult]) {
        let _ = results;
    }

    /// Results were cleared and should be hidden.
    fn on_results_cleared(&self) {}

    /// A parse finished and everything was submitted.
    fn on_parse_complete(&self, result_count: usize) {
        let _ = result_count;
    }

    /// A parse failed. `message` is always [`GENERIC_FAILURE_MESSAGE`].
    fn on_parse_failed(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation; the default when no observer is configured.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias for the type stored in the workflow.
pub type SharedObserver = Arc<dyn WorkflowObserver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_documents_changed(&[]);
        obs.on_capacity_exceeded(28, 30);
        obs.on_parse_start(3);
        obs.on_results(&[]);
        obs.on_results_cleared();
        obs.on_parse_complete(3);
        obs.on_parse_failed(GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn arc_dyn_observer_works() {
        let obs: SharedObserver = Arc::new(NoopObserver);
        obs.on_parse_start(1);
        obs.on_parse_complete(1);
    }
}
