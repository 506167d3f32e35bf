//! Progress reporting for imports.
//!
//! The pipeline reports one unit of work per source feature (or CSV row).
//! Rendering is left to the caller: the CLI draws `indicatif` bars, library
//! users and tests pass [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from an import session.
pub trait ProgressCallback: Send + Sync {
    /// Sets the number of features in the file being processed.
    fn set_total(&self, total: u64);

    /// Advances by `delta` features.
    fn inc(&self, delta: u64);

    /// Updates the label shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the current file as done.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
