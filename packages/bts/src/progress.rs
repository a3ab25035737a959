//! Progress reporting for the archive download.
//!
//! The pipeline reports downloaded bytes through [`ProgressCallback`];
//! rendering (an `indicatif` bar in the CLI, nothing in tests) is chosen by
//! the caller.

use std::sync::Arc;

/// Receives progress updates from a running sync.
///
/// Implementations must be `Send + Sync` because updates arrive from the
/// task that drives the download stream.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected bytes, when the server reports a length.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` bytes.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);

    /// Mark progress as complete and remove the progress indicator.
    fn finish_and_clear(&self);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
