//! Progress reporting for batch resolution.
//!
//! [`ProgressCallback`] decouples the batch runner from any rendering
//! backend: the CLI plugs in an `indicatif` bar, tests and library callers
//! use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates while a batch is resolved.
///
/// Implementations must be `Send + Sync` so one instance can be shared
/// through an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of rows (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` rows.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
