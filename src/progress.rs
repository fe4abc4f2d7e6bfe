//! Progress-callback trait for run and per-task events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive events
//! as workers claim and finish images. The CLI uses it to drive a live
//! spinner; library callers can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use nova_ocr::{RunConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_task_complete(&self, _worker: usize, image: &str, text_len: usize) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{n} {image} ({text_len} chars)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { done: AtomicUsize::new(0) });
//! let config = RunConfig::builder("arn:aws:bedrock:us-west-2:0:inference-profile/x")
//!     .progress_callback(counter as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::run::RunSummary;
use std::sync::Arc;
use std::time::Duration;

/// Called by the worker pool during a run.
///
/// Implementations must be `Send + Sync`: every worker calls into the same
/// instance concurrently. All methods default to no-ops.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after the image list is loaded, before workers start.
    fn on_run_start(&self, images: usize, workers: usize, duration: Duration) {
        let _ = (images, workers, duration);
    }

    /// Called when a worker claims an image.
    fn on_task_start(&self, worker: usize, image: &str) {
        let _ = (worker, image);
    }

    /// Called when both output files for an image were written.
    ///
    /// `text_len` is the byte length of the extracted text.
    fn on_task_complete(&self, worker: usize, image: &str, text_len: usize) {
        let _ = (worker, image, text_len);
    }

    /// Called when a task failed; the error has already been logged.
    fn on_task_error(&self, worker: usize, image: &str, error: &str) {
        let _ = (worker, image, error);
    }

    /// Called once after every worker has exited.
    fn on_run_complete(&self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_task_start(&self, _worker: usize, _image: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_task_complete(&self, _worker: usize, _image: &str, _text_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_task_error(&self, _worker: usize, _image: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3, 2, Duration::from_secs(5));
        cb.on_task_start(0, "a.png");
        cb.on_task_complete(0, "a.png", 42);
        cb.on_task_error(1, "b.png", "boom");
        cb.on_run_complete(&RunSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events_through_arc_dyn() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: ProgressCallback = tracker.clone();

        cb.on_task_start(0, "a.png");
        cb.on_task_complete(0, "a.png", 10);
        cb.on_task_start(1, "b.png");
        cb.on_task_error(1, "b.png", "throttled");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
