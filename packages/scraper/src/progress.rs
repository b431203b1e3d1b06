//! Progress reporting for walks and extraction batches.
//!
//! The walker reports one unit per collected address (with the item limit
//! as total, when there is one); the extractor reports one unit per detail
//! page. Rendering is left to the caller.

use std::sync::Arc;

/// Receiver of progress updates.
pub trait ProgressCallback: Send + Sync {
    /// Sets the expected number of units (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the status message (current page or item).
    fn set_message(&self, msg: String);

    /// Marks the phase as complete with a final message.
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

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::ProgressCallback;

    /// Keeps the last total, the running position and the final message.
    #[derive(Default)]
    pub struct RecordingProgress {
        pub total: Mutex<Option<u64>>,
        pub position: Mutex<u64>,
        pub finished: Mutex<Option<String>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn set_total(&self, total: u64) {
            *self.total.lock().unwrap() = Some(total);
        }

        fn inc(&self, delta: u64) {
            *self.position.lock().unwrap() += delta;
        }

        fn set_message(&self, _msg: String) {}

        fn finish(&self, msg: String) {
            *self.finished.lock().unwrap() = Some(msg);
        }
    }
}
