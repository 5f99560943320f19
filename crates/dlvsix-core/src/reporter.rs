//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation. Artifacts are
//! identified by their file name (e.g. `ms-python.python-2024.1.0@linux-x64.vsix`).

pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Extensions", "Installing").
    fn section(&self, title: &str);

    /// Updates the progress of a download.
    fn downloading(&self, artifact: &str, current: u64, total: Option<u64>);

    /// Marks an artifact as successfully completed.
    fn done(&self, artifact: &str, detail: &str, size: Option<u64>);

    /// Marks an artifact as failed with a specific reason.
    fn failed(&self, artifact: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, artifact: &str, current: u64, total: Option<u64>) {
        (**self).downloading(artifact, current, total);
    }
    fn done(&self, artifact: &str, detail: &str, size: Option<u64>) {
        (**self).done(artifact, detail, size);
    }
    fn failed(&self, artifact: &str, reason: &str) {
        (**self).failed(artifact, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn done(&self, _: &str, _: &str, _: Option<u64>) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
