//! A [`Reporter`] that writes through `tracing`.

use dlvsix_core::Reporter;
use dlvsix_core::summary::bytes_to_human;

/// Routes progress and status to the tracing subscriber.
///
/// Byte-level download progress is only visible at `trace` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn section(&self, title: &str) {
        tracing::info!("== {title} ==");
    }

    fn downloading(&self, artifact: &str, current: u64, total: Option<u64>) {
        match total {
            Some(total) => tracing::trace!("{artifact}: {current}/{total} bytes"),
            None => tracing::trace!("{artifact}: {current} bytes"),
        }
    }

    fn done(&self, artifact: &str, detail: &str, size: Option<u64>) {
        match size {
            Some(size) => tracing::info!("{artifact}: {detail} ({})", bytes_to_human(size)),
            None => tracing::info!("{artifact}: {detail}"),
        }
    }

    fn failed(&self, artifact: &str, reason: &str) {
        tracing::error!("{artifact}: {reason}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warning(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        tracing::info!("{action} {count} in {elapsed_secs:.1}s");
    }
}
