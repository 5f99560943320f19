//! Tallies of a fetch run.

/// Counts of what a download run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub cached: usize,
    /// Nothing to fetch (not in the marketplace, or dry run).
    pub skipped: usize,
    pub failed: usize,
}

impl FetchSummary {
    pub fn merge(&mut self, other: FetchSummary) {
        self.downloaded += other.downloaded;
        self.cached += other.cached;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.cached + self.skipped + self.failed
    }
}

/// Format a byte count with one decimal: `1.5 MB`.
pub fn bytes_to_human(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
