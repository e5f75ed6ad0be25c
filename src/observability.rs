//! Registry counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    files_resolved: AtomicU64,
    files_unsupported: AtomicU64,
    thumbnails_created: AtomicU64,
    thumbnails_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_resolved(&self) {
        self.files_resolved.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "files_resolved", "Metric incremented");
    }

    pub fn file_unsupported(&self) {
        self.files_unsupported.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "files_unsupported", "Metric incremented");
    }

    pub fn thumbnail_created(&self) {
        self.thumbnails_created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "thumbnails_created", "Metric incremented");
    }

    pub fn thumbnail_failed(&self) {
        self.thumbnails_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "thumbnails_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_resolved: self.files_resolved.load(Ordering::Relaxed),
            files_unsupported: self.files_unsupported.load(Ordering::Relaxed),
            thumbnails_created: self.thumbnails_created.load(Ordering::Relaxed),
            thumbnails_failed: self.thumbnails_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_resolved: u64,
    pub files_unsupported: u64,
    pub thumbnails_created: u64,
    pub thumbnails_failed: u64,
}
