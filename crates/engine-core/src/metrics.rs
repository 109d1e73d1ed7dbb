use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_emitted: AtomicU64,
    checkpoints_emitted: AtomicU64,
    snapshot_documents: AtomicU64,
    change_events: AtomicU64,
    heartbeats: AtomicU64,
}

/// Counters shared by the iterators of one sync run.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_emitted: u64,
    pub checkpoints_emitted: u64,
    pub snapshot_documents: u64,
    pub change_events: u64,
    pub heartbeats: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_records(&self, count: u64) {
        self.inner
            .records_emitted
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_checkpoints(&self, count: u64) {
        self.inner
            .checkpoints_emitted
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_snapshot_documents(&self, count: u64) {
        self.inner
            .snapshot_documents
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_change_events(&self, count: u64) {
        self.inner.change_events.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_heartbeats(&self, count: u64) {
        self.inner.heartbeats.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_emitted: self.inner.records_emitted.load(Ordering::Relaxed),
            checkpoints_emitted: self.inner.checkpoints_emitted.load(Ordering::Relaxed),
            snapshot_documents: self.inner.snapshot_documents.load(Ordering::Relaxed),
            change_events: self.inner.change_events.load(Ordering::Relaxed),
            heartbeats: self.inner.heartbeats.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
