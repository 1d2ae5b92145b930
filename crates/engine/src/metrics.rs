use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct Counters {
    rows_loaded: AtomicU64,
    batches_loaded: AtomicU64,
    rows_dropped: AtomicU64,
    batches_dropped: AtomicU64,
    parse_skips: AtomicU64,
    transient_errors: AtomicU64,
}

/// Shared run counters, safe to update from any worker.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<Counters>,
}

/// Point-in-time copy of the counters, reported in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rows_loaded: u64,
    pub batches_loaded: u64,
    pub rows_dropped: u64,
    pub batches_dropped: u64,
    pub parse_skips: u64,
    pub transient_errors: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn increment_rows_loaded(&self, count: u64) {
        self.inner.rows_loaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches_loaded(&self, count: u64) {
        self.inner.batches_loaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_rows_dropped(&self, count: u64) {
        self.inner.rows_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches_dropped(&self, count: u64) {
        self.inner
            .batches_dropped
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_parse_skips(&self, count: u64) {
        self.inner.parse_skips.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_transient_errors(&self, count: u64) {
        self.inner
            .transient_errors
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_loaded: self.inner.rows_loaded.load(Ordering::Relaxed),
            batches_loaded: self.inner.batches_loaded.load(Ordering::Relaxed),
            rows_dropped: self.inner.rows_dropped.load(Ordering::Relaxed),
            batches_dropped: self.inner.batches_dropped.load(Ordering::Relaxed),
            parse_skips: self.inner.parse_skips.load(Ordering::Relaxed),
            transient_errors: self.inner.transient_errors.load(Ordering::Relaxed),
        }
    }
}
