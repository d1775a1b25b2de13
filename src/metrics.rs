use std::sync::atomic::{AtomicU64, Ordering};

/// In-process observability counters.
///
/// Relaxed atomics: these are counted on the hot path and are never used
/// as a synchronization point, only queried via [`Metrics::snapshot`] for
/// diagnostics. Not wired to any exporter.
#[derive(Debug, Default)]
pub struct Metrics {
    events_published: AtomicU64,
    events_consumed: AtomicU64,
    batches_consumed: AtomicU64,
    capacity_waits: AtomicU64,
    timeouts: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_consumed(&self, count: u64) {
        self.events_consumed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch(&self) {
        self.batches_consumed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_capacity_wait(&self) {
        self.capacity_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes an immutable point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_consumed: self.events_consumed.load(Ordering::Relaxed),
            batches_consumed: self.batches_consumed.load(Ordering::Relaxed),
            capacity_waits: self.capacity_waits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`Metrics`]'s counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_published: u64,
    pub events_consumed: u64,
    pub batches_consumed: u64,
    pub capacity_waits: u64,
    pub timeouts: u64,
}
