use crate::backoff::Backoff;
use crate::barrier::SequenceBarrier;
use crate::error::WaitError;
use crate::invariants::debug_assert_bounded_claim;
use crate::metrics::Metrics;
use crate::sequence::Sequence;
use crate::sequence_set::{FixedSequenceSet, MutableSequenceSet};
use crate::wait::WaitStrategy;
use std::cell::UnsafeCell;
use std::sync::Arc;

/// Single-producer claim/publish coordinator.
///
/// Owns the published cursor (`index`), the set of gating (consumer)
/// sequences the producer must stay behind, and the producer-local claim
/// bookkeeping (`next_value`, `cached_value`).
///
/// `next_value` and `cached_value` are mutated only by the thread that
/// calls the `next*`/`try_next*`/`claim` family: the single-producer
/// contract this type assumes. They live in `UnsafeCell`s rather than a
/// `Cell` so the sequencer itself stays `Sync` and can be shared (via
/// `Arc`) with the consumer side that reads `index` and the gating set.
pub struct SingleProducerSequencer {
    buffer_size: i64,
    wait_strategy: Arc<dyn WaitStrategy>,
    index: Arc<Sequence>,
    gating: MutableSequenceSet,
    next_value: UnsafeCell<i64>,
    cached_value: UnsafeCell<i64>,
    metrics: Arc<Metrics>,
}

// Safety: `next_value`/`cached_value` are only ever touched from the
// single producer thread by contract; `index` and `gating` are already
// internally synchronized.
unsafe impl Sync for SingleProducerSequencer {}

impl SingleProducerSequencer {
    pub fn new(buffer_size: i64, wait_strategy: Arc<dyn WaitStrategy>, metrics: Arc<Metrics>) -> Self {
        Self {
            buffer_size,
            wait_strategy,
            index: Arc::new(Sequence::default()),
            gating: MutableSequenceSet::new(),
            next_value: UnsafeCell::new(Sequence::INITIAL_VALUE),
            cached_value: UnsafeCell::new(Sequence::INITIAL_VALUE),
            metrics,
        }
    }

    pub fn buffer_size(&self) -> i64 {
        self.buffer_size
    }

    pub fn index(&self) -> &Arc<Sequence> {
        &self.index
    }

    pub fn wait_strategy(&self) -> &Arc<dyn WaitStrategy> {
        &self.wait_strategy
    }

    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        self.metrics.snapshot()
    }

    #[inline]
    fn next_value(&self) -> i64 {
        // Safety: single producer thread.
        unsafe { *self.next_value.get() }
    }

    #[inline]
    fn set_next_value(&self, v: i64) {
        unsafe { *self.next_value.get() = v };
    }

    #[inline]
    fn cached_value(&self) -> i64 {
        unsafe { *self.cached_value.get() }
    }

    #[inline]
    fn set_cached_value(&self, v: i64) {
        unsafe { *self.cached_value.get() = v };
    }

    /// Claims the next sequence, waiting (with backoff) until there is
    /// room. Never fails; blocks indefinitely if consumers stall.
    pub fn next(&self) -> i64 {
        self.next_n(1)
    }

    /// Claims `n` sequences at once, returning the highest one.
    pub fn next_n(&self, n: i64) -> i64 {
        debug_assert!(n >= 1, "next_n requires n >= 1, got {n}");
        let next_value = self.next_value();
        let next_serial = next_value + n;
        let wrap_point = next_serial - self.buffer_size;
        let cached_value = self.cached_value();

        if wrap_point > cached_value || cached_value > next_value {
            self.metrics.record_capacity_wait();
            let mut backoff = Backoff::new();
            loop {
                let min_gating = self.gating.get_or(next_value);
                if wrap_point <= min_gating {
                    self.set_cached_value(min_gating);
                    debug_assert_bounded_claim!(wrap_point, min_gating);
                    break;
                }
                self.wait_strategy.signal_all_when_blocking();
                backoff.snooze();
            }
        }

        self.set_next_value(next_serial);
        next_serial
    }

    pub fn try_next(&self) -> Result<i64, WaitError> {
        self.try_next_n(1)
    }

    pub fn try_next_n(&self, n: i64) -> Result<i64, WaitError> {
        debug_assert!(n >= 1, "try_next_n requires n >= 1, got {n}");
        let next_value = self.next_value();
        let next_serial = next_value + n;
        let wrap_point = next_serial - self.buffer_size;
        let cached_value = self.cached_value();

        if wrap_point > cached_value || cached_value > next_value {
            let min_gating = self.gating.get_or(next_value);
            self.set_cached_value(min_gating);
            if wrap_point > min_gating {
                return Err(WaitError::InsufficientCapacity);
            }
        }

        self.set_next_value(next_serial);
        Ok(next_serial)
    }

    pub fn has_available_capacity(&self, n: i64) -> bool {
        let next_value = self.next_value();
        let wrap_point = next_value + n - self.buffer_size;
        let cached_value = self.cached_value();
        if wrap_point > cached_value || cached_value > next_value {
            let min_gating = self.gating.get_or(next_value);
            self.set_cached_value(min_gating);
            wrap_point <= min_gating
        } else {
            true
        }
    }

    pub fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value();
        let consumed = self.gating.get_or(next_value);
        self.buffer_size - (next_value - consumed)
    }

    /// Pre-positions `next_value` without any capacity check; used to
    /// reposition the producer cursor for replay/recovery.
    pub fn claim(&self, sequence: i64) {
        self.set_next_value(sequence);
    }

    pub fn publish(&self, sequence: i64) {
        self.index.set(sequence);
        self.metrics.record_published();
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Single-producer variant: equivalent to `publish(hi)` since slot
    /// writes in `[lo, hi]` are naturally ordered by the lone writer.
    pub fn publish_range(&self, _lo: i64, hi: i64) {
        self.publish(hi);
    }

    pub fn is_available(&self, sequence: i64) -> bool {
        sequence <= self.index.get()
    }

    /// For a single producer the cursor already represents a contiguous
    /// published prefix, so this is the identity function over `available`.
    pub fn get_highest_published_serial(&self, _lower_bound: i64, available: i64) -> i64 {
        available
    }

    pub fn add_gating_serial(&self, sequence: Arc<Sequence>) {
        self.gating.add_while_running(&self.index, sequence);
    }

    pub fn add_gating_serials(&self, sequences: &[Arc<Sequence>]) {
        self.gating.add_all_while_running(&self.index, sequences);
    }

    pub fn remove_gating_serial(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating.remove(sequence)
    }

    /// Constructs a barrier over this sequencer's cursor. An empty `track`
    /// depends directly on the producer cursor; a non-empty one depends on
    /// the minimum of the named upstream sequences.
    pub fn new_barrier(&self, track: Vec<Arc<Sequence>>) -> SequenceBarrier {
        let dependent: Arc<dyn crate::wait::SequenceSource> = if track.is_empty() {
            Arc::clone(&self.index) as Arc<dyn crate::wait::SequenceSource>
        } else {
            Arc::new(FixedSequenceSet::new(track))
        };
        SequenceBarrier::new(Arc::clone(&self.index), dependent, Arc::clone(&self.wait_strategy))
    }
}
