use crate::barrier::SequenceBarrier;
use crate::error::WaitError;
use crate::invariants::{debug_assert_available, debug_assert_in_claim};
use crate::metrics::Metrics;
use crate::sequence::Sequence;
use crate::sequencer::SingleProducerSequencer;
use crate::wait::WaitStrategy;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::Arc;

/// Bytes a hot slot run is padded by on each side, isolating it from
/// neighbouring heap metadata (the `Box<[_]>`'s own header, adjacent
/// allocations). Not a tuned value, just comfortably larger than one
/// cache line.
const PAD_BYTES: usize = 128;

/// The pre-allocated event slot array plus the [`SingleProducerSequencer`]
/// that coordinates access to it.
///
/// Every hot slot is populated exactly once, by the factory, at
/// construction; slot identity is stable for the life of the ring. Padding
/// slots on either side of the hot range are left uninitialized and are
/// never read, written, or dropped.
pub struct RingBuffer<T> {
    entries: Box<[UnsafeCell<MaybeUninit<T>>]>,
    pad: usize,
    mask: i64,
    sequencer: SingleProducerSequencer,
}

// Safety: slots are written by exactly one producer between `next` and
// `publish`, and read by consumers only for sequences the sequencer
// reports as available: the same single-writer protocol the sequencer
// itself documents.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Builds a ring of `buffer_size` slots (must be a power of two),
    /// filling each hot slot once via `factory`.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is zero or not a power of two.
    pub fn new<F>(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>, metrics: Arc<Metrics>, mut factory: F) -> Self
    where
        F: FnMut() -> T,
    {
        assert!(
            buffer_size > 0 && buffer_size.is_power_of_two(),
            "buffer_size must be a power of two, got {buffer_size}"
        );
        let pad = Self::pad_slots();
        let total = buffer_size + 2 * pad;
        let mut entries: Vec<UnsafeCell<MaybeUninit<T>>> = Vec::with_capacity(total);
        for i in 0..total {
            if i < pad || i >= pad + buffer_size {
                entries.push(UnsafeCell::new(MaybeUninit::uninit()));
            } else {
                entries.push(UnsafeCell::new(MaybeUninit::new(factory())));
            }
        }
        Self {
            entries: entries.into_boxed_slice(),
            pad,
            mask: buffer_size as i64 - 1,
            sequencer: SingleProducerSequencer::new(buffer_size as i64, wait_strategy, metrics),
        }
    }

    fn pad_slots() -> usize {
        let elem = std::mem::size_of::<T>().max(1);
        (PAD_BYTES + elem - 1) / elem
    }

    #[inline]
    fn slot_index(&self, sequence: i64) -> usize {
        ((sequence & self.mask) as usize) + self.pad
    }

    #[inline]
    fn slot_mut(&self, sequence: i64) -> &mut T {
        let idx = self.slot_index(sequence);
        // Safety: single-producer writer protocol; caller holds a claim
        // over `sequence`.
        unsafe { (*self.entries[idx].get()).assume_init_mut() }
    }

    /// Returns the slot at `sequence`. Only legal for sequences the
    /// sequencer reports as published (`is_available`).
    #[inline]
    pub fn get(&self, sequence: i64) -> &T {
        debug_assert_available!(sequence, self.sequencer.index().get());
        let idx = self.slot_index(sequence);
        // Safety: `sequence` has been published, so the write that
        // initialized/mutated it happened-before this read (acquire on
        // the cursor).
        unsafe { (*self.entries[idx].get()).assume_init_ref() }
    }

    pub fn buffer_size(&self) -> i64 {
        self.sequencer.buffer_size()
    }

    pub fn index(&self) -> &Arc<Sequence> {
        self.sequencer.index()
    }

    pub fn get_index(&self) -> i64 {
        self.sequencer.index().get()
    }

    pub fn sequencer(&self) -> &SingleProducerSequencer {
        &self.sequencer
    }

    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        self.sequencer.metrics()
    }

    pub fn is_available(&self, sequence: i64) -> bool {
        self.sequencer.is_available(sequence)
    }

    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    pub fn has_available_capacity(&self, n: i64) -> bool {
        self.sequencer.has_available_capacity(n)
    }

    pub fn add_gating_serial(&self, sequence: Arc<Sequence>) {
        self.sequencer.add_gating_serial(sequence);
    }

    pub fn add_gating_serials(&self, sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_serials(sequences);
    }

    pub fn remove_gating_serial(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_serial(sequence)
    }

    pub fn new_barrier(&self, track: Vec<Arc<Sequence>>) -> SequenceBarrier {
        self.sequencer.new_barrier(track)
    }

    /// Claims the next slot, returning a guard over it.
    pub fn next(&self) -> Claim<'_, T> {
        self.next_n(1)
    }

    /// Claims the next `n` slots, returning a guard over the range.
    pub fn next_n(&self, n: i64) -> Claim<'_, T> {
        let hi = self.sequencer.next_n(n);
        Claim { ring: self, lo: hi - n + 1, hi }
    }

    pub fn try_next(&self) -> Result<Claim<'_, T>, WaitError> {
        self.try_next_n(1)
    }

    pub fn try_next_n(&self, n: i64) -> Result<Claim<'_, T>, WaitError> {
        let hi = self.sequencer.try_next_n(n)?;
        Ok(Claim { ring: self, lo: hi - n + 1, hi })
    }

    /// Escape hatch for replay: repositions the producer cursor to
    /// `sequence` without a capacity check and returns that slot for
    /// in-place mutation.
    pub fn claim_and_get_preallocated(&self, sequence: i64) -> &mut T {
        self.sequencer.claim(sequence);
        self.slot_mut(sequence)
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        let total = self.entries.len();
        for cell in &mut self.entries[self.pad..total - self.pad] {
            // Safety: every hot slot was initialized by the factory at
            // construction and never moved out of since.
            unsafe { cell.get_mut().assume_init_drop() };
        }
    }
}

/// Short-lived guard over the slots `[lo, hi]` claimed by a producer.
///
/// Mutate through [`Claim::get_mut`], then call [`Claim::publish`] to
/// make the range visible to consumers. There is deliberately no way to
/// mutate a slot without eventually consuming the guard via `publish`:
/// the mutate-then-publish protocol cannot be split apart by accident.
#[must_use = "a claim must be published or the slots it reserved are never made visible"]
pub struct Claim<'a, T> {
    ring: &'a RingBuffer<T>,
    lo: i64,
    hi: i64,
}

impl<'a, T> Claim<'a, T> {
    pub fn lo(&self) -> i64 {
        self.lo
    }

    pub fn hi(&self) -> i64 {
        self.hi
    }

    pub fn get_mut(&mut self, sequence: i64) -> &mut T {
        debug_assert_in_claim!(sequence, self.lo, self.hi);
        self.ring.slot_mut(sequence)
    }

    /// Publishes the whole claimed range at once.
    pub fn publish(self) {
        self.ring.sequencer.publish_range(self.lo, self.hi);
    }
}
