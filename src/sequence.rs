use crate::backoff::Backoff;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

// =============================================================================
// MEMORY ORDERING
// =============================================================================
//
// `Sequence` is the cache-line-padded monotonic counter every other component
// in this crate coordinates through:
//
// - `get()` uses Acquire: a reader needs a consistent snapshot of the
//   counter, not a fence over unrelated memory.
// - `set()` uses Release: the producer cursor's advance is the signal that
//   makes prior slot writes visible to consumers (see `RingBuffer`).
// - `compare_and_set()` uses SeqCst on both sides, matching the lock-free
//   incrementer contract: it is the only mutator allowed to race with
//   itself.
//
// The struct is padded to a full cache line on each side of the atomic so it
// never shares a line with unrelated mutable fields: two hot sequences
// living on the same line would ping-pong between cores under contention.

/// A cache-line-padded monotonic sequence counter.
///
/// Initial value is `-1`: "nothing has been claimed or published yet".
#[repr(align(128))]
pub struct Sequence {
    value: AtomicI64,
}

impl Sequence {
    /// Sentinel initial value: no sequence has been claimed or published.
    pub const INITIAL_VALUE: i64 = -1;

    #[inline]
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
        }
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, new_value: i64) {
        self.value.store(new_value, Ordering::Release);
    }

    #[inline]
    pub fn compare_and_set(&self, current: i64, new_value: i64) -> bool {
        self.value
            .compare_exchange(current, new_value, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Retries a CAS loop until it wins, backing off between attempts so a
    /// contended increment does not spin forever without yielding.
    pub fn add_and_get(&self, delta: i64) -> i64 {
        let mut backoff = Backoff::new();
        loop {
            let current = self.get();
            let new_value = current + delta;
            if self.compare_and_set(current, new_value) {
                return new_value;
            }
            backoff.snooze();
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(Self::INITIAL_VALUE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence").field("value", &self.get()).finish()
    }
}

/// A padded atomic flag used by [`crate::barrier::SequenceBarrier`] to signal
/// shutdown/re-check to a waiting consumer.
#[repr(align(128))]
pub(crate) struct AlertFlag {
    flag: AtomicBool,
}

impl AlertFlag {
    pub(crate) fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set(&self, value: bool) {
        self.flag.store(value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_at_initial_value() {
        let s = Sequence::default();
        assert_eq!(s.get(), -1);
    }

    #[test]
    fn set_then_get_round_trips() {
        let s = Sequence::new(-1);
        s.set(41);
        assert_eq!(s.get(), 41);
    }

    #[test]
    fn compare_and_set_only_succeeds_on_match() {
        let s = Sequence::new(5);
        assert!(!s.compare_and_set(4, 6));
        assert_eq!(s.get(), 5);
        assert!(s.compare_and_set(5, 6));
        assert_eq!(s.get(), 6);
    }

    #[test]
    fn increment_and_get_is_atomic_under_contention() {
        let s = Arc::new(Sequence::new(-1));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        s.increment_and_get();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(s.get(), -1 + 8 * 1000);
    }

    #[test]
    fn alert_flag_defaults_clear() {
        let alert = AlertFlag::new();
        assert!(!alert.get());
        alert.set(true);
        assert!(alert.get());
    }
}
