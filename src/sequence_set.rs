use crate::invariants::debug_assert_not_ahead_of_cursor;
use crate::sequence::Sequence;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// A copy-on-write set of gating sequences, used by the serializer to track
/// how far behind it its slowest consumer is.
///
/// `Add`/`Remove` build a fresh `Vec` and swap it into place atomically via
/// [`ArcSwap::rcu`]; readers always see a fully constructed snapshot and are
/// never torn by a concurrent writer.
pub struct MutableSequenceSet {
    inner: ArcSwap<Vec<Arc<Sequence>>>,
}

impl MutableSequenceSet {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Minimum of the current members, or `fallback` if the set is empty.
    pub fn get_or(&self, fallback: i64) -> i64 {
        self.inner.load().iter().map(|s| s.get()).fold(fallback, i64::min)
    }

    pub fn get(&self) -> i64 {
        self.get_or(i64::MAX)
    }

    pub fn add(&self, sequence: Arc<Sequence>) {
        self.inner.rcu(|current| {
            let mut next = (**current).clone();
            next.push(Arc::clone(&sequence));
            next
        });
    }

    /// Adds `sequence` after initializing it to `cursor`'s current value, so
    /// a consumer that registers after the producer has already moved on
    /// never appears to be ahead of it.
    pub fn add_while_running(&self, cursor: &Sequence, sequence: Arc<Sequence>) {
        let cursor_value = cursor.get();
        sequence.set(cursor_value);
        debug_assert_not_ahead_of_cursor!(sequence.get(), cursor_value);
        self.add(sequence);
    }

    /// Batch form of [`Self::add_while_running`]: every sequence in `batch`
    /// is initialized to the same cursor snapshot before the set is
    /// published once.
    pub fn add_all_while_running(&self, cursor: &Sequence, batch: &[Arc<Sequence>]) {
        let cursor_value = cursor.get();
        for s in batch {
            s.set(cursor_value);
        }
        self.inner.rcu(|current| {
            let mut next = (**current).clone();
            next.extend(batch.iter().cloned());
            next
        });
    }

    /// Removes `target` by identity (not by its current numeric value: two
    /// distinct consumers may legitimately report the same sequence).
    /// Returns whether a member was removed.
    pub fn remove(&self, target: &Arc<Sequence>) -> bool {
        let mut removed = false;
        self.inner.rcu(|current| {
            removed = false;
            let mut next: Vec<Arc<Sequence>> = Vec::with_capacity(current.len());
            for s in current.iter() {
                if Arc::ptr_eq(s, target) {
                    removed = true;
                } else {
                    next.push(Arc::clone(s));
                }
            }
            next
        });
        removed
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Sequence>>> {
        self.inner.load_full()
    }
}

impl Default for MutableSequenceSet {
    fn default() -> Self {
        Self::new()
    }
}

/// A read-only set-min over a fixed collection of upstream sequences, built
/// once for a [`crate::barrier::SequenceBarrier`] that depends on several
/// consumers.
pub struct FixedSequenceSet {
    sequences: Arc<[Arc<Sequence>]>,
}

impl FixedSequenceSet {
    pub fn new(sequences: Vec<Arc<Sequence>>) -> Self {
        Self {
            sequences: sequences.into(),
        }
    }

    pub fn get(&self) -> i64 {
        self.sequences.iter().map(|s| s.get()).fold(i64::MAX, i64::min)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mutable_set_reports_fallback() {
        let set = MutableSequenceSet::new();
        assert_eq!(set.get_or(7), 7);
        assert_eq!(set.get(), i64::MAX);
    }

    #[test]
    fn get_is_the_minimum_of_members() {
        let set = MutableSequenceSet::new();
        set.add(Arc::new(Sequence::new(10)));
        set.add(Arc::new(Sequence::new(3)));
        set.add(Arc::new(Sequence::new(7)));
        assert_eq!(set.get(), 3);
    }

    #[test]
    fn add_while_running_seeds_from_cursor() {
        let cursor = Sequence::new(42);
        let set = MutableSequenceSet::new();
        let joiner = Arc::new(Sequence::default());
        set.add_while_running(&cursor, Arc::clone(&joiner));
        assert_eq!(joiner.get(), 42);
        assert_eq!(set.get(), 42);
    }

    #[test]
    fn remove_is_by_identity_not_value() {
        let set = MutableSequenceSet::new();
        let a = Arc::new(Sequence::new(5));
        let b = Arc::new(Sequence::new(5));
        set.add(Arc::clone(&a));
        set.add(Arc::clone(&b));
        assert_eq!(set.len(), 2);

        assert!(set.remove(&a));
        assert_eq!(set.len(), 1);
        // b, which shares a's numeric value, must still be present.
        assert_eq!(set.get(), 5);

        assert!(!set.remove(&a));
    }

    #[test]
    fn fixed_set_reports_minimum() {
        let fixed = FixedSequenceSet::new(vec![
            Arc::new(Sequence::new(9)),
            Arc::new(Sequence::new(2)),
        ]);
        assert_eq!(fixed.get(), 2);
    }

    #[test]
    fn fixed_set_empty_reports_max() {
        let fixed = FixedSequenceSet::new(vec![]);
        assert_eq!(fixed.get(), i64::MAX);
    }
}
