use crate::error::WaitError;
use crate::sequence::{AlertFlag, Sequence};
use crate::wait::{SequenceSource, WaitStrategy};
use std::sync::Arc;

/// A consumer's read-side view of the producer cursor plus whatever it
/// depends on upstream, with an alert flag used to wake it for shutdown.
///
/// `dependent` is either the producer's own cursor (a consumer reading
/// directly off the ring) or a fixed set-min over one or more upstream
/// consumer sequences (a consumer chained behind other stages).
pub struct SequenceBarrier {
    index: Arc<Sequence>,
    dependent: Arc<dyn SequenceSource>,
    wait_strategy: Arc<dyn WaitStrategy>,
    alert: AlertFlag,
}

impl SequenceBarrier {
    pub(crate) fn new(
        index: Arc<Sequence>,
        dependent: Arc<dyn SequenceSource>,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Self {
        Self {
            index,
            dependent,
            wait_strategy,
            alert: AlertFlag::new(),
        }
    }

    /// Waits until `target` is visible through this barrier's dependent,
    /// or returns an error on alert/timeout.
    ///
    /// On success, if the dependent has not yet caught up to `target` the
    /// raw (still-behind) value is returned unchanged so the caller can
    /// see that it has more waiting to do; otherwise the result is routed
    /// through the cursor's `get_highest_published_serial` hook.
    pub fn wait_for(&self, target: i64) -> Result<i64, WaitError> {
        if self.alert.get() {
            return Err(WaitError::Alert);
        }
        let available = self
            .wait_strategy
            .wait_for(target, &self.index, self.dependent.as_ref(), &self.alert)?;
        if available < target {
            return Ok(available);
        }
        Ok(self.highest_published(target, available))
    }

    fn highest_published(&self, lower_bound: i64, available: i64) -> i64 {
        // Single-producer serializer: the cursor is already a contiguous
        // published prefix, so this degenerates to `available`. Kept as a
        // named hook because a multi-producer extension would scan an
        // availability vector here instead.
        let _ = lower_bound;
        available
    }

    pub fn alert(&self) {
        self.alert.set(true);
        self.wait_strategy.signal_all_when_blocking();
    }

    pub fn clear_alert(&self) {
        self.alert.set(false);
    }

    pub fn is_alerted(&self) -> bool {
        self.alert.get()
    }

    pub fn check_alert(&self) -> Result<(), WaitError> {
        if self.is_alerted() {
            Err(WaitError::Alert)
        } else {
            Ok(())
        }
    }

    /// The furthest point a consumer behind this barrier can legally reach
    /// right now.
    pub fn get_index(&self) -> i64 {
        self.dependent.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait::YieldingWaitStrategy;

    #[test]
    fn wait_for_returns_available_once_dependent_catches_up() {
        let index = Arc::new(Sequence::new(-1));
        let dependent = Arc::clone(&index);
        let wait_strategy: Arc<dyn WaitStrategy> = Arc::new(YieldingWaitStrategy::new());
        let barrier = SequenceBarrier::new(index.clone(), dependent, wait_strategy);

        index.set(5);
        assert_eq!(barrier.wait_for(3).unwrap(), 5);
    }

    #[test]
    fn alert_makes_wait_for_fail_fast() {
        let index = Arc::new(Sequence::new(-1));
        let dependent = Arc::clone(&index);
        let wait_strategy: Arc<dyn WaitStrategy> = Arc::new(YieldingWaitStrategy::new());
        let barrier = SequenceBarrier::new(index, dependent, wait_strategy);

        barrier.alert();
        assert!(barrier.is_alerted());
        assert_eq!(barrier.wait_for(0), Err(WaitError::Alert));

        barrier.clear_alert();
        assert!(!barrier.is_alerted());
    }

    #[test]
    fn get_index_reports_dependent_value() {
        let index = Arc::new(Sequence::new(10));
        let dependent = Arc::clone(&index);
        let wait_strategy: Arc<dyn WaitStrategy> = Arc::new(YieldingWaitStrategy::new());
        let barrier = SequenceBarrier::new(index, dependent, wait_strategy);
        assert_eq!(barrier.get_index(), 10);
    }
}
