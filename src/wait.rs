use crate::error::WaitError;
use crate::sequence::{AlertFlag, Sequence};
use crate::sequence_set::FixedSequenceSet;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Anything a wait strategy can poll for a current value: either a single
/// [`Sequence`] (e.g. "depend directly on the producer cursor") or a
/// [`FixedSequenceSet`]'s minimum (e.g. "depend on several upstream
/// consumers").
pub trait SequenceSource: Send + Sync {
    fn get(&self) -> i64;
}

impl SequenceSource for Sequence {
    #[inline]
    fn get(&self) -> i64 {
        Sequence::get(self)
    }
}

impl SequenceSource for FixedSequenceSet {
    #[inline]
    fn get(&self) -> i64 {
        FixedSequenceSet::get(self)
    }
}

/// Policy deciding how a consumer waits for a target sequence to become
/// visible.
///
/// `wait_for` blocks the caller until `dependent.get() >= target`, the
/// alert flag is set, or (for strategies that support it) a timeout
/// elapses. `signal_all_when_blocking` is called by the producer on every
/// publish so blocking strategies can wake parked consumers; it is a no-op
/// for purely spinning strategies.
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    fn wait_for(
        &self,
        target: i64,
        cursor: &Sequence,
        dependent: &dyn SequenceSource,
        alert: &AlertFlag,
    ) -> Result<i64, WaitError>;

    fn signal_all_when_blocking(&self);
}

/// Busy-spins on `dependent` for [`YieldingWaitStrategy::SPIN_TRIES`]
/// iterations, then yields the current thread on every iteration
/// thereafter. Cheapest strategy in latency terms; burns a full core while
/// waiting.
#[derive(Debug, Default)]
pub struct YieldingWaitStrategy;

impl YieldingWaitStrategy {
    const SPIN_TRIES: u32 = 100;

    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        _cursor: &Sequence,
        dependent: &dyn SequenceSource,
        alert: &AlertFlag,
    ) -> Result<i64, WaitError> {
        let mut counter = Self::SPIN_TRIES;
        loop {
            let available = dependent.get();
            if available >= target {
                return Ok(available);
            }
            if alert.get() {
                return Err(WaitError::Alert);
            }
            if counter == 0 {
                std::thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {
        // No one is parked; nothing to wake.
    }
}

/// Parks the waiting consumer on a mutex/condvar until the producer
/// publishes past `target`, then spin-waits (lock-free) on `dependent`
/// since the dependent may be an upstream consumer sequence the condvar
/// isn't driven by.
#[derive(Debug)]
pub struct BlockingWaitStrategy {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        target: i64,
        cursor: &Sequence,
        dependent: &dyn SequenceSource,
        alert: &AlertFlag,
    ) -> Result<i64, WaitError> {
        if cursor.get() < target {
            let guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
            let mut guard = guard;
            while cursor.get() < target {
                if alert.get() {
                    return Err(WaitError::Alert);
                }
                let (next_guard, timeout) = self
                    .condvar
                    .wait_timeout(guard, Duration::from_millis(1))
                    .unwrap_or_else(|p| p.into_inner());
                guard = next_guard;
                let _ = timeout;
            }
        }
        if alert.get() {
            return Err(WaitError::Alert);
        }
        // Cursor has reached target; spin on the dependent, which may lag
        // behind an upstream consumer rather than the producer.
        loop {
            let available = dependent.get();
            if available >= target {
                return Ok(available);
            }
            if alert.get() {
                return Err(WaitError::Alert);
            }
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.condvar.notify_all();
    }
}
