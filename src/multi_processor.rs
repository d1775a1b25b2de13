use crate::barrier::SequenceBarrier;
use crate::error::{HandlerError, WaitError};
use crate::handlers::{ErrorHandler, EventHandler, FatalErrorHandler, NoopTimeoutHandler, TimeoutHandler};
use crate::metrics::Metrics;
use crate::ring::RingBuffer;
use crate::sequence::Sequence;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Consumer run-loop that round-robins over many independent (ring,
/// barrier) pairs, dispatching everything through one shared handler.
///
/// Events across providers carry no global order: only per-provider
/// order is guaranteed. `wait_for(-1)` on each barrier means "whatever is
/// currently available, don't make me wait for it" (every sequence's
/// initial value is `-1`, so this falls out of the normal comparison with
/// no special-casing).
pub struct MultiBufferBatchEventProcessor<T, H, E = FatalErrorHandler, TO = NoopTimeoutHandler> {
    providers: Vec<Arc<RingBuffer<T>>>,
    barriers: Vec<Arc<SequenceBarrier>>,
    sequences: Vec<Arc<Sequence>>,
    handler: H,
    error_handler: E,
    timeout_handler: TO,
    running: Arc<AtomicBool>,
    count: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
}

impl<T, H> MultiBufferBatchEventProcessor<T, H, FatalErrorHandler, NoopTimeoutHandler>
where
    T: Send,
    H: EventHandler<T>,
{
    pub fn new(handler: H, metrics: Arc<Metrics>) -> Self {
        Self {
            providers: Vec::new(),
            barriers: Vec::new(),
            sequences: Vec::new(),
            handler,
            error_handler: FatalErrorHandler,
            timeout_handler: NoopTimeoutHandler,
            running: Arc::new(AtomicBool::new(false)),
            count: Arc::new(AtomicU64::new(0)),
            metrics,
        }
    }
}

impl<T, H, E, TO> MultiBufferBatchEventProcessor<T, H, E, TO>
where
    T: Send,
    H: EventHandler<T>,
    E: ErrorHandler<T>,
    TO: TimeoutHandler,
{
    /// Registers another (ring, barrier) pair to be swept on every round.
    ///
    /// The sweep's own progress sequence for this provider is registered as
    /// a gating serial on `ring`, so the ring's producer waits for this
    /// sweep before overwriting a slot it hasn't read yet.
    ///
    /// # Panics
    ///
    /// Panics if the processor is already running: providers must be
    /// fully wired up before `run` is called.
    pub fn add_provider_and_barrier(&mut self, ring: Arc<RingBuffer<T>>, barrier: Arc<SequenceBarrier>) {
        assert!(
            !self.is_running(),
            "cannot add a provider/barrier while the multi-buffer processor is running"
        );
        let sequence = Arc::new(Sequence::default());
        ring.add_gating_serial(Arc::clone(&sequence));
        self.sequences.push(sequence);
        self.providers.push(ring);
        self.barriers.push(barrier);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Total events dispatched across all providers so far.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// A cloneable remote control usable after `self` has been moved onto
    /// a dedicated sweep thread.
    pub fn handle(&self) -> MultiProcessorHandle {
        MultiProcessorHandle {
            running: Arc::clone(&self.running),
            barriers: self.barriers.clone(),
            join: None,
        }
    }

    /// Alerts every registered barrier and flips the running flag; unlike
    /// a naive port, both the per-barrier sweep and the outer round-robin
    /// loop exit promptly once this is observed, rather than finishing
    /// the sweep already in progress.
    pub fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        for barrier in &self.barriers {
            barrier.alert();
        }
    }

    /// Runs the round-robin sweep until halted.
    ///
    /// # Panics
    ///
    /// Panics if no providers have been registered.
    pub fn run(&mut self) {
        assert!(!self.providers.is_empty(), "multi-buffer processor has no providers registered");
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        for barrier in &self.barriers {
            barrier.clear_alert();
        }

        'sweep: loop {
            if !self.is_running() {
                break 'sweep;
            }
            for i in 0..self.barriers.len() {
                if !self.is_running() {
                    break 'sweep;
                }
                match self.barriers[i].wait_for(-1) {
                    Ok(available) => self.drain_one(i, available),
                    Err(WaitError::Alert) => {
                        if !self.is_running() {
                            break 'sweep;
                        }
                    }
                    Err(WaitError::Timeout) => {
                        self.metrics.record_timeout();
                        let seq = self.sequences[i].get();
                        if let Err(err) = self.timeout_handler.on_timeout(seq) {
                            self.error_handler.handle_event_error(err, seq, None);
                        }
                    }
                    Err(other) => {
                        let boxed: HandlerError = Box::new(other);
                        let seq = self.sequences[i].get() + 1;
                        self.error_handler.handle_event_error(boxed, seq, None);
                    }
                }
            }
            std::thread::yield_now();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn drain_one(&mut self, i: usize, available: i64) {
        let mut next = self.sequences[i].get() + 1;
        if next > available {
            return;
        }
        let provider = &self.providers[i];
        let mut processed = 0u64;
        while next <= available {
            let event = provider.get(next);
            let end_of_batch = next == available;
            if let Err(err) = self.handler.on_event(event, next, end_of_batch) {
                self.error_handler.handle_event_error(err, next, Some(event));
            }
            processed += 1;
            next += 1;
        }
        self.sequences[i].set(available);
        self.count.fetch_add(processed, Ordering::Relaxed);
        self.metrics.record_consumed(processed);
        self.metrics.record_batch();
    }
}

/// A cloneable remote control for a [`MultiBufferBatchEventProcessor`]
/// running on its own thread.
pub struct MultiProcessorHandle {
    running: Arc<AtomicBool>,
    barriers: Vec<Arc<SequenceBarrier>>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl MultiProcessorHandle {
    pub(crate) fn with_join(mut self, join: std::thread::JoinHandle<()>) -> Self {
        self.join = Some(join);
        self
    }

    pub fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        for barrier in &self.barriers {
            barrier.alert();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Blocks until the sweep thread exits.
    pub fn join(mut self) {
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait::YieldingWaitStrategy;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    fn ring(buffer_size: usize) -> Arc<RingBuffer<i64>> {
        Arc::new(RingBuffer::new(
            buffer_size,
            Arc::new(YieldingWaitStrategy::new()),
            Arc::new(Metrics::new()),
            || 0,
        ))
    }

    #[test]
    fn sweeps_all_providers_and_preserves_per_provider_order() {
        let rings: Vec<_> = (0..3).map(|_| ring(16)).collect();
        let seen: Arc<Mutex<Vec<(usize, i64)>>> = Arc::new(Mutex::new(Vec::new()));

        let mut processor = {
            let seen = Arc::clone(&seen);
            let handler = move |event: &i64, _seq: i64, _eob: bool| {
                seen.lock().unwrap().push((0, *event));
                Ok(())
            };
            MultiBufferBatchEventProcessor::new(handler, Arc::new(Metrics::new()))
        };

        for r in &rings {
            let barrier = Arc::new(r.new_barrier(Vec::new()));
            processor.add_provider_and_barrier(Arc::clone(r), barrier);
        }

        for (p, r) in rings.iter().enumerate() {
            for k in 0..10 {
                let mut claim = r.next();
                *claim.get_mut(k) = (p as i64) * 1000 + k;
                claim.publish();
            }
        }

        let handle = processor.handle();
        let join = thread::spawn(move || processor.run());
        thread::sleep(Duration::from_millis(30));
        handle.halt();
        join.join().unwrap();

        let observed = seen.lock().unwrap();
        assert_eq!(observed.len(), 30);
        for p in 0..3 {
            let sub: Vec<i64> = observed.iter().filter(|(_, v)| v / 1000 == p).map(|(_, v)| *v).collect();
            let expected: Vec<i64> = (0..10).map(|k| p * 1000 + k).collect();
            assert_eq!(sub, expected);
        }
    }

    #[test]
    #[should_panic(expected = "no providers registered")]
    fn run_panics_with_no_providers() {
        let handler = |_event: &i64, _seq: i64, _eob: bool| Ok(());
        let mut processor = MultiBufferBatchEventProcessor::new(handler, Arc::new(Metrics::new()));
        processor.run();
    }

    #[test]
    #[should_panic(expected = "already running")]
    fn add_provider_panics_once_running() {
        let r = ring(8);
        let handler = |_event: &i64, _seq: i64, _eob: bool| Ok(());
        let mut processor = MultiBufferBatchEventProcessor::new(handler, Arc::new(Metrics::new()));
        let barrier = Arc::new(r.new_barrier(Vec::new()));
        processor.add_provider_and_barrier(Arc::clone(&r), barrier);

        processor.running.store(true, Ordering::SeqCst);
        let barrier2 = Arc::new(r.new_barrier(Vec::new()));
        processor.add_provider_and_barrier(r, barrier2);
    }
}
