use crate::barrier::SequenceBarrier;
use crate::error::{HandlerError, WaitError};
use crate::handlers::{ErrorHandler, EventHandler, FatalErrorHandler, NoopTimeoutHandler, TimeoutHandler};
use crate::invariants::debug_assert_monotonic;
use crate::metrics::Metrics;
use crate::ring::RingBuffer;
use crate::sequence::Sequence;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Consumer run-loop over a single barrier.
///
/// Holds its own progress sequence `c`, which the caller is expected to
/// register as a gating sequence on the producer before [`run`](Self::run)
/// is invoked; see [`crate::assembly`].
pub struct BatchEventProcessor<T, H, E = FatalErrorHandler, TO = NoopTimeoutHandler> {
    ring: Arc<RingBuffer<T>>,
    barrier: Arc<SequenceBarrier>,
    handler: H,
    error_handler: E,
    timeout_handler: TO,
    sequence: Arc<Sequence>,
    running: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

impl<T, H> BatchEventProcessor<T, H, FatalErrorHandler, NoopTimeoutHandler>
where
    T: Send,
    H: EventHandler<T>,
{
    pub fn new(ring: Arc<RingBuffer<T>>, barrier: Arc<SequenceBarrier>, handler: H, metrics: Arc<Metrics>) -> Self {
        Self {
            ring,
            barrier,
            handler,
            error_handler: FatalErrorHandler,
            timeout_handler: NoopTimeoutHandler,
            sequence: Arc::new(Sequence::default()),
            running: Arc::new(AtomicBool::new(false)),
            metrics,
        }
    }
}

impl<T, H, E, TO> BatchEventProcessor<T, H, E, TO>
where
    T: Send,
    H: EventHandler<T>,
    E: ErrorHandler<T>,
    TO: TimeoutHandler,
{
    pub fn with_error_handler<E2: ErrorHandler<T>>(self, error_handler: E2) -> BatchEventProcessor<T, H, E2, TO> {
        BatchEventProcessor {
            ring: self.ring,
            barrier: self.barrier,
            handler: self.handler,
            error_handler,
            timeout_handler: self.timeout_handler,
            sequence: self.sequence,
            running: self.running,
            metrics: self.metrics,
        }
    }

    pub fn with_timeout_handler<TO2: TimeoutHandler>(self, timeout_handler: TO2) -> BatchEventProcessor<T, H, E, TO2> {
        BatchEventProcessor {
            ring: self.ring,
            barrier: self.barrier,
            handler: self.handler,
            error_handler: self.error_handler,
            timeout_handler,
            sequence: self.sequence,
            running: self.running,
            metrics: self.metrics,
        }
    }

    /// This processor's own progress sequence: register it as gating on
    /// the producer before calling [`Self::run`].
    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    /// A lightweight, cloneable handle usable after `self` has been moved
    /// onto a dedicated consumer thread.
    pub fn handle(&self) -> ProcessorHandle {
        ProcessorHandle {
            running: Arc::clone(&self.running),
            barrier: Arc::clone(&self.barrier),
            sequence: Arc::clone(&self.sequence),
            join: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn get_serial(&self) -> i64 {
        self.sequence.get()
    }

    pub fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.barrier.alert();
    }

    /// Runs the consumer loop until [`Self::halt`] is called and any
    /// in-progress batch completes. Blocks the calling thread; returns
    /// immediately (without doing anything) if already running.
    pub fn run(&mut self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.barrier.clear_alert();

        let mut next = self.sequence.get() + 1;
        loop {
            match self.barrier.wait_for(next) {
                Ok(available) => {
                    if available < next {
                        // Dependents haven't caught up yet; re-wait.
                        continue;
                    }
                    self.process_batch(next, available);
                    next = available + 1;
                }
                Err(WaitError::Alert) => {
                    if !self.is_running() {
                        break;
                    }
                    // Spurious alert (e.g. another consumer's halt); keep going.
                }
                Err(WaitError::Timeout) => {
                    self.metrics.record_timeout();
                    if let Err(err) = self.timeout_handler.on_timeout(self.sequence.get()) {
                        self.error_handler.handle_event_error(err, next, None);
                    }
                }
                Err(other) => {
                    let boxed: HandlerError = Box::new(other);
                    self.error_handler.handle_event_error(boxed, next, None);
                    // The sequence is recorded done even though it failed;
                    // recovery policy is the error handler's to decide.
                    self.sequence.set(next);
                    next += 1;
                }
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn process_batch(&mut self, from: i64, available: i64) {
        let mut next = from;
        let mut count = 0u64;
        while next <= available {
            let event = self.ring.get(next);
            let end_of_batch = next == available;
            if let Err(err) = self.handler.on_event(event, next, end_of_batch) {
                self.error_handler.handle_event_error(err, next, Some(event));
            }
            count += 1;
            next += 1;
        }
        self.metrics.record_consumed(count);
        self.metrics.record_batch();
        debug_assert_monotonic!("processor sequence", self.sequence.get(), available);
        self.sequence.set(available);
    }
}

/// A cloneable remote control for a [`BatchEventProcessor`] running on its
/// own thread, usable after the processor itself has been moved there.
pub struct ProcessorHandle {
    running: Arc<AtomicBool>,
    barrier: Arc<SequenceBarrier>,
    sequence: Arc<Sequence>,
    join: Option<JoinHandle<()>>,
}

impl ProcessorHandle {
    pub(crate) fn with_join(mut self, join: JoinHandle<()>) -> Self {
        self.join = Some(join);
        self
    }

    pub fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.barrier.alert();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn get_serial(&self) -> i64 {
        self.sequence.get()
    }

    /// Blocks until the consumer thread exits.
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
    fn processes_published_events_in_order() {
        let ring = ring(8);
        let barrier = Arc::new(ring.new_barrier(Vec::new()));
        let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let handler = move |event: &i64, _seq: i64, _eob: bool| {
            seen_clone.lock().unwrap().push(*event);
            Ok(())
        };
        let mut processor = BatchEventProcessor::new(Arc::clone(&ring), Arc::clone(&barrier), handler, Arc::new(Metrics::new()));
        ring.add_gating_serial(Arc::clone(processor.sequence()));

        for i in 0..5 {
            let mut claim = ring.next();
            *claim.get_mut(i) = i;
            claim.publish();
        }

        let handle = processor.handle();
        let join = thread::spawn(move || processor.run());
        // Give the consumer a moment to drain, then halt it.
        thread::sleep(Duration::from_millis(20));
        handle.halt();
        join.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(!handle.is_running());
    }

    #[test]
    fn halt_stops_the_run_loop_promptly() {
        let ring = ring(8);
        let barrier = Arc::new(ring.new_barrier(Vec::new()));
        let handler = |_event: &i64, _seq: i64, _eob: bool| Ok(());
        let mut processor = BatchEventProcessor::new(Arc::clone(&ring), barrier, handler, Arc::new(Metrics::new()));
        ring.add_gating_serial(Arc::clone(processor.sequence()));

        let handle = processor.handle();
        let join = thread::spawn(move || processor.run());
        thread::sleep(Duration::from_millis(10));
        assert!(handle.is_running());

        handle.halt();
        join.join().unwrap();
        assert!(!handle.is_running());
    }
}
