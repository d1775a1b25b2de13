use crate::config::{Config, WaitStrategyKind};
use crate::error::AssemblyError;
use crate::handlers::EventHandler;
use crate::metrics::Metrics;
use crate::multi_processor::{MultiBufferBatchEventProcessor, MultiProcessorHandle};
use crate::processor::{BatchEventProcessor, ProcessorHandle};
use crate::ring::RingBuffer;
use crate::wait::{BlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

fn build_wait_strategy(kind: WaitStrategyKind) -> Arc<dyn WaitStrategy> {
    match kind {
        WaitStrategyKind::YieldingSpin => Arc::new(YieldingWaitStrategy::new()),
        WaitStrategyKind::Blocking => Arc::new(BlockingWaitStrategy::new()),
    }
}

/// Wires a ring, sequencer, barrier, and batch processor together and
/// launches the processor on a dedicated thread.
///
/// The returned [`RingBuffer`] *is* the producer handle: `next`/`publish`/
/// gating management all live there directly. The returned
/// [`ProcessorHandle`] keeps `halt`/`is_running`/`get_serial` usable after
/// the processor itself has been moved onto its own thread.
pub fn spawn_single<T, F, H>(config: Config, factory: F, handler: H) -> (Arc<RingBuffer<T>>, ProcessorHandle)
where
    T: Send + 'static,
    F: FnMut() -> T,
    H: EventHandler<T> + 'static,
{
    let metrics = Arc::new(Metrics::new());
    let wait_strategy = build_wait_strategy(config.wait_strategy);
    let ring = Arc::new(RingBuffer::new(config.buffer_size, wait_strategy, Arc::clone(&metrics), factory));
    let barrier = Arc::new(ring.new_barrier(Vec::new()));
    let mut processor = BatchEventProcessor::new(Arc::clone(&ring), barrier, handler, metrics);
    ring.add_gating_serial(Arc::clone(processor.sequence()));

    let handle = processor.handle();
    let join = thread::spawn(move || processor.run());
    (ring, handle.with_join(join))
}

/// A name → producer registry feeding one shared [`MultiBufferBatchEventProcessor`].
///
/// Each named producer is its own single-producer ring with its own
/// barrier; `new_producer` is idempotent by name and fails once the
/// multi-processor has started (registering a producer after `run()` is
/// a recoverable mistake the caller may reasonably probe for, not a
/// panic).
pub struct MultiProducerAssembly<T, H> {
    config: Config,
    producers: Mutex<HashMap<String, Arc<RingBuffer<T>>>>,
    processor: Mutex<Option<MultiBufferBatchEventProcessor<T, H>>>,
}

impl<T, H> MultiProducerAssembly<T, H>
where
    T: Send + 'static,
    H: EventHandler<T> + 'static,
{
    pub fn new(config: Config, handler: H) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            config,
            producers: Mutex::new(HashMap::new()),
            processor: Mutex::new(Some(MultiBufferBatchEventProcessor::new(handler, metrics))),
        }
    }

    /// Registers (or looks up) a named producer ring.
    ///
    /// # Panics
    ///
    /// Never for re-registering an existing name (returns the existing
    /// ring). Propagates the underlying [`RingBuffer::new`] panic if
    /// `config.buffer_size` is invalid, which cannot happen through this
    /// path since [`Config`] validates it at construction.
    pub fn new_producer<F>(&self, name: &str, factory: F) -> Result<Arc<RingBuffer<T>>, AssemblyError>
    where
        F: FnMut() -> T,
    {
        let mut producers = self.producers.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(existing) = producers.get(name) {
            return Ok(Arc::clone(existing));
        }

        let mut processor_slot = self.processor.lock().unwrap_or_else(|p| p.into_inner());
        let processor = processor_slot.as_mut().ok_or_else(|| AssemblyError::AlreadyRunning { name: name.to_string() })?;
        if processor.is_running() {
            return Err(AssemblyError::AlreadyRunning { name: name.to_string() });
        }

        let wait_strategy = build_wait_strategy(self.config.wait_strategy);
        let metrics = Arc::new(Metrics::new());
        let ring = Arc::new(RingBuffer::new(self.config.buffer_size, wait_strategy, metrics, factory));
        let barrier = Arc::new(ring.new_barrier(Vec::new()));
        processor.add_provider_and_barrier(Arc::clone(&ring), barrier);
        producers.insert(name.to_string(), Arc::clone(&ring));
        Ok(ring)
    }

    pub fn producer(&self, name: &str) -> Option<Arc<RingBuffer<T>>> {
        self.producers.lock().unwrap_or_else(|p| p.into_inner()).get(name).cloned()
    }

    /// Launches the multi-processor's round-robin sweep on a dedicated
    /// thread, consuming the registry's ability to register further
    /// producers (a second `run()` call returns `None`).
    pub fn run(&self) -> Option<MultiProcessorHandle> {
        let mut processor = self.processor.lock().unwrap_or_else(|p| p.into_inner()).take()?;
        let handle = processor.handle();
        let join = thread::spawn(move || processor.run());
        Some(handle.with_join(join))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    #[test]
    fn spawn_single_drains_published_events() {
        let total = Arc::new(AtomicI64::new(0));
        let total_clone = Arc::clone(&total);
        let handler = move |event: &i64, _seq: i64, _eob: bool| {
            total_clone.fetch_add(*event, Ordering::SeqCst);
            Ok(())
        };

        let config = Config::new(8, WaitStrategyKind::YieldingSpin, true);
        let (ring, handle) = spawn_single(config, || 0i64, handler);

        for i in 1..=10 {
            let mut claim = ring.next();
            let seq = claim.hi();
            *claim.get_mut(seq) = i;
            claim.publish();
        }

        thread::sleep(Duration::from_millis(30));
        handle.halt();
        handle.join();
        assert_eq!(total.load(Ordering::SeqCst), (1..=10).sum::<i64>());
    }

    #[test]
    fn new_producer_is_idempotent_by_name() {
        let handler = |_event: &i64, _seq: i64, _eob: bool| Ok(());
        let config = Config::new(8, WaitStrategyKind::YieldingSpin, false);
        let registry = MultiProducerAssembly::new(config, handler);

        let a1 = registry.new_producer("a", || 0i64).unwrap();
        let a2 = registry.new_producer("a", || 0i64).unwrap();
        assert!(Arc::ptr_eq(&a1, &a2));
    }

    #[test]
    fn new_producer_fails_once_running() {
        let handler = |_event: &i64, _seq: i64, _eob: bool| Ok(());
        let config = Config::new(8, WaitStrategyKind::YieldingSpin, false);
        let registry = MultiProducerAssembly::new(config, handler);
        registry.new_producer("a", || 0i64).unwrap();

        let handle = registry.run().unwrap();
        thread::sleep(Duration::from_millis(5));

        let err = registry.new_producer("b", || 0i64).unwrap_err();
        assert_eq!(err, AssemblyError::AlreadyRunning { name: "b".to_string() });

        handle.halt();
        handle.join();
    }
}
