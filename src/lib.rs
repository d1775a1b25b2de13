//! ringpipe-rs: a single-producer, pre-allocated ring buffer event
//! pipeline coordinated by monotonic sequence counters.
//!
//! Producers claim one or more slots from a power-of-two ring, mutate the
//! pre-existing slot object in place, and publish; one or more consumer
//! routines observe published slots in strict order and invoke a handler
//! per event. There is no per-event allocation on the hot path and no
//! locked queue - coordination is compare-and-swap sequence arithmetic
//! plus a pluggable wait strategy (spin or block).
//!
//! # Example
//!
//! ```
//! use ringpipe_rs::{spawn_single, Config, WaitStrategyKind};
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! let total = Arc::new(AtomicI64::new(0));
//! let total_handler = Arc::clone(&total);
//!
//! let config = Config::new(8, WaitStrategyKind::YieldingSpin, true);
//! let (ring, processor) = spawn_single(
//!     config,
//!     || 0i64,
//!     move |event: &i64, _sequence: i64, _end_of_batch: bool| {
//!         total_handler.fetch_add(*event, Ordering::SeqCst);
//!         Ok(())
//!     },
//! );
//!
//! for i in 1..=10 {
//!     let mut claim = ring.next();
//!     let seq = claim.hi();
//!     *claim.get_mut(seq) = i;
//!     claim.publish();
//! }
//!
//! std::thread::sleep(std::time::Duration::from_millis(20));
//! processor.halt();
//! processor.join();
//! assert_eq!(total.load(Ordering::SeqCst), 55);
//! ```

mod assembly;
mod backoff;
mod barrier;
mod config;
mod error;
mod handlers;
mod invariants;
mod metrics;
mod multi_processor;
mod poll;
mod processor;
mod ring;
mod sequence;
mod sequence_set;
mod sequencer;
mod wait;

pub use assembly::{spawn_single, MultiProducerAssembly};
pub use backoff::Backoff;
pub use barrier::SequenceBarrier;
pub use config::{Config, WaitStrategyKind, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::{AssemblyError, HandlerError, WaitError};
pub use handlers::{ErrorHandler, EventHandler, EventPollHandler, FatalErrorHandler, NoopTimeoutHandler, TimeoutHandler};
pub use metrics::{Metrics, MetricsSnapshot};
pub use multi_processor::{MultiBufferBatchEventProcessor, MultiProcessorHandle};
pub use poll::{EventPoll, PollState};
pub use processor::{BatchEventProcessor, ProcessorHandle};
pub use ring::{Claim, RingBuffer};
pub use sequence::Sequence;
pub use sequence_set::{FixedSequenceSet, MutableSequenceSet};
pub use wait::{BlockingWaitStrategy, SequenceSource, WaitStrategy, YieldingWaitStrategy};
