use crate::error::HandlerError;
use crate::handlers::EventPollHandler;
use crate::ring::RingBuffer;
use crate::sequence::Sequence;
use crate::sequence_set::FixedSequenceSet;
use crate::wait::SequenceSource;
use std::sync::Arc;

/// Outcome of a single [`EventPoll::poll`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// At least one event was available and handed to the handler.
    Processing,
    /// The producer has published past this poll's position, but the
    /// poll's own upstream dependent (not the producer) hasn't caught up.
    Gating,
    /// Nothing new to report.
    Idle,
}

/// A non-blocking, caller-driven alternative to [`crate::processor::BatchEventProcessor`]
/// for callers that want to interleave consumption with other work on the
/// same thread instead of dedicating a thread to a run-loop.
///
/// Never blocks and never registers its own sequence as gating
/// automatically - a caller that wants the producer to respect this
/// poll's progress must add [`EventPoll::sequence`] as a gating sequence
/// explicitly, exactly as it would for a batch processor.
pub struct EventPoll<T> {
    ring: Arc<RingBuffer<T>>,
    sequence: Arc<Sequence>,
    dependent: Arc<dyn SequenceSource>,
}

impl<T> EventPoll<T> {
    /// Builds a poll over `ring`, chained behind `track`:
    /// - empty: depend directly on the producer's published cursor.
    /// - one sequence: depend on it directly.
    /// - many: depend on their fixed-set minimum.
    pub fn new(ring: Arc<RingBuffer<T>>, track: Vec<Arc<Sequence>>) -> Self {
        let dependent: Arc<dyn SequenceSource> = match track.len() {
            0 => Arc::clone(ring.index()) as Arc<dyn SequenceSource>,
            1 => {
                let only = track.into_iter().next().expect("checked len == 1 above");
                only as Arc<dyn SequenceSource>
            }
            _ => Arc::new(FixedSequenceSet::new(track)) as Arc<dyn SequenceSource>,
        };
        Self {
            ring,
            sequence: Arc::new(Sequence::default()),
            dependent,
        }
    }

    /// This poll's own read cursor.
    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    /// Polls once. Never blocks.
    pub fn poll<H: EventPollHandler<T>>(&self, handler: &mut H) -> Result<PollState, HandlerError> {
        let next = self.sequence.get() + 1;
        let dependent_value = self.dependent.get();
        let available = self.ring.sequencer().get_highest_published_serial(next, dependent_value);

        if next > available {
            return if self.ring.get_index() >= next {
                Ok(PollState::Gating)
            } else {
                Ok(PollState::Idle)
            };
        }

        let mut last_processed = self.sequence.get();
        let mut sequence = next;
        let mut pending_error = None;
        while sequence <= available {
            let event = self.ring.get(sequence);
            let end_of_batch = sequence == available;
            match handler.on_event(event, sequence, end_of_batch) {
                Ok(keep_going) => {
                    last_processed = sequence;
                    if !keep_going {
                        break;
                    }
                }
                Err(err) => {
                    last_processed = sequence;
                    pending_error = Some(err);
                    break;
                }
            }
            sequence += 1;
        }
        self.sequence.set(last_processed);

        match pending_error {
            Some(err) => Err(err),
            None => Ok(PollState::Processing),
        }
    }
}
