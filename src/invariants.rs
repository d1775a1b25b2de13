//! Debug assertion macros for the ring buffer / serializer invariants.
//!
//! These macros provide runtime checks for the invariants that keep a
//! single-producer ring buffer from overwriting unconsumed slots or
//! exposing a consumer to a torn sequence. They are only active in debug
//! builds (`#[cfg(debug_assertions)]`), so there is zero overhead in
//! release builds.

// =============================================================================
// INV-SEQ-01: Bounded Claim
// =============================================================================

/// Assert that the producer never claims past what the slowest gating
/// sequence allows.
///
/// **Invariant**: `wrap_point ≤ min(gating)` once a claim is granted.
///
/// Used in: `SingleProducerSequencer::next_n()` after the wrap-point wait.
macro_rules! debug_assert_bounded_claim {
    ($wrap_point:expr, $min_gating:expr) => {
        debug_assert!(
            $wrap_point <= $min_gating,
            "INV-SEQ-01 violated: wrap point {} exceeds slowest gating sequence {}",
            $wrap_point,
            $min_gating
        )
    };
}

// =============================================================================
// INV-SEQ-02: Monotonic Progress
// =============================================================================

/// Assert that a sequence only increases, except for an explicit `claim`
/// reset (which callers must route around this check).
///
/// Used in: `SequenceBarrier`/processor sequence updates.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-SEQ-02 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-RING-01: Available Read Range
// =============================================================================

/// Assert that a consumer only reads a sequence that has actually been
/// published.
///
/// **Invariant**: `sequence ≤ index.get()`
///
/// Used in: `RingBuffer::get()`.
macro_rules! debug_assert_available {
    ($sequence:expr, $index:expr) => {
        debug_assert!(
            $sequence <= $index,
            "INV-RING-01 violated: reading unpublished sequence {} (cursor at {})",
            $sequence,
            $index
        )
    };
}

// =============================================================================
// INV-CLAIM-01: Claim Range Membership
// =============================================================================

/// Assert that a mutation through a claim guard stays within the claimed
/// range.
///
/// Used in: `Claim::get_mut()`.
macro_rules! debug_assert_in_claim {
    ($sequence:expr, $low:expr, $high:expr) => {
        debug_assert!(
            $sequence >= $low && $sequence <= $high,
            "INV-CLAIM-01 violated: sequence {} outside claimed range [{}, {}]",
            $sequence,
            $low,
            $high
        )
    };
}

// =============================================================================
// INV-GATE-01: Late-Joining Consumer Position
// =============================================================================

/// Assert that a gating sequence added while the producer is running never
/// starts ahead of the current cursor.
///
/// Used in: `MutableSequenceSet::add_while_running()`.
macro_rules! debug_assert_not_ahead_of_cursor {
    ($sequence_value:expr, $cursor:expr) => {
        debug_assert!(
            $sequence_value <= $cursor,
            "INV-GATE-01 violated: new gating sequence {} starts ahead of cursor {}",
            $sequence_value,
            $cursor
        )
    };
}

pub(crate) use debug_assert_available;
pub(crate) use debug_assert_bounded_claim;
pub(crate) use debug_assert_in_claim;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_not_ahead_of_cursor;
