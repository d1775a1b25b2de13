use thiserror::Error;

/// Errors returned by the waiting/claiming hot path.
///
/// This is the "closed taxonomy" side of the error design: every variant
/// here corresponds to a condition the serializer, wait strategy, or
/// barrier can itself detect, as opposed to an error surfaced by
/// application code (see [`HandlerError`]).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// A non-blocking claim (`try_next`/`try_next_n`) found no free capacity.
    #[error("insufficient capacity to claim without waiting")]
    InsufficientCapacity,

    /// The barrier was alerted while a consumer was waiting on it.
    #[error("wait was interrupted by an alert")]
    Alert,

    /// The wait was interrupted by something other than an alert (reserved
    /// for wait strategies that support external interruption).
    #[error("wait was interrupted")]
    Interrupted,

    /// A strategy-specific timeout elapsed before the target sequence
    /// became available.
    #[error("wait timed out")]
    Timeout,
}

/// Boxed application error surfaced by a user-supplied event handler.
///
/// The handler, error handler, and timeout handler may each originate
/// arbitrary error types, so this channel stays open rather than closed.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Programming-error conditions caught at the assembly layer, distinct
/// from the per-event hot-path [`WaitError`] taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// A producer was requested from a registry whose multi-processor is
    /// already running.
    #[error("cannot register producer {name:?}: multi-processor is already running")]
    AlreadyRunning {
        /// The name the caller attempted to register.
        name: String,
    },
}
