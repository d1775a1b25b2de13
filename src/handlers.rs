use crate::error::HandlerError;

/// Application callback invoked once per event, in sequence order, on the
/// consumer thread.
///
/// Must not retain `event` past the call: the slot it borrows from is
/// reused once the ring wraps around to that sequence again.
pub trait EventHandler<T>: Send {
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<(), HandlerError>;
}

impl<T, F> EventHandler<T> for F
where
    F: FnMut(&T, i64, bool) -> Result<(), HandlerError> + Send,
{
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<(), HandlerError> {
        self(event, sequence, end_of_batch)
    }
}

/// Alternate consumer-mode callback used by [`crate::poll::EventPoll`].
/// Returns whether the poll should keep iterating the currently available
/// batch (`true`) or stop early (`false`), alongside an optional error.
pub trait EventPollHandler<T>: Send {
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<bool, HandlerError>;
}

impl<T, F> EventPollHandler<T> for F
where
    F: FnMut(&T, i64, bool) -> Result<bool, HandlerError> + Send,
{
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<bool, HandlerError> {
        self(event, sequence, end_of_batch)
    }
}

/// Application callback for errors the processor cannot itself recover
/// from: a handler error during dispatch, or a failure during
/// start/shutdown bookkeeping.
pub trait ErrorHandler<T>: Send {
    fn handle_event_error(&mut self, error: HandlerError, sequence: i64, event: Option<&T>);

    fn handle_on_start_error(&mut self, error: HandlerError) {
        let _ = error;
    }

    fn handle_on_shutdown_error(&mut self, error: HandlerError) {
        let _ = error;
    }
}

/// Default error handler: logs and aborts the process. Matches the "fatal
/// by default" contract - an application that wants recovery must supply
/// its own handler.
#[derive(Debug, Default)]
pub struct FatalErrorHandler;

impl<T> ErrorHandler<T> for FatalErrorHandler {
    fn handle_event_error(&mut self, error: HandlerError, sequence: i64, _event: Option<&T>) {
        log::error!("unhandled event error at sequence {sequence}: {error}");
        std::process::abort();
    }

    fn handle_on_start_error(&mut self, error: HandlerError) {
        log::error!("error starting processor: {error}");
        std::process::abort();
    }

    fn handle_on_shutdown_error(&mut self, error: HandlerError) {
        log::error!("error shutting down processor: {error}");
        std::process::abort();
    }
}

/// Application callback invoked when a wait times out. Timeouts are never
/// surfaced to the caller directly; they are always routed here.
pub trait TimeoutHandler: Send {
    fn on_timeout(&mut self, sequence: i64) -> Result<(), HandlerError>;
}

/// Default timeout handler: does nothing and reports no error. Suitable
/// for wait strategies (like the two shipped here) that never time out.
#[derive(Debug, Default)]
pub struct NoopTimeoutHandler;

impl TimeoutHandler for NoopTimeoutHandler {
    fn on_timeout(&mut self, _sequence: i64) -> Result<(), HandlerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_satisfy_event_handler() {
        let mut seen = Vec::new();
        let mut handler = |event: &i32, sequence: i64, end_of_batch: bool| {
            seen.push((*event, sequence, end_of_batch));
            Ok(())
        };
        EventHandler::on_event(&mut handler, &7, 0, true).unwrap();
        assert_eq!(seen, vec![(7, 0, true)]);
    }

    #[test]
    fn noop_timeout_handler_never_errors() {
        let mut handler = NoopTimeoutHandler;
        assert!(handler.on_timeout(42).is_ok());
    }
}
