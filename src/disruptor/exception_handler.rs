//! Hooks invoked when an event handler or the processor's timeout callback panics
//! or returns an error, so a single bad event can't silently kill a processor.

use std::fmt;

/// Receives errors raised while processing events, batches, or idle timeouts.
///
/// The default methods log to stderr and let the processor continue; override them
/// to route into an application's own error channel.
pub trait ExceptionHandler<T>: Send + Sync {
    /// Called when handling a single event fails. `sequence` is the event's
    /// position in the ring buffer.
    fn handle_event_exception(&self, error: &dyn fmt::Display, sequence: i64, _event: &T) {
        eprintln!("event processor: error handling event at sequence {sequence}: {error}");
    }

    /// Called when handling an entire batch fails (batch-handler implementations
    /// that don't isolate per-event failures).
    fn handle_on_batch_exception(&self, error: &dyn fmt::Display, low: i64, high: i64) {
        eprintln!("event processor: error handling batch [{low}, {high}]: {error}");
    }

    /// Called when the processor's idle timeout callback fails.
    fn handle_on_timeout_exception(&self, error: &dyn fmt::Display) {
        eprintln!("event processor: error in timeout callback: {error}");
    }

    /// Called when the processor fails to start.
    fn handle_on_start_exception(&self, error: &dyn fmt::Display) {
        eprintln!("event processor: error on start: {error}");
    }

    /// Called when the processor fails to shut down cleanly.
    fn handle_on_shutdown_exception(&self, error: &dyn fmt::Display) {
        eprintln!("event processor: error on shutdown: {error}");
    }
}

/// Default exception handler: logs every callback to stderr.
#[derive(Default)]
pub struct LoggingExceptionHandler;

impl<T> ExceptionHandler<T> for LoggingExceptionHandler {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: AtomicUsize,
    }

    impl<T> ExceptionHandler<T> for CountingHandler {
        fn handle_event_exception(&self, _error: &dyn fmt::Display, _sequence: i64, _event: &T) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_default_handler_does_not_panic() {
        let handler = LoggingExceptionHandler;
        handler.handle_event_exception(&"boom", 0, &42i64);
        handler.handle_on_batch_exception(&"boom", 0, 5);
        handler.handle_on_timeout_exception(&"boom");
    }

    #[test]
    fn test_custom_handler_is_invoked() {
        let handler = CountingHandler {
            count: AtomicUsize::new(0),
        };
        handler.handle_event_exception(&"err", 1, &1i64);
        handler.handle_event_exception(&"err", 2, &2i64);
        assert_eq!(handler.count.load(Ordering::SeqCst), 2);
    }
}
