//! Process-wide sink for errors nobody is listening to.
//!
//! Whenever a user callback fails while the runtime is dispatching
//! `on_error_resume` or `on_completed`, the error cannot be thrown back at the
//! producer. It is handed to an [`ErrorHandler`] instead. Every
//! [`Subscriber`](crate::observer::Subscriber) can carry its own handler; the
//! ones that don't fall back to the global handler configured here.

use std::{
  fmt::Debug,
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
};

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use crate::{error::Error, logging::log_error};

/// Callback receiving errors that could not be delivered anywhere else.
#[derive(Clone)]
pub struct ErrorHandler(Arc<dyn Fn(&Error) + Send + Sync>);

impl ErrorHandler {
  pub fn new(f: impl Fn(&Error) + Send + Sync + 'static) -> Self { ErrorHandler(Arc::new(f)) }

  /// The default handler: logs the error and carries on.
  pub fn log() -> Self { ErrorHandler::new(|err| log_error!("rxpush unhandled error: {err}")) }

  /// Runs the handler. A panicking handler is logged, never propagated.
  pub fn handle(&self, err: &Error) {
    if catch_unwind(AssertUnwindSafe(|| (self.0)(err))).is_err() {
      log_error!("rxpush error handler panicked while handling: {err}");
    }
  }
}

impl Debug for ErrorHandler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ErrorHandler").finish_non_exhaustive()
  }
}

static GLOBAL_HANDLER: Lazy<ArcSwap<ErrorHandler>> =
  Lazy::new(|| ArcSwap::from_pointee(ErrorHandler::log()));

/// Replaces the global handler and returns the previous one.
pub fn set_unhandled_error_handler(handler: ErrorHandler) -> ErrorHandler {
  let prev = GLOBAL_HANDLER.swap(Arc::new(handler));
  prev.as_ref().clone()
}

/// Returns the current global handler.
pub fn unhandled_error_handler() -> ErrorHandler { GLOBAL_HANDLER.load().as_ref().clone() }

/// Hands `err` to the current global handler.
pub fn report_unhandled(err: &Error) { GLOBAL_HANDLER.load().handle(err) }

#[cfg(test)]
mod test {
  use super::*;
  use crate::error::RxError;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn panicking_handler_is_contained() {
    let handler = ErrorHandler::new(|_| panic!("handler broke"));
    handler.handle(&RxError::custom("lost").into_error());
  }

  #[test]
  fn swap_and_restore() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let prev = set_unhandled_error_handler(ErrorHandler::new(move |_| {
      c_hits.fetch_add(1, Ordering::SeqCst);
    }));

    unhandled_error_handler().handle(&RxError::custom("lost").into_error());
    set_unhandled_error_handler(prev);

    assert!(hits.load(Ordering::SeqCst) >= 1);
  }
}
