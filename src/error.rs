//! Error and completion types.
//!
//! Two kinds of failure flow through the runtime and they are kept apart:
//!
//! - [`RxError`] is a usage error. It is returned synchronously at the call
//!   site (subscribing to a disposed subject, assigning a single-assignment
//!   cell twice, ...).
//! - [`Error`] is a stream error. It only travels downstream, either as a
//!   resumable error through `on_error_resume` or as the payload of a
//!   terminal [`Completion::Failure`].

use std::{
  any::Any,
  fmt::{Display, Formatter},
  panic::{catch_unwind, AssertUnwindSafe},
  sync::Arc,
};

/// Type-erased, cheaply cloneable stream error.
pub type Error = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Usage errors reported synchronously by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RxError {
  /// The target was already disposed.
  #[error("`{0}` is already disposed")]
  Disposed(&'static str),

  /// A single-assignment cell received a second value.
  #[error("disposable is already assigned")]
  AlreadyAssigned,

  /// A `DisposableBuilder` was used after `build`.
  #[error("disposable builder is already consumed")]
  BuilderConsumed,

  /// A user callback panicked.
  #[error("callback panicked: {0}")]
  Panicked(String),

  /// Free-form error, mostly used by user code to fail a stream.
  #[error("{0}")]
  Custom(String),
}

impl RxError {
  pub fn custom(msg: impl Into<String>) -> Self { RxError::Custom(msg.into()) }

  /// Converts this usage error into a stream error.
  #[inline]
  pub fn into_error(self) -> Error { Arc::new(self) }

  pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
    let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
      (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "unknown panic payload".to_string()
    };
    RxError::Panicked(msg)
  }
}

/// Runs a user callback, turning a panic into an `Err` so it never unwinds
/// into the producer.
#[inline]
pub(crate) fn catch_callback<R>(f: impl FnOnce() -> Result<R, Error>) -> Result<R, Error> {
  match catch_unwind(AssertUnwindSafe(f)) {
    Ok(res) => res,
    Err(payload) => Err(RxError::from_panic(payload).into_error()),
  }
}

/// Terminal signal of a stream: it ends exactly once, with success or with a
/// failure.
#[derive(Clone, Debug, Default)]
pub enum Completion {
  #[default]
  Success,
  Failure(Error),
}

impl Completion {
  pub fn failure<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Completion::Failure(Arc::new(err))
  }

  #[inline]
  pub fn is_success(&self) -> bool { matches!(self, Completion::Success) }

  #[inline]
  pub fn is_failure(&self) -> bool { matches!(self, Completion::Failure(_)) }

  pub fn error(&self) -> Option<&Error> {
    match self {
      Completion::Success => None,
      Completion::Failure(err) => Some(err),
    }
  }

  /// Returns the failure as an `Err`, for callers that want to use `?`.
  pub fn into_result(self) -> Result<(), Error> {
    match self {
      Completion::Success => Ok(()),
      Completion::Failure(err) => Err(err),
    }
  }
}

impl From<Result<(), Error>> for Completion {
  fn from(res: Result<(), Error>) -> Self {
    match res {
      Ok(()) => Completion::Success,
      Err(err) => Completion::Failure(err),
    }
  }
}

impl Display for Completion {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Completion::Success => f.write_str("Success"),
      Completion::Failure(err) => write!(f, "Failure{{{err}}}"),
    }
  }
}
