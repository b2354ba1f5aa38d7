//! The push side of a stream.
//!
//! An [`Observer`] receives values through three channels:
//!
//! - `on_next` for every value,
//! - `on_error_resume` for errors that do not end the stream,
//! - `on_completed` exactly once, carrying the terminal [`Completion`].
//!
//! Operators don't implement [`Observer`] by hand. They implement the smaller
//! [`ObserverCore`] and get wrapped in a [`Subscriber`], which owns the
//! upstream handle and enforces the protocol: nothing is delivered after
//! completion or disposal, completion is delivered once, user callbacks never
//! unwind into the producer.

use std::{
  marker::PhantomData,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use crate::{
  disposable::{Disposable, SingleAssignmentDisposable, Subscription},
  error::{catch_callback, Completion, Error, RxError},
  unhandled::{report_unhandled, ErrorHandler},
};

/// A sink with three channels.
///
/// Implementations must not panic: a [`Subject`](crate::subject::Subject)
/// reports a panicking observer to the unhandled-error handler, other
/// producers let it unwind. Wrapping an [`ObserverCore`] in a [`Subscriber`]
/// gives an implementation that upholds the whole protocol.
pub trait Observer<T>: Disposable {
  fn on_next(&self, value: T);

  fn on_error_resume(&self, err: Error);

  fn on_completed(&self, result: Completion);

  /// Stores the handle of the upstream resource; it is disposed along with
  /// this observer. Fails when called twice.
  fn set_upstream(&self, upstream: Subscription) -> Result<(), RxError>;

  fn is_disposed(&self) -> bool;
}

pub type ObserverRef<T> = Arc<dyn Observer<T>>;

/// What a [`Subscriber`] should do after a value was handled.
#[derive(Debug, Clone)]
pub enum Flow {
  Continue,
  /// End the stream with the given result.
  Complete(Completion),
}

/// The operator specific part of an observer.
///
/// Errors returned from `next_core` are resumed downstream through
/// `on_error_resume`. Errors returned from the two other hooks can't go
/// anywhere and are handed to the unhandled-error handler.
pub trait ObserverCore<T>: Send + Sync {
  fn next_core(&self, value: T) -> Result<Flow, Error>;

  fn error_resume_core(&self, err: Error) -> Result<(), Error>;

  fn completed_core(&self, result: Completion) -> Result<(), Error>;

  /// Releases operator local resources, runs once before the upstream is
  /// disposed.
  fn dispose_core(&self) {}

  /// Whether delivering completion also disposes the observer.
  fn auto_dispose_on_completed(&self) -> bool { true }
}

pub struct Subscriber<T, C> {
  core: C,
  upstream: SingleAssignmentDisposable,
  disposed: AtomicBool,
  completed: AtomicBool,
  handler: Option<ErrorHandler>,
  _item: PhantomData<fn(T)>,
}

impl<T, C> Subscriber<T, C>
where
  C: ObserverCore<T>,
{
  pub fn new(core: C) -> Arc<Self> { Self::build(core, None) }

  /// Like [`Subscriber::new`] but reports lost errors to `handler` instead of
  /// the global one.
  pub fn with_error_handler(core: C, handler: ErrorHandler) -> Arc<Self> {
    Self::build(core, Some(handler))
  }

  fn build(core: C, handler: Option<ErrorHandler>) -> Arc<Self> {
    Arc::new(Subscriber {
      core,
      upstream: SingleAssignmentDisposable::new(),
      disposed: AtomicBool::new(false),
      completed: AtomicBool::new(false),
      handler,
      _item: PhantomData,
    })
  }

  #[inline]
  pub fn core(&self) -> &C { &self.core }

  #[inline]
  pub fn is_completed(&self) -> bool { self.completed.load(Ordering::Acquire) }

  #[inline]
  fn is_stopped(&self) -> bool {
    self.disposed.load(Ordering::Acquire) || self.completed.load(Ordering::Acquire)
  }

  fn report(&self, err: &Error) {
    match &self.handler {
      Some(handler) => handler.handle(err),
      None => report_unhandled(err),
    }
  }
}

impl<T, C> Observer<T> for Subscriber<T, C>
where
  C: ObserverCore<T>,
{
  fn on_next(&self, value: T) {
    if self.is_stopped() {
      return;
    }
    match catch_callback(|| self.core.next_core(value)) {
      Ok(Flow::Continue) => {}
      Ok(Flow::Complete(result)) => self.on_completed(result),
      Err(err) => self.on_error_resume(err),
    }
  }

  fn on_error_resume(&self, err: Error) {
    if self.is_stopped() {
      return;
    }
    if let Err(err) = catch_callback(|| self.core.error_resume_core(err)) {
      self.report(&err);
    }
  }

  fn on_completed(&self, result: Completion) {
    if self.disposed.load(Ordering::Acquire) || self.completed.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Err(err) = catch_callback(|| self.core.completed_core(result)) {
      self.report(&err);
    }
    if self.core.auto_dispose_on_completed() {
      self.dispose();
    }
  }

  #[inline]
  fn set_upstream(&self, upstream: Subscription) -> Result<(), RxError> {
    self.upstream.assign(upstream)
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.load(Ordering::Acquire) }
}

impl<T, C> Disposable for Subscriber<T, C>
where
  C: ObserverCore<T>,
{
  fn dispose(&self) {
    if self.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    self.core.dispose_core();
    self.upstream.dispose();
  }
}

type NextFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorResumeFn = Box<dyn Fn(Error) + Send + Sync>;
type CompletedFn = Box<dyn Fn(Completion) + Send + Sync>;

/// Observer built from closures.
///
/// A missing `on_error_resume` callback sends resumed errors to the error
/// handler. A missing `on_completed` callback does the same for a failure.
pub struct AnonymousObserver<T> {
  on_next: NextFn<T>,
  on_error_resume: Option<ErrorResumeFn>,
  on_completed: Option<CompletedFn>,
}

impl<T> AnonymousObserver<T> {
  pub fn new(on_next: impl Fn(T) + Send + Sync + 'static) -> Self {
    AnonymousObserver { on_next: Box::new(on_next), on_error_resume: None, on_completed: None }
  }

  pub fn on_error_resume(mut self, f: impl Fn(Error) + Send + Sync + 'static) -> Self {
    self.on_error_resume = Some(Box::new(f));
    self
  }

  pub fn on_completed(mut self, f: impl Fn(Completion) + Send + Sync + 'static) -> Self {
    self.on_completed = Some(Box::new(f));
    self
  }

  /// Wraps the callbacks in a [`Subscriber`].
  pub fn into_observer(self) -> ObserverRef<T>
  where
    T: 'static,
  {
    Subscriber::new(self)
  }
}

impl<T> ObserverCore<T> for AnonymousObserver<T> {
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    (self.on_next)(value);
    Ok(Flow::Continue)
  }

  fn error_resume_core(&self, err: Error) -> Result<(), Error> {
    match &self.on_error_resume {
      Some(f) => {
        f(err);
        Ok(())
      }
      None => Err(err),
    }
  }

  fn completed_core(&self, result: Completion) -> Result<(), Error> {
    match &self.on_completed {
      Some(f) => {
        f(result);
        Ok(())
      }
      None => result.into_result(),
    }
  }
}
