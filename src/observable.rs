//! The production side of a stream.
//!
//! An [`Observable`] is a description of how to produce values. It holds no
//! per-subscription state, so the same observable can be subscribed many
//! times.

use std::sync::Arc;

use crate::{
  disposable::{Disposable, Subscription},
  error::{Completion, Error, RxError},
  logging::log_debug,
  observer::{AnonymousObserver, ObserverRef},
};

mod create;
mod empty;
mod from_iter;

pub use create::{create, Create};
pub use empty::{empty, Empty};
pub use from_iter::{from_iter, ObservableIter};

pub trait Observable<T>: Send + Sync {
  /// Starts producing into `observer` and returns the handle releasing the
  /// resources of this production.
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError>;

  /// Subscribes `observer` and links it to the upstream handle.
  ///
  /// The returned subscription is the observer itself: disposing it disposes
  /// the observer, which disposes the upstream. When production fails the
  /// observer is disposed and the error returned, nothing is delivered to the
  /// observer.
  ///
  /// An observer already linked to an upstream can't be subscribed again.
  /// The new production is released at once and `AlreadyAssigned` returned;
  /// the existing subscription is left untouched.
  fn subscribe(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError>
  where
    T: 'static,
  {
    match self.subscribe_core(observer.clone()) {
      Ok(upstream) => {
        let rejected = upstream.clone();
        if let Err(err) = observer.set_upstream(upstream) {
          log_debug!("subscribe rejected: {err}");
          rejected.dispose();
          return Err(err);
        }
        Ok(Subscription::new(observer))
      }
      Err(err) => {
        log_debug!("subscribe failed: {err}");
        observer.dispose();
        Err(err)
      }
    }
  }
}

impl<T, O> Observable<T> for Arc<O>
where
  O: Observable<T> + ?Sized,
{
  #[inline]
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    (**self).subscribe_core(observer)
  }
}

impl<T, O> Observable<T> for Box<O>
where
  O: Observable<T> + ?Sized,
{
  #[inline]
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    (**self).subscribe_core(observer)
  }
}

pub type BoxObservable<T> = Arc<dyn Observable<T>>;

/// Closure based subscribe helpers.
///
/// Errors resumed without an `on_error_resume` callback, and failures
/// without an `on_completed` callback, go to the unhandled-error handler.
///
/// ```
/// use rxpush::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let sum = Arc::new(Mutex::new(0));
/// let c_sum = sum.clone();
/// observable::from_iter(1..=4)
///   .subscribe_next(move |v| *c_sum.lock().unwrap() += v)
///   .unwrap();
/// assert_eq!(*sum.lock().unwrap(), 10);
/// ```
pub trait SubscribeExt<T: 'static>: Observable<T> {
  fn subscribe_next<F>(&self, on_next: F) -> Result<Subscription, RxError>
  where
    F: Fn(T) + Send + Sync + 'static,
  {
    self.subscribe(AnonymousObserver::new(on_next).into_observer())
  }

  fn subscribe_complete<N, C>(&self, on_next: N, on_completed: C) -> Result<Subscription, RxError>
  where
    N: Fn(T) + Send + Sync + 'static,
    C: Fn(Completion) + Send + Sync + 'static,
  {
    self.subscribe(
      AnonymousObserver::new(on_next)
        .on_completed(on_completed)
        .into_observer(),
    )
  }

  fn subscribe_all<N, E, C>(
    &self, on_next: N, on_error_resume: E, on_completed: C,
  ) -> Result<Subscription, RxError>
  where
    N: Fn(T) + Send + Sync + 'static,
    E: Fn(Error) + Send + Sync + 'static,
    C: Fn(Completion) + Send + Sync + 'static,
  {
    self.subscribe(
      AnonymousObserver::new(on_next)
        .on_error_resume(on_error_resume)
        .on_completed(on_completed)
        .into_observer(),
    )
  }

  /// Subscribes and ignores every value.
  fn subscribe_nop(&self) -> Result<Subscription, RxError> {
    self.subscribe(AnonymousObserver::new(|_: T| {}).into_observer())
  }

  fn boxed(self) -> BoxObservable<T>
  where
    Self: Sized + 'static,
  {
    Arc::new(self)
  }
}

impl<T: 'static, O> SubscribeExt<T> for O where O: Observable<T> + ?Sized {}
