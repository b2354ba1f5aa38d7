use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
  disposable::Subscription,
  error::{Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
  ops::forward_error_and_complete,
};

/// Forwards the first `count` values of the source, then completes.
#[derive(Clone)]
pub struct TakeOp<S> {
  source: S,
  count: usize,
}

impl<S> TakeOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { TakeOp { source, count } }

  /// `take(a).take(b)` takes `min(a, b)` values.
  pub fn take(self, count: usize) -> TakeOp<S> {
    TakeOp { source: self.source, count: self.count.min(count) }
  }
}

impl<T, S> Observable<T> for TakeOp<S>
where
  T: 'static,
  S: Observable<T>,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    if self.count == 0 {
      observer.on_completed(Completion::Success);
      return Ok(Subscription::empty());
    }
    let take = Subscriber::new(TakeObserver {
      downstream: observer,
      remaining: AtomicUsize::new(self.count),
    });
    self.source.subscribe(take)
  }
}

struct TakeObserver<T> {
  downstream: ObserverRef<T>,
  remaining: AtomicUsize,
}

impl<T> ObserverCore<T> for TakeObserver<T> {
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    match self
      .remaining
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
    {
      Ok(1) => {
        self.downstream.on_next(value);
        Ok(Flow::Complete(Completion::Success))
      }
      Ok(_) => {
        self.downstream.on_next(value);
        Ok(Flow::Continue)
      }
      Err(_) => Ok(Flow::Continue),
    }
  }

  forward_error_and_complete!();
}
