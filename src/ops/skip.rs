use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
  disposable::Subscription,
  error::{Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
  ops::forward_error_and_complete,
};

/// Drops the first `count` values of the source.
#[derive(Clone)]
pub struct SkipOp<S> {
  source: S,
  count: usize,
}

impl<S> SkipOp<S> {
  pub(crate) fn new(source: S, count: usize) -> Self { SkipOp { source, count } }

  /// `skip(a).skip(b)` skips `a + b` values.
  pub fn skip(self, count: usize) -> SkipOp<S> {
    SkipOp { source: self.source, count: self.count.saturating_add(count) }
  }
}

impl<T, S> Observable<T> for SkipOp<S>
where
  T: 'static,
  S: Observable<T>,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let skip = Subscriber::new(SkipObserver {
      downstream: observer,
      remaining: AtomicUsize::new(self.count),
    });
    self.source.subscribe(skip)
  }
}

struct SkipObserver<T> {
  downstream: ObserverRef<T>,
  remaining: AtomicUsize,
}

impl<T> ObserverCore<T> for SkipObserver<T> {
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let skipped = self
      .remaining
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
      .is_ok();
    if !skipped {
      self.downstream.on_next(value);
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();
}
