use std::{marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::{
  disposable::Subscription,
  error::{catch_callback, Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
  ops::forward_error_and_complete,
};

/// Drops values equal to the one right before them.
#[derive(Clone)]
pub struct DistinctUntilChangedOp<S> {
  source: S,
}

impl<S> DistinctUntilChangedOp<S> {
  pub(crate) fn new(source: S) -> Self { DistinctUntilChangedOp { source } }
}

impl<T, S> Observable<T> for DistinctUntilChangedOp<S>
where
  T: PartialEq + Clone + Send + 'static,
  S: Observable<T>,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let distinct = Subscriber::new(DistinctUntilChangedObserver {
      downstream: observer,
      last: Mutex::new(None),
    });
    self.source.subscribe(distinct)
  }
}

struct DistinctUntilChangedObserver<T> {
  downstream: ObserverRef<T>,
  last: Mutex<Option<T>>,
}

impl<T> ObserverCore<T> for DistinctUntilChangedObserver<T>
where
  T: PartialEq + Clone + Send,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let changed = {
      let mut last = self.last.lock();
      if last.as_ref() == Some(&value) {
        false
      } else {
        *last = Some(value.clone());
        true
      }
    };
    if changed {
      self.downstream.on_next(value);
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();
}

/// Drops values whose key equals the key of the value right before them.
pub struct DistinctUntilChangedByOp<T, K, S, F> {
  source: S,
  key_selector: Arc<F>,
  _key: PhantomData<fn(T) -> K>,
}

impl<T, K, S, F> DistinctUntilChangedByOp<T, K, S, F> {
  pub(crate) fn new(source: S, key_selector: F) -> Self {
    DistinctUntilChangedByOp { source, key_selector: Arc::new(key_selector), _key: PhantomData }
  }
}

impl<T, K, S, F> Observable<T> for DistinctUntilChangedByOp<T, K, S, F>
where
  T: 'static,
  K: PartialEq + Send + 'static,
  S: Observable<T>,
  F: Fn(&T) -> K + Send + Sync + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let distinct = Subscriber::new(DistinctUntilChangedByObserver {
      downstream: observer,
      key_selector: self.key_selector.clone(),
      last: Mutex::new(None),
    });
    self.source.subscribe(distinct)
  }
}

struct DistinctUntilChangedByObserver<T, K, F> {
  downstream: ObserverRef<T>,
  key_selector: Arc<F>,
  last: Mutex<Option<K>>,
}

impl<T, K, F> ObserverCore<T> for DistinctUntilChangedByObserver<T, K, F>
where
  K: PartialEq + Send,
  F: Fn(&T) -> K + Send + Sync,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let key = match catch_callback(|| Ok((self.key_selector)(&value))) {
      Ok(key) => key,
      Err(err) => return Ok(Flow::Complete(Completion::Failure(err))),
    };
    let changed = {
      let mut last = self.last.lock();
      if last.as_ref() == Some(&key) {
        false
      } else {
        *last = Some(key);
        true
      }
    };
    if changed {
      self.downstream.on_next(value);
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();
}
