use std::{collections::HashSet, hash::Hash, marker::PhantomData, sync::Arc};

use parking_lot::Mutex;

use crate::{
  disposable::Subscription,
  error::{catch_callback, Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
  ops::forward_error_and_complete,
};

/// Forwards the first occurrence of every value.
#[derive(Clone)]
pub struct DistinctOp<S> {
  source: S,
}

impl<S> DistinctOp<S> {
  pub(crate) fn new(source: S) -> Self { DistinctOp { source } }
}

impl<T, S> Observable<T> for DistinctOp<S>
where
  T: Eq + Hash + Clone + Send + 'static,
  S: Observable<T>,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let distinct = Subscriber::new(DistinctObserver {
      downstream: observer,
      seen: Mutex::new(HashSet::new()),
    });
    self.source.subscribe(distinct)
  }
}

struct DistinctObserver<T> {
  downstream: ObserverRef<T>,
  seen: Mutex<HashSet<T>>,
}

impl<T> ObserverCore<T> for DistinctObserver<T>
where
  T: Eq + Hash + Clone + Send,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let first = self.seen.lock().insert(value.clone());
    if first {
      self.downstream.on_next(value);
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();

  fn dispose_core(&self) { self.seen.lock().clear(); }
}

/// Forwards the first value of every key.
pub struct DistinctByOp<T, K, S, F> {
  source: S,
  key_selector: Arc<F>,
  _key: PhantomData<fn(T) -> K>,
}

impl<T, K, S, F> DistinctByOp<T, K, S, F> {
  pub(crate) fn new(source: S, key_selector: F) -> Self {
    DistinctByOp { source, key_selector: Arc::new(key_selector), _key: PhantomData }
  }
}

impl<T, K, S, F> Observable<T> for DistinctByOp<T, K, S, F>
where
  T: 'static,
  K: Eq + Hash + Send + 'static,
  S: Observable<T>,
  F: Fn(&T) -> K + Send + Sync + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let distinct = Subscriber::new(DistinctByObserver {
      downstream: observer,
      key_selector: self.key_selector.clone(),
      seen: Mutex::new(HashSet::new()),
    });
    self.source.subscribe(distinct)
  }
}

struct DistinctByObserver<T, K, F> {
  downstream: ObserverRef<T>,
  key_selector: Arc<F>,
  seen: Mutex<HashSet<K>>,
}

impl<T, K, F> ObserverCore<T> for DistinctByObserver<T, K, F>
where
  K: Eq + Hash + Send,
  F: Fn(&T) -> K + Send + Sync,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let key = match catch_callback(|| Ok((self.key_selector)(&value))) {
      Ok(key) => key,
      Err(err) => return Ok(Flow::Complete(Completion::Failure(err))),
    };
    let first = self.seen.lock().insert(key);
    if first {
      self.downstream.on_next(value);
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();

  fn dispose_core(&self) { self.seen.lock().clear(); }
}
