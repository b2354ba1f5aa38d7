use std::{
  marker::PhantomData,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use crate::{
  disposable::Subscription,
  error::{catch_callback, Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
  ops::{forward_error_and_complete, Selector},
};

pub struct MapOp<T, S, M> {
  source: S,
  selector: Arc<M>,
  _item: PhantomData<fn(T)>,
}

impl<T, S, M> MapOp<T, S, M> {
  pub(crate) fn new(source: S, selector: M) -> Self {
    MapOp { source, selector: Arc::new(selector), _item: PhantomData }
  }
}

impl<T, U, S, M> Observable<U> for MapOp<T, S, M>
where
  T: 'static,
  U: 'static,
  S: Observable<T>,
  M: Selector<T, U> + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<U>) -> Result<Subscription, RxError> {
    let map = Subscriber::new(MapObserver {
      downstream: observer,
      selector: self.selector.clone(),
      _item: PhantomData,
    });
    self.source.subscribe(map)
  }
}

struct MapObserver<T, U, M> {
  downstream: ObserverRef<U>,
  selector: Arc<M>,
  _item: PhantomData<fn(T)>,
}

impl<T, U, M> ObserverCore<T> for MapObserver<T, U, M>
where
  M: Selector<T, U>,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    match catch_callback(|| self.selector.select(value)) {
      Ok(v) => {
        self.downstream.on_next(v);
        Ok(Flow::Continue)
      }
      Err(err) => Ok(Flow::Complete(Completion::Failure(err))),
    }
  }

  forward_error_and_complete!();
}

/// Maps with a selector that also receives the position of the value in its
/// subscription, counted from zero.
pub struct MapIndexedOp<T, S, F> {
  source: S,
  selector: Arc<F>,
  _item: PhantomData<fn(T)>,
}

impl<T, S, F> MapIndexedOp<T, S, F> {
  pub(crate) fn new(source: S, selector: F) -> Self {
    MapIndexedOp { source, selector: Arc::new(selector), _item: PhantomData }
  }
}

impl<T, U, S, F> Observable<U> for MapIndexedOp<T, S, F>
where
  T: 'static,
  U: 'static,
  S: Observable<T>,
  F: Fn(T, usize) -> U + Send + Sync + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<U>) -> Result<Subscription, RxError> {
    let map = Subscriber::new(MapIndexedObserver {
      downstream: observer,
      selector: self.selector.clone(),
      index: AtomicUsize::new(0),
      _item: PhantomData,
    });
    self.source.subscribe(map)
  }
}

struct MapIndexedObserver<T, U, F> {
  downstream: ObserverRef<U>,
  selector: Arc<F>,
  index: AtomicUsize,
  _item: PhantomData<fn(T)>,
}

impl<T, U, F> ObserverCore<T> for MapIndexedObserver<T, U, F>
where
  F: Fn(T, usize) -> U + Send + Sync,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let index = self.index.fetch_add(1, Ordering::Relaxed);
    match catch_callback(|| Ok((self.selector)(value, index))) {
      Ok(v) => {
        self.downstream.on_next(v);
        Ok(Flow::Continue)
      }
      Err(err) => Ok(Flow::Complete(Completion::Failure(err))),
    }
  }

  forward_error_and_complete!();
}
