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
  ops::{
    forward_error_and_complete, And, FnPredicate, FnSelector, Predicate, Selector, TryPredicate,
  },
};

pub struct FilterOp<T, S, P> {
  pub(crate) source: S,
  pub(crate) predicate: Arc<P>,
  _item: PhantomData<fn(T)>,
}

impl<T, S, P> FilterOp<T, S, P> {
  pub(crate) fn new(source: S, predicate: P) -> Self {
    FilterOp { source, predicate: Arc::new(predicate), _item: PhantomData }
  }
}

impl<T, S, P> FilterOp<T, S, P>
where
  P: Predicate<T>,
{
  /// Folds the two filters into one testing `self`'s predicate first.
  pub fn filter<F>(self, predicate: F) -> FilterOp<T, S, And<Arc<P>, FnPredicate<F>>>
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    FilterOp::new(self.source, And(self.predicate, FnPredicate(predicate)))
  }

  pub fn try_filter<F>(self, predicate: F) -> FilterOp<T, S, And<Arc<P>, TryPredicate<F>>>
  where
    F: Fn(&T) -> Result<bool, Error> + Send + Sync + 'static,
  {
    FilterOp::new(self.source, And(self.predicate, TryPredicate(predicate)))
  }

  /// Tests and maps in a single operator.
  pub fn map<U, F>(self, selector: F) -> FilteredMapOp<T, S, P, FnSelector<F>>
  where
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    FilteredMapOp {
      source: self.source,
      predicate: self.predicate,
      selector: Arc::new(FnSelector(selector)),
      _item: PhantomData,
    }
  }
}

impl<T, S, P> Observable<T> for FilterOp<T, S, P>
where
  T: 'static,
  S: Observable<T>,
  P: Predicate<T> + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let filter = Subscriber::new(FilterObserver {
      downstream: observer,
      predicate: self.predicate.clone(),
    });
    self.source.subscribe(filter)
  }
}

struct FilterObserver<T, P> {
  downstream: ObserverRef<T>,
  predicate: Arc<P>,
}

impl<T, P> ObserverCore<T> for FilterObserver<T, P>
where
  P: Predicate<T>,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    match catch_callback(|| self.predicate.test(&value)) {
      Ok(true) => self.downstream.on_next(value),
      Ok(false) => {}
      Err(err) => return Ok(Flow::Complete(Completion::Failure(err))),
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();
}

/// `filter(p).map(f)` fused into one operator.
pub struct FilteredMapOp<T, S, P, M> {
  source: S,
  predicate: Arc<P>,
  selector: Arc<M>,
  _item: PhantomData<fn(T)>,
}

impl<T, U, S, P, M> Observable<U> for FilteredMapOp<T, S, P, M>
where
  T: 'static,
  U: 'static,
  S: Observable<T>,
  P: Predicate<T> + 'static,
  M: Selector<T, U> + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<U>) -> Result<Subscription, RxError> {
    let filter_map = Subscriber::new(FilteredMapObserver {
      downstream: observer,
      predicate: self.predicate.clone(),
      selector: self.selector.clone(),
      _item: PhantomData,
    });
    self.source.subscribe(filter_map)
  }
}

struct FilteredMapObserver<T, U, P, M> {
  downstream: ObserverRef<U>,
  predicate: Arc<P>,
  selector: Arc<M>,
  _item: PhantomData<fn(T)>,
}

impl<T, U, P, M> ObserverCore<T> for FilteredMapObserver<T, U, P, M>
where
  P: Predicate<T>,
  M: Selector<T, U>,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let mapped = catch_callback(|| {
      if self.predicate.test(&value)? {
        self.selector.select(value).map(Some)
      } else {
        Ok(None)
      }
    });
    match mapped {
      Ok(Some(v)) => self.downstream.on_next(v),
      Ok(None) => {}
      Err(err) => return Ok(Flow::Complete(Completion::Failure(err))),
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();
}

/// Filters with a predicate that also receives the position of the value
/// in its subscription, counted from zero.
pub struct FilterIndexedOp<T, S, F> {
  source: S,
  predicate: Arc<F>,
  _item: PhantomData<fn(T)>,
}

impl<T, S, F> FilterIndexedOp<T, S, F> {
  pub(crate) fn new(source: S, predicate: F) -> Self {
    FilterIndexedOp { source, predicate: Arc::new(predicate), _item: PhantomData }
  }
}

impl<T, S, F> Observable<T> for FilterIndexedOp<T, S, F>
where
  T: 'static,
  S: Observable<T>,
  F: Fn(&T, usize) -> bool + Send + Sync + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let filter = Subscriber::new(FilterIndexedObserver {
      downstream: observer,
      predicate: self.predicate.clone(),
      index: AtomicUsize::new(0),
    });
    self.source.subscribe(filter)
  }
}

struct FilterIndexedObserver<T, F> {
  downstream: ObserverRef<T>,
  predicate: Arc<F>,
  index: AtomicUsize,
}

impl<T, F> ObserverCore<T> for FilterIndexedObserver<T, F>
where
  F: Fn(&T, usize) -> bool + Send + Sync,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let index = self.index.fetch_add(1, Ordering::Relaxed);
    match catch_callback(|| Ok((self.predicate)(&value, index))) {
      Ok(true) => self.downstream.on_next(value),
      Ok(false) => {}
      Err(err) => return Ok(Flow::Complete(Completion::Failure(err))),
    }
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();
}

#[cfg(test)]
mod test {
  use crate::{ops::FilteredMapOp, prelude::*};
  use parking_lot::Mutex;
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  #[test]
  fn shared_by_subscriptions() {
    let filtered = observable::from_iter(0..10).filter(|v| v % 2 == 0);
    let a = Arc::new(Mutex::new(vec![]));
    let b = Arc::new(Mutex::new(vec![]));
    let (c_a, c_b) = (a.clone(), b.clone());
    filtered.subscribe_next(move |v| c_a.lock().push(v)).unwrap();
    filtered.subscribe_next(move |v| c_b.lock().push(v)).unwrap();
    assert_eq!(*a.lock(), vec![0, 2, 4, 6, 8]);
    assert_eq!(*b.lock(), vec![0, 2, 4, 6, 8]);
  }

  #[test]
  fn chained_filters_short_circuit() {
    let second_calls = Arc::new(AtomicUsize::new(0));
    let c_calls = second_calls.clone();
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    observable::from_iter(0..6)
      .filter(|v| *v >= 3)
      .filter(move |v| {
        c_calls.fetch_add(1, Ordering::SeqCst);
        v % 2 == 1
      })
      .subscribe_next(move |v| c_out.lock().push(v))
      .unwrap();
    assert_eq!(*out.lock(), vec![3, 5]);
    assert_eq!(second_calls.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn panicking_predicate_fails_stream() {
    let subject = Subject::<i32>::new();
    let out = Arc::new(Mutex::new(vec![]));
    let failure = Arc::new(Mutex::new(None));
    let (c_out, c_failure) = (out.clone(), failure.clone());
    subject
      .clone()
      .filter(|v: &i32| {
        if *v == 2 {
          panic!("predicate broke");
        }
        true
      })
      .subscribe_complete(
        move |v| c_out.lock().push(v),
        move |r| *c_failure.lock() = r.error().map(|e| e.to_string()),
      )
      .unwrap();

    subject.on_next(1).unwrap();
    subject.on_next(2).unwrap();
    subject.on_next(3).unwrap();
    assert_eq!(*out.lock(), vec![1]);
    assert_eq!(failure.lock().as_deref(), Some("callback panicked: predicate broke"));
    // the failed operator detached itself from the subject
    assert_eq!(subject.observer_count(), 0);
  }

  #[test]
  fn try_filter_error_fails_stream() {
    let failed = Arc::new(Mutex::new(false));
    let c_failed = failed.clone();
    observable::from_iter(0..5)
      .try_filter(|v| {
        if *v == 3 {
          Err(RxError::custom("three").into_error())
        } else {
          Ok(true)
        }
      })
      .subscribe_complete(|_| {}, move |r| *c_failed.lock() = r.is_failure())
      .unwrap();
    assert!(*failed.lock());
  }

  #[test]
  fn indexed_restarts_per_subscription() {
    let subject = Subject::<char>::new();
    let every_other = subject.clone().filter_indexed(|_, i| i % 2 == 0);
    let a = Arc::new(Mutex::new(vec![]));
    let b = Arc::new(Mutex::new(vec![]));
    let (c_a, c_b) = (a.clone(), b.clone());

    every_other.subscribe_next(move |v| c_a.lock().push(v)).unwrap();
    subject.on_next('a').unwrap();
    subject.on_next('b').unwrap();
    every_other.subscribe_next(move |v| c_b.lock().push(v)).unwrap();
    subject.on_next('c').unwrap();
    subject.on_next('d').unwrap();

    assert_eq!(*a.lock(), vec!['a', 'c']);
    assert_eq!(*b.lock(), vec!['c']);
  }

  #[test]
  fn filter_then_map_fuses() {
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    let fused: FilteredMapOp<_, _, _, _> = observable::from_iter(0..6)
      .filter(|v| v % 3 == 0)
      .map(|v| format!("#{v}"));
    fused.subscribe_next(move |v| c_out.lock().push(v)).unwrap();
    assert_eq!(*out.lock(), vec!["#0".to_string(), "#3".to_string()]);
  }
}
