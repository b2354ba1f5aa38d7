use std::{
  marker::PhantomData,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use crate::{
  disposable::Subscription,
  error::{catch_callback, Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
  ops::{forward_error_and_complete, Predicate},
};

pub struct SkipWhileOp<T, S, P> {
  source: S,
  predicate: Arc<P>,
  _item: PhantomData<fn(T)>,
}

impl<T, S, P> SkipWhileOp<T, S, P> {
  pub(crate) fn new(source: S, predicate: P) -> Self {
    SkipWhileOp { source, predicate: Arc::new(predicate), _item: PhantomData }
  }
}

impl<T, S, P> Observable<T> for SkipWhileOp<T, S, P>
where
  T: 'static,
  S: Observable<T>,
  P: Predicate<T> + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let skip_while = Subscriber::new(SkipWhileObserver {
      downstream: observer,
      predicate: self.predicate.clone(),
      open: AtomicBool::new(false),
    });
    self.source.subscribe(skip_while)
  }
}

struct SkipWhileObserver<T, P> {
  downstream: ObserverRef<T>,
  predicate: Arc<P>,
  // set once the predicate failed, never reset
  open: AtomicBool,
}

impl<T, P> ObserverCore<T> for SkipWhileObserver<T, P>
where
  P: Predicate<T>,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    if !self.open.load(Ordering::Acquire) {
      match catch_callback(|| self.predicate.test(&value)) {
        Ok(true) => return Ok(Flow::Continue),
        Ok(false) => self.open.store(true, Ordering::Release),
        Err(err) => return Ok(Flow::Complete(Completion::Failure(err))),
      }
    }
    self.downstream.on_next(value);
    Ok(Flow::Continue)
  }

  forward_error_and_complete!();
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[test]
  fn opens_once() {
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    observable::from_iter(vec![1, 2, 5, 1, 2, 6])
      .skip_while(|v| *v < 3)
      .subscribe_next(move |v| c_out.lock().push(v))
      .unwrap();
    assert_eq!(*out.lock(), vec![5, 1, 2, 6]);
  }

  #[test]
  fn never_opens() {
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    observable::from_iter(0..5)
      .skip_while(|_| true)
      .subscribe_complete(
        |_| unreachable!("everything is skipped"),
        move |r| *c_completed.lock() = r.is_success(),
      )
      .unwrap();
    assert!(*completed.lock());
  }

  #[test]
  fn panicking_predicate_fails_stream() {
    let failed = Arc::new(Mutex::new(false));
    let c_failed = failed.clone();
    observable::from_iter(0..5)
      .skip_while(|v| if *v == 1 { panic!("skip_while") } else { true })
      .subscribe_complete(|_| {}, move |r| *c_failed.lock() = r.is_failure())
      .unwrap();
    assert!(*failed.lock());
  }
}
