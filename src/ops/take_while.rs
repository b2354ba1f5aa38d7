use std::{marker::PhantomData, sync::Arc};

use crate::{
  disposable::Subscription,
  error::{catch_callback, Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
  ops::{forward_error_and_complete, Predicate},
};

pub struct TakeWhileOp<T, S, P> {
  source: S,
  predicate: Arc<P>,
  _item: PhantomData<fn(T)>,
}

impl<T, S, P> TakeWhileOp<T, S, P> {
  pub(crate) fn new(source: S, predicate: P) -> Self {
    TakeWhileOp { source, predicate: Arc::new(predicate), _item: PhantomData }
  }
}

impl<T, S, P> Observable<T> for TakeWhileOp<T, S, P>
where
  T: 'static,
  S: Observable<T>,
  P: Predicate<T> + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let take_while = Subscriber::new(TakeWhileObserver {
      downstream: observer,
      predicate: self.predicate.clone(),
    });
    self.source.subscribe(take_while)
  }
}

struct TakeWhileObserver<T, P> {
  downstream: ObserverRef<T>,
  predicate: Arc<P>,
}

impl<T, P> ObserverCore<T> for TakeWhileObserver<T, P>
where
  P: Predicate<T>,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    match catch_callback(|| self.predicate.test(&value)) {
      Ok(true) => {
        self.downstream.on_next(value);
        Ok(Flow::Continue)
      }
      Ok(false) => Ok(Flow::Complete(Completion::Success)),
      Err(err) => Ok(Flow::Complete(Completion::Failure(err))),
    }
  }

  forward_error_and_complete!();
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[test]
  fn stops_at_first_failing_value() {
    let subject = Subject::new();
    let out = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (c_out, c_completed) = (out.clone(), completed.clone());
    subject
      .clone()
      .take_while(|v| *v < 3)
      .subscribe_complete(
        move |v| c_out.lock().push(v),
        move |r| *c_completed.lock() = r.is_success(),
      )
      .unwrap();

    for v in [1, 2, 3, 1] {
      subject.on_next(v).unwrap();
    }
    assert_eq!(*out.lock(), vec![1, 2]);
    assert!(*completed.lock());
    assert_eq!(subject.observer_count(), 0);
  }

  #[test]
  fn infinite_source() {
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    observable::from_iter(0..)
      .take_while(|v| *v < 4)
      .subscribe_next(move |v| c_out.lock().push(v))
      .unwrap();
    assert_eq!(*out.lock(), vec![0, 1, 2, 3]);
  }
}
