use crate::{
  disposable::Subscription,
  error::{Completion, RxError},
  observable::Observable,
  observer::ObserverRef,
};

/// Creates an observable that emits every item of `iter` and then completes.
///
/// The iterable is cloned for every subscription. Emission stops early once
/// the observer is disposed, so infinite iterators are fine as long as
/// something downstream ends the stream.
///
/// ```
/// use rxpush::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let items = Arc::new(Mutex::new(vec![]));
/// let c_items = items.clone();
/// observable::from_iter(0..)
///   .take(3)
///   .subscribe_next(move |v| c_items.lock().unwrap().push(v))
///   .unwrap();
/// assert_eq!(*items.lock().unwrap(), vec![0, 1, 2]);
/// ```
pub fn from_iter<I>(iter: I) -> ObservableIter<I>
where
  I: IntoIterator,
{
  ObservableIter(iter)
}

#[derive(Clone)]
pub struct ObservableIter<I>(I);

impl<I> Observable<I::Item> for ObservableIter<I>
where
  I: IntoIterator + Clone + Send + Sync,
{
  fn subscribe_core(&self, observer: ObserverRef<I::Item>) -> Result<Subscription, RxError> {
    for v in self.0.clone() {
      if observer.is_disposed() {
        return Ok(Subscription::empty());
      }
      observer.on_next(v);
    }
    observer.on_completed(Completion::Success);
    Ok(Subscription::empty())
  }
}
