use std::{
  marker::PhantomData,
  panic::{catch_unwind, AssertUnwindSafe},
};

use crate::{
  disposable::Subscription, error::RxError, observable::Observable, observer::ObserverRef,
};

/// Creates an observable from custom production logic.
///
/// `f` runs on every subscription with the downstream observer and returns
/// the handle that stops production. An `Err` (or a panic) from `f` fails the
/// `subscribe` call itself.
///
/// ```
/// use rxpush::prelude::*;
///
/// let source = observable::create(|observer: ObserverRef<i32>| {
///   observer.on_next(1);
///   observer.on_completed(Completion::Success);
///   Ok(Subscription::empty())
/// });
/// source.subscribe_next(|v| assert_eq!(v, 1)).unwrap();
/// ```
pub fn create<T, F>(f: F) -> Create<T, F>
where
  F: Fn(ObserverRef<T>) -> Result<Subscription, RxError> + Send + Sync,
{
  Create { f, _item: PhantomData }
}

pub struct Create<T, F> {
  f: F,
  _item: PhantomData<fn(T)>,
}

impl<T, F: Clone> Clone for Create<T, F> {
  fn clone(&self) -> Self { Create { f: self.f.clone(), _item: PhantomData } }
}

impl<T, F> Observable<T> for Create<T, F>
where
  F: Fn(ObserverRef<T>) -> Result<Subscription, RxError> + Send + Sync,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    match catch_unwind(AssertUnwindSafe(|| (self.f)(observer))) {
      Ok(res) => res,
      Err(payload) => Err(RxError::from_panic(payload)),
    }
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn panic_in_production_fails_subscribe() {
    let source = observable::create(|_: ObserverRef<i32>| -> Result<Subscription, RxError> {
      panic!("cannot produce")
    });
    let res = source.subscribe_nop();
    assert_eq!(res.unwrap_err(), RxError::Panicked("cannot produce".into()));
  }
}
