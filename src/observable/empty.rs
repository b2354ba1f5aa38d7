use std::marker::PhantomData;

use crate::{
  disposable::Subscription,
  error::{Completion, RxError},
  observable::Observable,
  observer::ObserverRef,
};

/// Creates an observable that emits no value and completes as soon as it is
/// subscribed.
pub fn empty<T>() -> Empty<T> { Empty(PhantomData) }

pub struct Empty<T>(PhantomData<fn() -> T>);

impl<T> Clone for Empty<T> {
  fn clone(&self) -> Self { Empty(PhantomData) }
}

impl<T> Observable<T> for Empty<T> {
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    observer.on_completed(Completion::Success);
    Ok(Subscription::empty())
  }
}
