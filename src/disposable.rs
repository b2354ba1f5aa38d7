//! Disposal primitives.
//!
//! A [`Disposable`] releases a resource, usually an upstream registration.
//! Every implementation in this crate is idempotent: the first `dispose` does
//! the work, later calls are no-ops.

use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

use parking_lot::Mutex;

mod bag;
mod builder;
mod composite;
mod single_assignment;

pub use bag::DisposableBag;
pub use builder::DisposableBuilder;
pub use composite::CompositeDisposable;
pub use single_assignment::SingleAssignmentDisposable;

pub trait Disposable: Send + Sync {
  fn dispose(&self);
}

impl<T: ?Sized + Disposable> Disposable for Arc<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }
}

impl<T: ?Sized + Disposable> Disposable for Box<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }
}

pub type BoxDisposable = Box<dyn Disposable>;

/// Handle returned from `subscribe`.
///
/// A `Subscription` is a cheap, cloneable, shared handle. Disposing any clone
/// disposes the underlying resource. Dropping it does *not* dispose; use
/// [`Subscription::dispose_when_dropped`] for scoped teardown.
#[derive(Clone)]
pub struct Subscription(Arc<dyn Disposable>);

impl Subscription {
  #[inline]
  pub fn new(d: impl Disposable + 'static) -> Self { Subscription(Arc::new(d)) }

  /// A subscription that does nothing when disposed.
  #[inline]
  pub fn empty() -> Self { Subscription::new(EmptyDisposable) }

  /// Runs `f` on the first dispose.
  pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
    Subscription::new(AnonymousDisposable(Mutex::new(Some(Box::new(f)))))
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Subscription) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
  }

  /// Registers this subscription in `composite` and returns it again.
  pub fn add_to(self, composite: &CompositeDisposable) -> Self {
    composite.add(self.clone());
    self
  }

  pub fn add_to_bag(self, bag: &mut DisposableBag) -> Self {
    bag.add(self.clone());
    self
  }

  /// Activates "RAII" behavior for this subscription: it is disposed when the
  /// returned guard is dropped.
  #[must_use]
  #[inline]
  pub fn dispose_when_dropped(self) -> SubscriptionGuard { SubscriptionGuard(self) }
}

impl Disposable for Subscription {
  #[inline]
  fn dispose(&self) { self.0.dispose() }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("Subscription")
      .field(&Arc::as_ptr(&self.0))
      .finish()
  }
}

/// Disposes the wrapped subscription when dropped.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
  /// Releases the subscription without disposing it.
  pub fn into_inner(self) -> Subscription {
    let sub = self.0.clone();
    std::mem::forget(self);
    sub
  }
}

impl Drop for SubscriptionGuard {
  #[inline]
  fn drop(&mut self) { self.0.dispose() }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDisposable;

impl Disposable for EmptyDisposable {
  #[inline]
  fn dispose(&self) {}
}

struct AnonymousDisposable(Mutex<Option<Box<dyn FnOnce() + Send>>>);

impl Disposable for AnonymousDisposable {
  fn dispose(&self) {
    let f = self.0.lock().take();
    if let Some(f) = f {
      f();
    }
  }
}

/// Fixed arity combinators: a tuple of disposables disposes each member in
/// order.
macro_rules! impl_disposable_for_tuple {
  ($($name:ident $idx:tt),+) => {
    impl<$($name: Disposable),+> Disposable for ($($name,)+) {
      fn dispose(&self) {
        $(self.$idx.dispose();)+
      }
    }
  };
}

impl_disposable_for_tuple!(A 0, B 1);
impl_disposable_for_tuple!(A 0, B 1, C 2);
impl_disposable_for_tuple!(A 0, B 1, C 2, D 3);
impl_disposable_for_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_disposable_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
impl_disposable_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_disposable_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

/// Variable arity combinator.
pub struct CombinedDisposable(Box<[BoxDisposable]>);

impl CombinedDisposable {
  pub fn new(items: impl Into<Box<[BoxDisposable]>>) -> Self { CombinedDisposable(items.into()) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Disposable for CombinedDisposable {
  fn dispose(&self) {
    for d in self.0.iter() {
      d.dispose();
    }
  }
}

#[cfg(test)]
pub(crate) mod test {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// Counts how many times `dispose` reaches it.
  #[derive(Clone, Default)]
  pub(crate) struct Counter(pub(crate) Arc<AtomicUsize>);

  impl Counter {
    pub(crate) fn hits(&self) -> usize { self.0.load(Ordering::SeqCst) }
  }

  impl Disposable for Counter {
    fn dispose(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
  }

  #[test]
  fn from_fn_runs_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let sub = Subscription::from_fn(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    });
    let other = sub.clone();
    sub.dispose();
    other.dispose();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(sub.ptr_eq(&other));
  }

  #[test]
  fn guard_disposes_on_drop() {
    let counter = Counter::default();
    {
      let _guard = Subscription::new(counter.clone()).dispose_when_dropped();
    }
    assert_eq!(counter.hits(), 1);

    let guard = Subscription::new(counter.clone()).dispose_when_dropped();
    let _sub = guard.into_inner();
    assert_eq!(counter.hits(), 1);
  }

  #[test]
  fn tuple_and_combined() {
    let a = Counter::default();
    let b = Counter::default();
    (a.clone(), b.clone(), EmptyDisposable).dispose();
    assert_eq!((a.hits(), b.hits()), (1, 1));

    let items: Vec<BoxDisposable> = vec![Box::new(a.clone()), Box::new(b.clone())];
    let combined = CombinedDisposable::new(items);
    assert_eq!(combined.len(), 2);
    combined.dispose();
    assert_eq!((a.hits(), b.hits()), (2, 2));
  }
}
