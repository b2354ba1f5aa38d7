//! Stream operators.
//!
//! Every operator is a stateless [`Observable`] holding its source and its
//! parameter. Subscribing it wraps the downstream observer in a private
//! [`Subscriber`](crate::observer::Subscriber) implementing the transform.
//!
//! Adjacent operators fold into one where the result is equivalent:
//!
//! - `filter(p1).filter(p2)` tests `p1` then `p2`, short-circuiting,
//! - `filter(p).map(f)` runs as a single operator,
//! - `skip(a).skip(b)` is `skip(a + b)`,
//! - `take(a).take(b)` is `take(min(a, b))`.

use std::{hash::Hash, sync::Arc};

use crate::{
  error::Error,
  observable::{BoxObservable, Observable},
};

pub mod combine_latest;
pub mod distinct;
pub mod distinct_until_changed;
pub mod filter;
pub mod map;
pub mod merge;
pub mod skip;
pub mod skip_while;
pub mod take;
pub mod take_while;

pub use combine_latest::{combine_latest, CombineLatest2Op, CombineLatestOp};
pub use distinct::{DistinctByOp, DistinctOp};
pub use distinct_until_changed::{DistinctUntilChangedByOp, DistinctUntilChangedOp};
pub use filter::{FilterIndexedOp, FilterOp, FilteredMapOp};
pub use map::{MapIndexedOp, MapOp};
pub use merge::{merge, MergeOp};
pub use skip::SkipOp;
pub use skip_while::SkipWhileOp;
pub use take::TakeOp;
pub use take_while::TakeWhileOp;

/// A test over values, used by the filtering operators.
pub trait Predicate<T>: Send + Sync {
  fn test(&self, value: &T) -> Result<bool, Error>;
}

/// Adapts an infallible closure.
pub struct FnPredicate<F>(pub(crate) F);

/// Adapts a closure that can fail.
pub struct TryPredicate<F>(pub(crate) F);

/// Two predicates tested in order; the second one only runs when the first
/// one holds.
pub struct And<A, B>(pub(crate) A, pub(crate) B);

impl<T, F> Predicate<T> for FnPredicate<F>
where
  F: Fn(&T) -> bool + Send + Sync,
{
  #[inline]
  fn test(&self, value: &T) -> Result<bool, Error> { Ok((self.0)(value)) }
}

impl<T, F> Predicate<T> for TryPredicate<F>
where
  F: Fn(&T) -> Result<bool, Error> + Send + Sync,
{
  #[inline]
  fn test(&self, value: &T) -> Result<bool, Error> { (self.0)(value) }
}

impl<T, A, B> Predicate<T> for And<A, B>
where
  A: Predicate<T>,
  B: Predicate<T>,
{
  fn test(&self, value: &T) -> Result<bool, Error> {
    if !self.0.test(value)? {
      return Ok(false);
    }
    self.1.test(value)
  }
}

impl<T, P> Predicate<T> for Arc<P>
where
  P: Predicate<T> + ?Sized,
{
  #[inline]
  fn test(&self, value: &T) -> Result<bool, Error> { (**self).test(value) }
}

/// A projection from `T` to `U`, used by `map`.
pub trait Selector<T, U>: Send + Sync {
  fn select(&self, value: T) -> Result<U, Error>;
}

pub struct FnSelector<F>(pub(crate) F);

pub struct TrySelector<F>(pub(crate) F);

impl<T, U, F> Selector<T, U> for FnSelector<F>
where
  F: Fn(T) -> U + Send + Sync,
{
  #[inline]
  fn select(&self, value: T) -> Result<U, Error> { Ok((self.0)(value)) }
}

impl<T, U, F> Selector<T, U> for TrySelector<F>
where
  F: Fn(T) -> Result<U, Error> + Send + Sync,
{
  #[inline]
  fn select(&self, value: T) -> Result<U, Error> { (self.0)(value) }
}

/// Resume and completion pass through untouched.
macro_rules! forward_error_and_complete {
  () => {
    #[inline]
    fn error_resume_core(&self, err: $crate::error::Error) -> Result<(), $crate::error::Error> {
      self.downstream.on_error_resume(err);
      Ok(())
    }

    #[inline]
    fn completed_core(
      &self, result: $crate::error::Completion,
    ) -> Result<(), $crate::error::Error> {
      self.downstream.on_completed(result);
      Ok(())
    }
  };
}

pub(crate) use forward_error_and_complete;

/// Operator methods, available on every `'static` observable.
///
/// ```
/// use rxpush::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let out = Arc::new(Mutex::new(vec![]));
/// let c_out = out.clone();
/// observable::from_iter(1..=10)
///   .filter(|v| v % 2 == 0)
///   .map(|v| v * 10)
///   .skip(1)
///   .take(3)
///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
///   .unwrap();
/// assert_eq!(*out.lock().unwrap(), vec![40, 60, 80]);
/// ```
pub trait ObservableExt<T: 'static>: Observable<T> + Sized + 'static {
  /// Forwards the values passing `predicate`. A panicking predicate fails
  /// the stream.
  fn filter<F>(self, predicate: F) -> FilterOp<T, Self, FnPredicate<F>>
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    FilterOp::new(self, FnPredicate(predicate))
  }

  /// Like [`ObservableExt::filter`]; an `Err` from `predicate` fails the
  /// stream.
  fn try_filter<F>(self, predicate: F) -> FilterOp<T, Self, TryPredicate<F>>
  where
    F: Fn(&T) -> Result<bool, Error> + Send + Sync + 'static,
  {
    FilterOp::new(self, TryPredicate(predicate))
  }

  /// Like [`ObservableExt::filter`], with the position of the value passed
  /// to `predicate`.
  ///
  /// Positions count every value the source delivers, kept or not, and start
  /// at zero for each subscription.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let c_out = out.clone();
  /// observable::from_iter(vec!['a', 'b', 'c', 'd', 'e'])
  ///   .filter_indexed(|_, i| i % 2 == 0)
  ///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec!['a', 'c', 'e']);
  /// ```
  fn filter_indexed<F>(self, predicate: F) -> FilterIndexedOp<T, Self, F>
  where
    F: Fn(&T, usize) -> bool + Send + Sync + 'static,
  {
    FilterIndexedOp::new(self, predicate)
  }

  fn map<U, F>(self, selector: F) -> MapOp<T, Self, FnSelector<F>>
  where
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    MapOp::new(self, FnSelector(selector))
  }

  fn try_map<U, F>(self, selector: F) -> MapOp<T, Self, TrySelector<F>>
  where
    F: Fn(T) -> Result<U, Error> + Send + Sync + 'static,
  {
    MapOp::new(self, TrySelector(selector))
  }

  /// Like [`ObservableExt::map`], with the position of the value passed to
  /// `selector`. Positions start at zero for each subscription.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let c_out = out.clone();
  /// observable::from_iter(vec![10, 20, 30])
  ///   .map_indexed(|v, i| v + i)
  ///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec![10, 21, 32]);
  /// ```
  fn map_indexed<U, F>(self, selector: F) -> MapIndexedOp<T, Self, F>
  where
    F: Fn(T, usize) -> U + Send + Sync + 'static,
  {
    MapIndexedOp::new(self, selector)
  }

  /// Maps every value to `()`.
  fn as_unit(self) -> MapOp<T, Self, FnSelector<fn(T)>> {
    let unit: fn(T) = drop;
    MapOp::new(self, FnSelector(unit))
  }

  /// Drops the first `count` values.
  fn skip(self, count: usize) -> SkipOp<Self> { SkipOp::new(self, count) }

  /// Drops values while `predicate` holds; everything after the first
  /// failing value passes.
  ///
  /// Once a value fails the predicate it is never called again for that
  /// subscription, so later values matching it still pass.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let c_out = out.clone();
  /// observable::from_iter(vec![1, 2, 5, 1, 7])
  ///   .skip_while(|v| *v < 3)
  ///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec![5, 1, 7]);
  /// ```
  fn skip_while<F>(self, predicate: F) -> SkipWhileOp<T, Self, FnPredicate<F>>
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    SkipWhileOp::new(self, FnPredicate(predicate))
  }

  /// Forwards the first `count` values, then completes. `take(0)` completes
  /// on subscribe without subscribing the source.
  fn take(self, count: usize) -> TakeOp<Self> { TakeOp::new(self, count) }

  /// Forwards values while `predicate` holds and completes on the first
  /// failing one, which is not forwarded.
  ///
  /// Completing disposes the upstream, so the source stops producing for
  /// this subscription.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let done = Arc::new(Mutex::new(false));
  /// let (c_out, c_done) = (out.clone(), done.clone());
  /// observable::from_iter(vec![1, 2, 5, 1])
  ///   .take_while(|v| *v < 3)
  ///   .subscribe_complete(
  ///     move |v| c_out.lock().unwrap().push(v),
  ///     move |c: Completion| *c_done.lock().unwrap() = c.is_success(),
  ///   )
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec![1, 2]);
  /// assert!(*done.lock().unwrap());
  /// ```
  fn take_while<F>(self, predicate: F) -> TakeWhileOp<T, Self, FnPredicate<F>>
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    TakeWhileOp::new(self, FnPredicate(predicate))
  }

  /// Forwards only the first occurrence of every value. Every value seen is
  /// remembered for the lifetime of the subscription.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let c_out = out.clone();
  /// observable::from_iter(vec![1, 2, 1, 3, 2])
  ///   .distinct()
  ///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec![1, 2, 3]);
  /// ```
  fn distinct(self) -> DistinctOp<Self>
  where
    T: Eq + Hash + Clone + Send,
  {
    DistinctOp::new(self)
  }

  /// Forwards a value only when the key `key_selector` computes for it was
  /// not seen before in this subscription.
  ///
  /// Only the keys are remembered. A panicking key selector fails the
  /// stream.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let c_out = out.clone();
  /// observable::from_iter(vec!["apple", "avocado", "banana", "blueberry", "cherry"])
  ///   .distinct_by(|v| v.as_bytes()[0])
  ///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec!["apple", "banana", "cherry"]);
  /// ```
  fn distinct_by<K, F>(self, key_selector: F) -> DistinctByOp<T, K, Self, F>
  where
    K: Eq + Hash + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
  {
    DistinctByOp::new(self, key_selector)
  }

  /// Forwards a value only when it differs from the previous one.
  ///
  /// The first value always passes. Values equal to an earlier but not the
  /// immediately preceding one pass again.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let c_out = out.clone();
  /// observable::from_iter(vec![1, 1, 2, 2, 1, 3, 3])
  ///   .distinct_until_changed()
  ///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec![1, 2, 1, 3]);
  /// ```
  fn distinct_until_changed(self) -> DistinctUntilChangedOp<Self>
  where
    T: PartialEq + Clone + Send,
  {
    DistinctUntilChangedOp::new(self)
  }

  /// Like [`ObservableExt::distinct_until_changed`], comparing the keys
  /// `key_selector` computes instead of the values.
  ///
  /// ```
  /// use rxpush::prelude::*;
  /// use std::sync::{Arc, Mutex};
  ///
  /// let out = Arc::new(Mutex::new(vec![]));
  /// let c_out = out.clone();
  /// observable::from_iter(vec![(1, 'a'), (1, 'b'), (2, 'c'), (1, 'd')])
  ///   .distinct_until_changed_by(|v| v.0)
  ///   .subscribe_next(move |v| c_out.lock().unwrap().push(v.1))
  ///   .unwrap();
  /// assert_eq!(*out.lock().unwrap(), vec!['a', 'c', 'd']);
  /// ```
  fn distinct_until_changed_by<K, F>(
    self, key_selector: F,
  ) -> DistinctUntilChangedByOp<T, K, Self, F>
  where
    K: PartialEq + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
  {
    DistinctUntilChangedByOp::new(self, key_selector)
  }

  /// Interleaves the values of `self` and `other`.
  fn merge_with<O>(self, other: O) -> MergeOp<BoxObservable<T>>
  where
    O: Observable<T> + 'static,
  {
    let sources: [BoxObservable<T>; 2] = [Arc::new(self), Arc::new(other)];
    merge(sources)
  }

  /// Emits `selector(a, b)` with the latest values of both sources every
  /// time one of them emits, once both have emitted.
  fn combine_latest_with<U, R, O, F>(
    self, other: O, selector: F,
  ) -> CombineLatest2Op<T, U, Self, O, F>
  where
    T: Clone + Send,
    U: Clone + Send + 'static,
    R: 'static,
    O: Observable<U> + 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
  {
    CombineLatest2Op::new(self, other, selector)
  }
}

impl<T: 'static, O> ObservableExt<T> for O where O: Observable<T> + 'static {}
