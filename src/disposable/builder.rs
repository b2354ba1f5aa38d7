use smallvec::SmallVec;

use super::{BoxDisposable, CombinedDisposable, Disposable, EmptyDisposable};
use crate::error::RxError;

/// Collects disposables and collapses them into the smallest combinator.
///
/// Up to eight handles are kept inline. `build` returns the lone handle, a
/// tuple for two to eight handles, or a [`CombinedDisposable`] beyond that.
/// The builder can not be used again after `build`.
#[derive(Default)]
pub struct DisposableBuilder {
  items: SmallVec<[BoxDisposable; 8]>,
  consumed: bool,
}

macro_rules! try_fixed {
  ($items:ident; $n:literal => ($($v:ident),+); $($rest:tt)*) => {
    match <[BoxDisposable; $n]>::try_from($items) {
      Ok([$($v),+]) => return Ok(Box::new(($($v,)+))),
      Err(back) => {
        let $items = back;
        try_fixed!($items; $($rest)*)
      }
    }
  };
  ($items:ident;) => {
    return Ok(Box::new(CombinedDisposable::new($items)))
  };
}

impl DisposableBuilder {
  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, d: impl Disposable + 'static) -> Result<(), RxError> {
    if self.consumed {
      return Err(RxError::BuilderConsumed);
    }
    self.items.push(Box::new(d));
    Ok(())
  }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn build(&mut self) -> Result<BoxDisposable, RxError> {
    if self.consumed {
      return Err(RxError::BuilderConsumed);
    }
    self.consumed = true;
    let mut items: Vec<BoxDisposable> = std::mem::take(&mut self.items).into_vec();
    if items.len() <= 1 {
      return Ok(items.pop().unwrap_or_else(|| Box::new(EmptyDisposable) as BoxDisposable));
    }
    try_fixed!(items;
      2 => (a, b);
      3 => (a, b, c);
      4 => (a, b, c, d);
      5 => (a, b, c, d, e);
      6 => (a, b, c, d, e, f);
      7 => (a, b, c, d, e, f, g);
      8 => (a, b, c, d, e, f, g, h);
    )
  }

  /// Disposes everything collected so far and consumes the builder.
  pub fn dispose(&mut self) {
    if self.consumed {
      return;
    }
    self.consumed = true;
    for d in std::mem::take(&mut self.items) {
      d.dispose();
    }
  }
}
