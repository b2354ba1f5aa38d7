use parking_lot::Mutex;

use super::{Disposable, Subscription};

/// Capacity above which `remove` considers compacting the storage.
const SHRINK_THRESHOLD: usize = 64;

#[derive(Default)]
struct Inner {
  // Removed entries leave a `None` hole so indices of others stay put.
  items: Vec<Option<Subscription>>,
  count: usize,
  disposed: bool,
}

/// A thread-safe group of subscriptions disposed together.
///
/// Adding to an already disposed group disposes the new item immediately.
#[derive(Default)]
pub struct CompositeDisposable(Mutex<Inner>);

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn with_capacity(capacity: usize) -> Self {
    CompositeDisposable(Mutex::new(Inner {
      items: Vec::with_capacity(capacity),
      ..Default::default()
    }))
  }

  pub fn add(&self, item: Subscription) {
    let mut inner = self.0.lock();
    if inner.disposed {
      drop(inner);
      item.dispose();
      return;
    }
    inner.items.push(Some(item));
    inner.count += 1;
  }

  /// Removes `item` and disposes it. Returns `false` when `item` is not a
  /// member.
  pub fn remove(&self, item: &Subscription) -> bool {
    let removed = {
      let mut inner = self.0.lock();
      if inner.disposed {
        return false;
      }
      let pos = inner
        .items
        .iter()
        .position(|s| s.as_ref().is_some_and(|s| s.ptr_eq(item)));
      let Some(pos) = pos else { return false };
      let removed = inner.items[pos].take();
      inner.count -= 1;

      let capacity = inner.items.capacity();
      if capacity > SHRINK_THRESHOLD && inner.count < capacity / 2 {
        inner.items.retain(Option::is_some);
        inner.items.shrink_to_fit();
      }
      removed
    };

    if let Some(sub) = removed {
      sub.dispose();
    }
    true
  }

  pub fn contains(&self, item: &Subscription) -> bool {
    self
      .0
      .lock()
      .items
      .iter()
      .flatten()
      .any(|s| s.ptr_eq(item))
  }

  #[inline]
  pub fn len(&self) -> usize { self.0.lock().count }

  #[inline]
  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn is_disposed(&self) -> bool { self.0.lock().disposed }

  /// Disposes every current member but keeps the group usable.
  pub fn clear(&self) {
    let items = {
      let mut inner = self.0.lock();
      if inner.disposed {
        return;
      }
      inner.count = 0;
      std::mem::take(&mut inner.items)
    };
    for sub in items.into_iter().flatten() {
      sub.dispose();
    }
  }

  pub fn to_vec(&self) -> Vec<Subscription> {
    self.0.lock().items.iter().flatten().cloned().collect()
  }
}

impl FromIterator<Subscription> for CompositeDisposable {
  fn from_iter<I: IntoIterator<Item = Subscription>>(iter: I) -> Self {
    let items: Vec<_> = iter.into_iter().map(Some).collect();
    let count = items.len();
    CompositeDisposable(Mutex::new(Inner { items, count, disposed: false }))
  }
}

impl Disposable for CompositeDisposable {
  fn dispose(&self) {
    let items = {
      let mut inner = self.0.lock();
      if inner.disposed {
        return;
      }
      inner.disposed = true;
      inner.count = 0;
      std::mem::take(&mut inner.items)
    };
    for sub in items.into_iter().flatten() {
      sub.dispose();
    }
  }
}
