use super::{Disposable, Subscription};

/// Single owner collection of subscriptions, disposed together.
///
/// Unlike [`CompositeDisposable`](super::CompositeDisposable) a bag takes
/// `&mut self` and needs no lock.
#[derive(Default)]
pub struct DisposableBag {
  items: Vec<Subscription>,
  disposed: bool,
}

impl DisposableBag {
  pub fn new() -> Self { Self::with_capacity(4) }

  pub fn with_capacity(capacity: usize) -> Self {
    DisposableBag { items: Vec::with_capacity(capacity), disposed: false }
  }

  pub fn add(&mut self, item: Subscription) {
    if self.disposed {
      item.dispose();
    } else {
      self.items.push(item);
    }
  }

  /// Disposes every current member; the bag stays usable.
  pub fn clear(&mut self) {
    for sub in self.items.drain(..) {
      sub.dispose();
    }
  }

  pub fn dispose(&mut self) {
    if !self.disposed {
      self.disposed = true;
      self.clear();
    }
  }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.disposed }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::disposable::test::Counter;

  #[test]
  fn bag_lifecycle() {
    let counter = Counter::default();
    let mut bag = DisposableBag::new();
    Subscription::new(counter.clone()).add_to_bag(&mut bag);
    Subscription::new(counter.clone()).add_to_bag(&mut bag);
    assert_eq!(bag.len(), 2);

    bag.clear();
    assert_eq!(counter.hits(), 2);
    assert!(bag.is_empty());

    bag.add(Subscription::new(counter.clone()));
    bag.dispose();
    bag.dispose();
    assert_eq!(counter.hits(), 3);

    bag.add(Subscription::new(counter.clone()));
    assert_eq!(counter.hits(), 4);
    assert!(bag.is_disposed());
  }
}
