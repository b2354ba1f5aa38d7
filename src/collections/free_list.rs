use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::{error::RxError, logging::log_trace};

struct Slots<T> {
  values: Vec<Option<T>>,
  last: Option<usize>,
  disposed: bool,
}

/// Array of optional items with reusable indices.
///
/// Mutation is serialized by an internal gate. Every mutation republishes the
/// occupied span `[0, last]`, so [`FreeList::snapshot`] is a lock-free load
/// that may contain holes and may miss a concurrent `add`.
///
/// An index handed out by `add` keeps referring to the same item until it is
/// removed; the backing array never shrinks except on `clear(true)` and
/// `dispose`.
pub struct FreeList<T> {
  gate: Mutex<Slots<T>>,
  published: ArcSwap<Vec<Option<T>>>,
}

/// A read-only view of the occupied span of a [`FreeList`].
pub struct Snapshot<T>(Arc<Vec<Option<T>>>);

impl<T> Snapshot<T> {
  /// Iterates the live items, skipping holes.
  pub fn iter(&self) -> impl Iterator<Item = &T> + '_ { self.0.iter().flatten() }

  /// Length of the span including holes.
  #[inline]
  pub fn span(&self) -> usize { self.0.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<T: Clone> Default for FreeList<T> {
  fn default() -> Self { Self::new() }
}

#[inline]
fn grown_len(len: usize) -> usize {
  match len {
    0 => 1,
    1 => 4,
    n => n + n / 2,
  }
}

impl<T: Clone> FreeList<T> {
  pub fn new() -> Self {
    FreeList {
      gate: Mutex::new(Slots { values: Vec::new(), last: None, disposed: false }),
      published: ArcSwap::from_pointee(Vec::new()),
    }
  }

  /// Stores `item` in the first free slot, growing when there is none.
  pub fn add(&self, item: T) -> Result<usize, RxError> {
    let mut slots = self.gate.lock();
    if slots.disposed {
      return Err(RxError::Disposed("FreeList"));
    }

    let index = match slots.values.iter().position(Option::is_none) {
      Some(index) => index,
      None => {
        let len = slots.values.len();
        let new_len = grown_len(len);
        log_trace!("free list grows from {len} to {new_len}");
        slots.values.resize_with(new_len, || None);
        len
      }
    };
    slots.values[index] = Some(item);
    if slots.last.map_or(true, |last| last < index) {
      slots.last = Some(index);
    }
    self.publish(&slots);
    Ok(index)
  }

  /// Removes the item at `index`, returning it if the slot was occupied.
  pub fn remove(&self, index: usize) -> Option<T> {
    let mut slots = self.gate.lock();
    let removed = Self::remove_locked(&mut slots, index);
    if removed.is_some() {
      self.publish(&slots);
    }
    removed
  }

  /// Removes the first slot holding a value equal to `item`.
  pub fn remove_by_value(&self, item: &T) -> bool
  where
    T: PartialEq,
  {
    let mut slots = self.gate.lock();
    let Some(index) = slots.values.iter().position(|v| v.as_ref() == Some(item)) else {
      return false;
    };
    Self::remove_locked(&mut slots, index);
    self.publish(&slots);
    true
  }

  #[inline]
  pub fn snapshot(&self) -> Snapshot<T> { Snapshot(self.published.load_full()) }

  /// Empties every slot. With `release_backing` the backing array is freed
  /// too, otherwise its capacity is kept for reuse.
  pub fn clear(&self, release_backing: bool) {
    let mut slots = self.gate.lock();
    if slots.disposed {
      return;
    }
    if release_backing {
      slots.values = Vec::new();
    } else {
      slots.values.iter_mut().for_each(|v| *v = None);
    }
    slots.last = None;
    self.publish(&slots);
  }

  /// Clears the list for good; later `add` calls fail.
  pub fn dispose(&self) {
    let mut slots = self.gate.lock();
    if slots.disposed {
      return;
    }
    slots.disposed = true;
    slots.values = Vec::new();
    slots.last = None;
    self.publish(&slots);
  }

  pub fn is_disposed(&self) -> bool { self.gate.lock().disposed }

  /// Length of the backing array.
  pub fn capacity(&self) -> usize { self.gate.lock().values.len() }

  /// Highest occupied index, `None` when empty.
  pub fn last_index(&self) -> Option<usize> { self.gate.lock().last }

  fn remove_locked(slots: &mut Slots<T>, index: usize) -> Option<T> {
    let removed = slots.values.get_mut(index)?.take()?;
    if slots.last == Some(index) {
      slots.last = slots.values[..index].iter().rposition(Option::is_some);
    }
    Some(removed)
  }

  fn publish(&self, slots: &Slots<T>) {
    let span = slots.last.map_or(0, |last| last + 1);
    self.published.store(Arc::new(slots.values[..span].to_vec()));
  }
}
