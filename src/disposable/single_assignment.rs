use parking_lot::Mutex;

use super::{Disposable, Subscription};
use crate::error::RxError;

enum Slot {
  Empty,
  Assigned(Subscription),
  Disposed,
}

/// Holds at most one subscription, assigned once.
///
/// Assigning after `dispose` disposes the incoming value right away, so an
/// upstream that arrives late is never leaked.
pub struct SingleAssignmentDisposable(Mutex<Slot>);

impl Default for SingleAssignmentDisposable {
  fn default() -> Self { SingleAssignmentDisposable(Mutex::new(Slot::Empty)) }
}

impl SingleAssignmentDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn assign(&self, value: Subscription) -> Result<(), RxError> {
    let mut slot = self.0.lock();
    match &*slot {
      Slot::Empty => {
        *slot = Slot::Assigned(value);
        Ok(())
      }
      Slot::Assigned(_) => Err(RxError::AlreadyAssigned),
      Slot::Disposed => {
        drop(slot);
        value.dispose();
        Ok(())
      }
    }
  }

  pub fn get(&self) -> Option<Subscription> {
    match &*self.0.lock() {
      Slot::Assigned(sub) => Some(sub.clone()),
      _ => None,
    }
  }

  pub fn is_disposed(&self) -> bool { matches!(&*self.0.lock(), Slot::Disposed) }
}

impl Disposable for SingleAssignmentDisposable {
  fn dispose(&self) {
    let prev = std::mem::replace(&mut *self.0.lock(), Slot::Disposed);
    if let Slot::Assigned(sub) = prev {
      sub.dispose();
    }
  }
}
