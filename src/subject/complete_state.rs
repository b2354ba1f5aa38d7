use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::OnceCell;

use crate::error::{Completion, Error, RxError};

const NOT_COMPLETED: u8 = 0;
const COMPLETED_SUCCESS: u8 = 1;
const COMPLETED_FAILURE: u8 = 2;
const DISPOSED: u8 = 3;

/// Outcome of [`CompleteState::try_set_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteStatus {
  /// This call recorded the result.
  Done,
  AlreadySucceeded,
  AlreadyFailed,
}

/// Completion state of a multicast source.
///
/// `NotCompleted` moves to `Success` or `Failure` once, first writer wins.
/// `Disposed` is reachable from every state and is terminal.
#[derive(Default)]
pub struct CompleteState {
  state: AtomicU8,
  error: OnceCell<Error>,
}

impl CompleteState {
  pub fn new() -> Self { Self::default() }

  pub fn try_set_result(&self, result: &Completion) -> Result<CompleteStatus, RxError> {
    let target = match result {
      Completion::Success => COMPLETED_SUCCESS,
      Completion::Failure(_) => COMPLETED_FAILURE,
    };
    match self
      .state
      .compare_exchange(NOT_COMPLETED, target, Ordering::SeqCst, Ordering::SeqCst)
    {
      Ok(_) => {
        if let Completion::Failure(err) = result {
          let _ = self.error.set(err.clone());
        }
        Ok(CompleteStatus::Done)
      }
      Err(COMPLETED_SUCCESS) => Ok(CompleteStatus::AlreadySucceeded),
      Err(COMPLETED_FAILURE) => Ok(CompleteStatus::AlreadyFailed),
      Err(_) => Err(RxError::Disposed("CompleteState")),
    }
  }

  /// Moves to `Disposed`. Returns `None` when it already was, otherwise
  /// whether a result had been recorded before.
  pub fn try_set_disposed(&self) -> Option<bool> {
    match self.state.swap(DISPOSED, Ordering::SeqCst) {
      NOT_COMPLETED => Some(false),
      COMPLETED_SUCCESS | COMPLETED_FAILURE => Some(true),
      _ => None,
    }
  }

  pub fn is_completed(&self) -> Result<bool, RxError> {
    match self.state.load(Ordering::SeqCst) {
      NOT_COMPLETED => Ok(false),
      COMPLETED_SUCCESS | COMPLETED_FAILURE => Ok(true),
      _ => Err(RxError::Disposed("CompleteState")),
    }
  }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.state.load(Ordering::SeqCst) == DISPOSED }

  /// The recorded result, `None` while not completed.
  pub fn try_get_result(&self) -> Result<Option<Completion>, RxError> {
    match self.state.load(Ordering::SeqCst) {
      NOT_COMPLETED => Ok(None),
      COMPLETED_SUCCESS => Ok(Some(Completion::Success)),
      COMPLETED_FAILURE => Ok(Some(Completion::Failure(self.wait_error()))),
      _ => Err(RxError::Disposed("CompleteState")),
    }
  }

  // The winner flips the state before storing the payload, so a reader may
  // briefly see `Failure` without an error.
  fn wait_error(&self) -> Error {
    let mut spins = 0u32;
    loop {
      if let Some(err) = self.error.get() {
        return err.clone();
      }
      if spins < 64 {
        std::hint::spin_loop();
        spins += 1;
      } else {
        std::thread::yield_now();
      }
    }
  }
}
