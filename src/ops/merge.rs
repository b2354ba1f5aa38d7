use std::{cell::Cell, sync::Arc};

use parking_lot::ReentrantMutex;

use crate::{
  disposable::{CompositeDisposable, Disposable, Subscription},
  error::{Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
};

/// Interleaves the values of all `sources` into one stream.
///
/// Every source is subscribed right away. The merged stream completes once
/// every source completed, and fails as soon as one of them fails, which
/// also disposes the others.
///
/// ```
/// use rxpush::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let out = Arc::new(Mutex::new(vec![]));
/// let c_out = out.clone();
/// merge(vec![observable::from_iter(0..2), observable::from_iter(5..7)])
///   .subscribe_next(move |v| c_out.lock().unwrap().push(v))
///   .unwrap();
/// assert_eq!(*out.lock().unwrap(), vec![0, 1, 5, 6]);
/// ```
pub fn merge<S>(sources: impl IntoIterator<Item = S>) -> MergeOp<S> {
  MergeOp { sources: sources.into_iter().collect() }
}

#[derive(Clone)]
pub struct MergeOp<S> {
  sources: Vec<S>,
}

impl<S> MergeOp<S> {
  /// Adds one more source to merge.
  pub fn merge(mut self, source: S) -> MergeOp<S> {
    self.sources.push(source);
    self
  }
}

impl<T, S> Observable<T> for MergeOp<S>
where
  T: 'static,
  S: Observable<T>,
{
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    if self.sources.is_empty() {
      observer.on_completed(Completion::Success);
      return Ok(Subscription::empty());
    }

    let inners = Arc::new(CompositeDisposable::with_capacity(self.sources.len()));
    let state = Arc::new(MergeState {
      downstream: observer,
      completed: ReentrantMutex::new(Cell::new(0)),
      total: self.sources.len(),
      inners: inners.clone(),
    });
    for source in &self.sources {
      if inners.is_disposed() {
        break;
      }
      let inner = Subscriber::new(MergeObserver { state: state.clone() });
      match source.subscribe(inner) {
        Ok(sub) => inners.add(sub),
        Err(err) => {
          inners.dispose();
          return Err(err);
        }
      }
    }
    Ok(Subscription::new(inners))
  }
}

struct MergeState<T> {
  downstream: ObserverRef<T>,
  // Serializes every call into `downstream` and counts completed sources.
  completed: ReentrantMutex<Cell<usize>>,
  total: usize,
  inners: Arc<CompositeDisposable>,
}

struct MergeObserver<T> {
  state: Arc<MergeState<T>>,
}

impl<T> ObserverCore<T> for MergeObserver<T> {
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let _gate = self.state.completed.lock();
    self.state.downstream.on_next(value);
    Ok(Flow::Continue)
  }

  fn error_resume_core(&self, err: Error) -> Result<(), Error> {
    let _gate = self.state.completed.lock();
    self.state.downstream.on_error_resume(err);
    Ok(())
  }

  fn completed_core(&self, result: Completion) -> Result<(), Error> {
    let state = &self.state;
    let completed = state.completed.lock();
    let finished = match result {
      Completion::Failure(_) => true,
      Completion::Success => {
        completed.set(completed.get() + 1);
        completed.get() == state.total
      }
    };
    if finished {
      state.downstream.on_completed(result);
      drop(completed);
      state.inners.dispose();
    }
    Ok(())
  }
}
