//! Multicast hub.
//!
//! A [`Subject`] is fed through `on_next`, `on_error_resume` and
//! `on_completed`, and replays what it receives to every subscribed observer.
//! Subscribers live in a [`FreeList`]; dispatch iterates a lock-free snapshot,
//! so an observer may push into the same subject from its own callback.

use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::{
  collections::{FreeList, Snapshot},
  disposable::{Disposable, Subscription},
  error::{catch_callback, Completion, Error, RxError},
  logging::log_debug,
  observable::Observable,
  observer::{Flow, ObserverCore, ObserverRef, Subscriber},
  unhandled::report_unhandled,
};

mod complete_state;

pub use complete_state::{CompleteState, CompleteStatus};

struct SubjectInner<T> {
  list: FreeList<Arc<SubjectNode<T>>>,
  state: CompleteState,
}

/// Registration of one observer. Removes itself from its subject when
/// disposed, only the first call has an effect.
struct SubjectNode<T> {
  observer: ObserverRef<T>,
  parent: Mutex<Option<Weak<SubjectInner<T>>>>,
  index: OnceCell<usize>,
}

impl<T> Disposable for SubjectNode<T> {
  fn dispose(&self) {
    let Some(parent) = self.parent.lock().take() else { return };
    if let (Some(parent), Some(index)) = (parent.upgrade(), self.index.get()) {
      parent.list.remove(*index);
    }
  }
}

pub struct Subject<T> {
  inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
  fn clone(&self) -> Self { Subject { inner: self.inner.clone() } }
}

impl<T> Default for Subject<T> {
  fn default() -> Self {
    Subject {
      inner: Arc::new(SubjectInner { list: FreeList::new(), state: CompleteState::new() }),
    }
  }
}

#[inline]
fn subject_disposed(_: RxError) -> RxError { RxError::Disposed("Subject") }

/// Sends `value` to every node, cloning for all but the last one.
///
/// A panicking observer is reported to the unhandled-error handler and the
/// remaining nodes still receive the value.
fn broadcast<T, V: Clone>(
  snapshot: &Snapshot<Arc<SubjectNode<T>>>, value: V, emit: impl Fn(&ObserverRef<T>, V),
) {
  let deliver = |observer: &ObserverRef<T>, value: V| {
    let res = catch_callback(|| {
      emit(observer, value);
      Ok(())
    });
    if let Err(err) = res {
      report_unhandled(&err);
    }
  };
  let mut iter = snapshot.iter().peekable();
  while let Some(node) = iter.next() {
    if iter.peek().is_some() {
      deliver(&node.observer, value.clone());
    } else {
      deliver(&node.observer, value);
      break;
    }
  }
}

impl<T> SubjectInner<T> {
  fn dispose_with(&self, call_on_completed: bool) {
    let Some(already_completed) = self.state.try_set_disposed() else { return };
    log_debug!("subject disposed, completed before: {already_completed}");
    let live = self.list.snapshot();
    if call_on_completed && !already_completed {
      broadcast(&live, Completion::Success, |o, r| o.on_completed(r));
    }
    self.list.dispose();
    // a node and its observer own each other until the observer is disposed
    live.iter().for_each(|node| node.observer.dispose());
  }
}

/// Dropping the last handle disposes the subject like `dispose` does.
impl<T> Drop for SubjectInner<T> {
  fn drop(&mut self) { self.dispose_with(true) }
}

impl<T> Subject<T> {
  pub fn new() -> Self { Self::default() }

  pub fn is_disposed(&self) -> bool { self.inner.state.is_disposed() }

  /// Whether a result was recorded. A disposed subject reports `false`.
  pub fn is_completed(&self) -> bool { matches!(self.inner.state.is_completed(), Ok(true)) }

  /// Number of currently subscribed observers.
  pub fn observer_count(&self) -> usize { self.inner.list.snapshot().iter().count() }

  pub fn on_next(&self, value: T) -> Result<(), RxError>
  where
    T: Clone,
  {
    if self.inner.state.is_completed().map_err(subject_disposed)? {
      return Ok(());
    }
    broadcast(&self.inner.list.snapshot(), value, |o, v| o.on_next(v));
    Ok(())
  }

  pub fn on_error_resume(&self, err: Error) -> Result<(), RxError> {
    if self.inner.state.is_completed().map_err(subject_disposed)? {
      return Ok(());
    }
    broadcast(&self.inner.list.snapshot(), err, |o, e| o.on_error_resume(e));
    Ok(())
  }

  /// Records `result` and delivers it. Only the first result is delivered,
  /// later calls are no-ops.
  pub fn on_completed(&self, result: Completion) -> Result<(), RxError> {
    let status = self
      .inner
      .state
      .try_set_result(&result)
      .map_err(subject_disposed)?;
    if status == CompleteStatus::Done {
      broadcast(&self.inner.list.snapshot(), result, |o, r| o.on_completed(r));
    }
    Ok(())
  }

  #[inline]
  pub fn complete(&self) -> Result<(), RxError> { self.on_completed(Completion::Success) }

  /// Disposes the subject. When `call_on_completed` is set and no result was
  /// recorded, attached observers receive a success first. Observers still
  /// attached afterwards are disposed.
  #[inline]
  pub fn dispose_with(&self, call_on_completed: bool) { self.inner.dispose_with(call_on_completed) }

  /// An observer that feeds this subject, to subscribe it to another source.
  ///
  /// Calls rejected by a disposed subject are reported to the unhandled-error
  /// handler.
  pub fn as_observer(&self) -> ObserverRef<T>
  where
    T: Clone + 'static,
  {
    Subscriber::new(SubjectSink(self.clone()))
  }
}

impl<T> Disposable for Subject<T> {
  #[inline]
  fn dispose(&self) { self.dispose_with(true) }
}

impl<T: 'static> Observable<T> for Subject<T> {
  fn subscribe_core(&self, observer: ObserverRef<T>) -> Result<Subscription, RxError> {
    let state = &self.inner.state;
    if let Some(result) = state.try_get_result().map_err(subject_disposed)? {
      observer.on_completed(result);
      return Ok(Subscription::empty());
    }

    let node = Arc::new(SubjectNode {
      observer: observer.clone(),
      parent: Mutex::new(Some(Arc::downgrade(&self.inner))),
      index: OnceCell::new(),
    });
    let index = self
      .inner
      .list
      .add(node.clone())
      .map_err(subject_disposed)?;
    let _ = node.index.set(index);

    // completion may have landed between the first check and the add
    match state.try_get_result() {
      Ok(None) => Ok(Subscription::new(node)),
      Ok(Some(result)) => {
        observer.on_completed(result);
        node.dispose();
        Ok(Subscription::empty())
      }
      Err(err) => {
        node.dispose();
        Err(subject_disposed(err))
      }
    }
  }
}

struct SubjectSink<T>(Subject<T>);

impl<T: Clone> ObserverCore<T> for SubjectSink<T> {
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    self.0.on_next(value).map_err(RxError::into_error)?;
    Ok(Flow::Continue)
  }

  fn error_resume_core(&self, err: Error) -> Result<(), Error> {
    self.0.on_error_resume(err).map_err(RxError::into_error)
  }

  fn completed_core(&self, result: Completion) -> Result<(), Error> {
    self.0.on_completed(result).map_err(RxError::into_error)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::prelude::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn collect<T: Clone + Send + 'static>(subject: &Subject<T>) -> (Arc<Mutex<Vec<T>>>, Subscription) {
    let items = Arc::new(Mutex::new(vec![]));
    let c_items = items.clone();
    let sub = subject
      .subscribe_next(move |v| c_items.lock().push(v))
      .unwrap();
    (items, sub)
  }

  #[test]
  fn base_data_flow() {
    let subject = Subject::new();
    let (items, _sub) = collect(&subject);
    subject.on_next(1).unwrap();
    subject.on_next(2).unwrap();
    assert_eq!(*items.lock(), vec![1, 2]);
  }

  #[test]
  fn disposed_subscription_stops_receiving() {
    let subject = Subject::new();
    let (a, sub_a) = collect(&subject);
    let (b, _sub_b) = collect(&subject);
    assert_eq!(subject.observer_count(), 2);

    subject.on_next(1).unwrap();
    sub_a.dispose();
    sub_a.dispose();
    subject.on_next(2).unwrap();

    assert_eq!(subject.observer_count(), 1);
    assert_eq!(*a.lock(), vec![1]);
    assert_eq!(*b.lock(), vec![1, 2]);
  }

  #[test]
  fn completion_is_recorded_once() {
    let subject = Subject::new();
    let results = Arc::new(Mutex::new(vec![]));
    let c_results = results.clone();
    subject
      .subscribe_complete(|_: i32| {}, move |r| c_results.lock().push(r.is_success()))
      .unwrap();

    subject.on_completed(Completion::Success).unwrap();
    subject
      .on_completed(Completion::failure(RxError::custom("late")))
      .unwrap();
    subject.on_next(1).unwrap();

    assert_eq!(*results.lock(), vec![true]);
    assert!(subject.is_completed());
    assert_eq!(subject.observer_count(), 0);
  }

  #[test]
  fn late_subscriber_gets_recorded_failure() {
    let subject = Subject::<i32>::new();
    subject
      .on_completed(Completion::failure(RxError::custom("boom")))
      .unwrap();

    let seen = Arc::new(Mutex::new(None));
    let c_seen = seen.clone();
    subject
      .subscribe_complete(
        |_| {},
        move |r| *c_seen.lock() = r.error().map(|e| e.to_string()),
      )
      .unwrap();
    assert_eq!(seen.lock().as_deref(), Some("boom"));
    assert_eq!(subject.observer_count(), 0);
  }

  #[test]
  fn disposed_subject_rejects_calls() {
    let subject = Subject::<i32>::new();
    subject.dispose();
    subject.dispose();
    let disposed = Err(RxError::Disposed("Subject"));
    assert_eq!(subject.on_next(1), disposed);
    assert_eq!(subject.complete(), disposed);
    assert_eq!(subject.subscribe_nop().unwrap_err(), RxError::Disposed("Subject"));
    assert!(subject.is_disposed());
    assert!(!subject.is_completed());
  }

  #[test]
  fn dispose_with_courtesy_completion() {
    for courtesy in [true, false] {
      let subject = Subject::<i32>::new();
      let completed = Arc::new(AtomicUsize::new(0));
      let c_completed = completed.clone();
      subject
        .subscribe_complete(
          |_| {},
          move |_| {
            c_completed.fetch_add(1, Ordering::SeqCst);
          },
        )
        .unwrap();
      subject.dispose_with(courtesy);
      assert_eq!(completed.load(Ordering::SeqCst), usize::from(courtesy));
    }
  }

  #[test]
  fn dropping_subject_releases_attached_observers() {
    let token = Arc::new(());
    let completed = Arc::new(AtomicUsize::new(0));
    {
      let subject = Subject::<i32>::new();
      let c_token = token.clone();
      let c_completed = completed.clone();
      let _sub = subject
        .subscribe_complete(
          move |_| {
            let _keep = &c_token;
          },
          move |_| {
            c_completed.fetch_add(1, Ordering::SeqCst);
          },
        )
        .unwrap();
      let c_token = token.clone();
      let _chain = subject
        .clone()
        .filter(|v| *v > 0)
        .map(|v| v * 2)
        .subscribe_next(move |_| {
          let _keep = &c_token;
        })
        .unwrap();
      assert_eq!(Arc::strong_count(&token), 3);
    }
    assert_eq!(Arc::strong_count(&token), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn dispose_without_completion_releases_observers() {
    let subject = Subject::<i32>::new();
    let token = Arc::new(());
    let c_token = token.clone();
    let sub = subject
      .subscribe_next(move |_| {
        let _keep = &c_token;
      })
      .unwrap();
    subject.dispose_with(false);
    drop(sub);
    assert_eq!(Arc::strong_count(&token), 1);
  }

  #[test]
  fn panicking_observer_does_not_stop_broadcast() {
    struct Exploding;

    impl Disposable for Exploding {
      fn dispose(&self) {}
    }

    impl Observer<i32> for Exploding {
      fn on_next(&self, _: i32) { panic!("foreign observer") }

      fn on_error_resume(&self, _: Error) {}

      fn on_completed(&self, _: Completion) {}

      fn set_upstream(&self, _: Subscription) -> Result<(), RxError> { Ok(()) }

      fn is_disposed(&self) -> bool { false }
    }

    let subject = Subject::<i32>::new();
    subject.subscribe(Arc::new(Exploding)).unwrap();
    let (items, _sub) = collect(&subject);
    assert_eq!(subject.on_next(7), Ok(()));
    assert_eq!(*items.lock(), vec![7]);
  }

  #[test]
  fn dispose_after_completion_sends_nothing_more() {
    let subject = Subject::<i32>::new();
    let completed = Arc::new(AtomicUsize::new(0));
    let c_completed = completed.clone();
    // keep the observer alive past completion
    let observer = Subscriber::new(NoAutoDispose(c_completed));
    subject.subscribe(observer).unwrap();
    subject.complete().unwrap();
    subject.dispose();
    assert_eq!(completed.load(Ordering::SeqCst), 1);
  }

  struct NoAutoDispose(Arc<AtomicUsize>);

  impl ObserverCore<i32> for NoAutoDispose {
    fn next_core(&self, _: i32) -> Result<Flow, Error> { Ok(Flow::Continue) }

    fn error_resume_core(&self, _: Error) -> Result<(), Error> { Ok(()) }

    fn completed_core(&self, _: Completion) -> Result<(), Error> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }

    fn auto_dispose_on_completed(&self) -> bool { false }
  }

  #[test]
  fn last_observer_receives_moved_value() {
    #[derive(Debug)]
    struct Tracked(Arc<AtomicUsize>);
    impl Clone for Tracked {
      fn clone(&self) -> Self {
        self.0.fetch_add(1, Ordering::SeqCst);
        Tracked(self.0.clone())
      }
    }

    let clones = Arc::new(AtomicUsize::new(0));
    let subject = Subject::<Tracked>::new();
    for _ in 0..3 {
      subject.subscribe_nop().unwrap();
    }
    subject.on_next(Tracked(clones.clone())).unwrap();
    assert_eq!(clones.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn reentrant_push() {
    let subject = Subject::new();
    let items = Arc::new(Mutex::new(vec![]));
    let c_items = items.clone();
    let c_subject = subject.clone();
    subject
      .subscribe_next(move |v: i32| {
        c_items.lock().push(v);
        if v < 3 {
          c_subject.on_next(v + 1).unwrap();
        }
      })
      .unwrap();
    subject.on_next(1).unwrap();
    assert_eq!(*items.lock(), vec![1, 2, 3]);
    subject.dispose();
  }

  #[test]
  fn subscribe_from_inside_callback() {
    let subject = Subject::new();
    let inner_hits = Arc::new(AtomicUsize::new(0));
    let c_subject = subject.clone();
    let c_hits = inner_hits.clone();
    subject
      .subscribe_next(move |v: i32| {
        if v == 1 {
          let hits = c_hits.clone();
          c_subject
            .subscribe_next(move |_| {
              hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
      })
      .unwrap();
    subject.on_next(1).unwrap();
    subject.on_next(2).unwrap();
    // the inner observer joined after the first snapshot was taken
    assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
    subject.dispose();
  }

  #[test]
  fn error_resume_does_not_complete() {
    let subject = Subject::<i32>::new();
    let errors = Arc::new(Mutex::new(vec![]));
    let c_errors = errors.clone();
    let (items, _sub) = {
      let items = Arc::new(Mutex::new(vec![]));
      let c_items = items.clone();
      let sub = subject
        .subscribe_all(
          move |v| c_items.lock().push(v),
          move |e| c_errors.lock().push(e.to_string()),
          |_| {},
        )
        .unwrap();
      (items, sub)
    };
    subject.on_next(1).unwrap();
    subject
      .on_error_resume(RxError::custom("hiccup").into_error())
      .unwrap();
    subject.on_next(2).unwrap();
    assert_eq!(*items.lock(), vec![1, 2]);
    assert_eq!(*errors.lock(), vec!["hiccup"]);
  }

  #[test]
  fn as_observer_multicasts_a_source() {
    let subject = Subject::new();
    let (a, _a) = collect(&subject);
    let (b, _b) = collect(&subject);
    observable::from_iter(1..=3)
      .subscribe(subject.as_observer())
      .unwrap();
    assert_eq!(*a.lock(), vec![1, 2, 3]);
    assert_eq!(*b.lock(), vec![1, 2, 3]);
    assert!(subject.is_completed());
  }

  #[test]
  fn concurrent_producers() {
    let subject = Subject::new();
    let (items, _sub) = collect(&subject);
    let handles: Vec<_> = (0..4)
      .map(|t| {
        let subject = subject.clone();
        std::thread::spawn(move || {
          for i in 0..250 {
            subject.on_next(t * 1000 + i).unwrap();
          }
        })
      })
      .collect();
    handles.into_iter().for_each(|h| h.join().unwrap());
    assert_eq!(items.lock().len(), 1000);
  }

  #[test]
  fn concurrent_subscribe_and_complete() {
    for _ in 0..50 {
      let subject = Subject::<i32>::new();
      let completions = Arc::new(AtomicUsize::new(0));
      let handles: Vec<_> = (0..4)
        .map(|_| {
          let subject = subject.clone();
          let completions = completions.clone();
          std::thread::spawn(move || {
            subject
              .subscribe_complete(
                |_| {},
                move |_| {
                  completions.fetch_add(1, Ordering::SeqCst);
                },
              )
              .unwrap();
          })
        })
        .collect();
      subject.complete().unwrap();
      handles.into_iter().for_each(|h| h.join().unwrap());
      assert_eq!(completions.load(Ordering::SeqCst), 4);
    }
  }
}
