use std::{
  cell::RefCell,
  marker::PhantomData,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use parking_lot::ReentrantMutex;

use crate::{
  disposable::{CompositeDisposable, Disposable, Subscription},
  error::{catch_callback, Completion, Error, RxError},
  observable::Observable,
  observer::{Flow, Observer, ObserverCore, ObserverRef, Subscriber},
};

/// Emits the latest value of every source each time one of them emits, once
/// all of them emitted at least once.
///
/// The stream completes after every source completed and fails as soon as
/// one of them fails.
///
/// ```
/// use rxpush::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// let a = Subject::<i32>::new();
/// let b = Subject::<i32>::new();
/// let out = Arc::new(Mutex::new(vec![]));
/// let c_out = out.clone();
/// combine_latest([a.clone(), b.clone()])
///   .subscribe_next(move |v: Vec<i32>| c_out.lock().unwrap().push(v))
///   .unwrap();
/// a.on_next(1).unwrap();
/// b.on_next(10).unwrap();
/// a.on_next(2).unwrap();
/// assert_eq!(*out.lock().unwrap(), vec![vec![1, 10], vec![2, 10]]);
/// ```
pub fn combine_latest<S>(sources: impl IntoIterator<Item = S>) -> CombineLatestOp<S> {
  CombineLatestOp { sources: sources.into_iter().collect() }
}

#[derive(Clone)]
pub struct CombineLatestOp<S> {
  sources: Vec<S>,
}

impl<T, S> Observable<Vec<T>> for CombineLatestOp<S>
where
  T: Clone + Send + 'static,
  S: Observable<T>,
{
  fn subscribe_core(&self, observer: ObserverRef<Vec<T>>) -> Result<Subscription, RxError> {
    let total = self.sources.len();
    if total == 0 {
      observer.on_completed(Completion::Success);
      return Ok(Subscription::empty());
    }

    let inners = Arc::new(CompositeDisposable::with_capacity(total));
    let state = Arc::new(CombineState {
      latest: ReentrantMutex::new(RefCell::new(Latest { values: vec![None; total], filled: 0 })),
      terminal: Terminal::new(observer, total, inners.clone()),
    });
    for (index, source) in self.sources.iter().enumerate() {
      if inners.is_disposed() {
        break;
      }
      let inner = Subscriber::new(CombineLatestObserver { state: state.clone(), index });
      subscribe_inner(source, inner, &inners)?;
    }
    Ok(Subscription::new(inners))
  }
}

struct Latest<T> {
  values: Vec<Option<T>>,
  filled: usize,
}

struct CombineState<T> {
  latest: ReentrantMutex<RefCell<Latest<T>>>,
  terminal: Terminal<Vec<T>>,
}

struct CombineLatestObserver<T> {
  state: Arc<CombineState<T>>,
  index: usize,
}

impl<T> ObserverCore<T> for CombineLatestObserver<T>
where
  T: Clone + Send,
{
  fn next_core(&self, value: T) -> Result<Flow, Error> {
    let gate = self.state.latest.lock();
    let combined = {
      let mut latest = gate.borrow_mut();
      if latest.values[self.index].replace(value).is_none() {
        latest.filled += 1;
      }
      (latest.filled == latest.values.len())
        .then(|| latest.values.iter().flatten().cloned().collect::<Vec<_>>())
    };
    if let Some(values) = combined {
      self.state.terminal.downstream.on_next(values);
    }
    Ok(Flow::Continue)
  }

  fn error_resume_core(&self, err: Error) -> Result<(), Error> {
    let _gate = self.state.latest.lock();
    self.state.terminal.downstream.on_error_resume(err);
    Ok(())
  }

  fn completed_core(&self, result: Completion) -> Result<(), Error> {
    let gate = self.state.latest.lock();
    let finished = self.state.terminal.source_completed(result);
    drop(gate);
    if finished {
      self.state.terminal.inners.dispose();
    }
    Ok(())
  }
}

/// Combines the latest values of two sources with `selector`.
pub struct CombineLatest2Op<A, B, SA, SB, F> {
  a: SA,
  b: SB,
  selector: Arc<F>,
  _items: PhantomData<fn(A, B)>,
}

impl<A, B, SA, SB, F> CombineLatest2Op<A, B, SA, SB, F> {
  pub(crate) fn new(a: SA, b: SB, selector: F) -> Self {
    CombineLatest2Op { a, b, selector: Arc::new(selector), _items: PhantomData }
  }
}

impl<A, B, R, SA, SB, F> Observable<R> for CombineLatest2Op<A, B, SA, SB, F>
where
  A: Clone + Send + 'static,
  B: Clone + Send + 'static,
  R: 'static,
  SA: Observable<A>,
  SB: Observable<B>,
  F: Fn(A, B) -> R + Send + Sync + 'static,
{
  fn subscribe_core(&self, observer: ObserverRef<R>) -> Result<Subscription, RxError> {
    let inners = Arc::new(CompositeDisposable::with_capacity(2));
    let state = Arc::new(PairState {
      latest: ReentrantMutex::new(RefCell::new((None, None))),
      selector: self.selector.clone(),
      terminal: Terminal::new(observer, 2, inners.clone()),
    });
    subscribe_inner(&self.a, Subscriber::new(Left(state.clone())), &inners)?;
    if !inners.is_disposed() {
      subscribe_inner(&self.b, Subscriber::new(Right(state)), &inners)?;
    }
    Ok(Subscription::new(inners))
  }
}

struct PairState<A, B, R, F> {
  latest: ReentrantMutex<RefCell<(Option<A>, Option<B>)>>,
  selector: Arc<F>,
  terminal: Terminal<R>,
}

impl<A, B, R, F> PairState<A, B, R, F>
where
  A: Clone,
  B: Clone,
  F: Fn(A, B) -> R,
{
  fn update(&self, store: impl FnOnce(&mut (Option<A>, Option<B>))) -> Result<Flow, Error> {
    let gate = self.latest.lock();
    let pair = {
      let mut latest = gate.borrow_mut();
      store(&mut latest);
      match &*latest {
        (Some(a), Some(b)) => Some((a.clone(), b.clone())),
        _ => None,
      }
    };
    if let Some((a, b)) = pair {
      match catch_callback(|| Ok((self.selector)(a, b))) {
        Ok(v) => self.terminal.downstream.on_next(v),
        Err(err) => return Ok(Flow::Complete(Completion::Failure(err))),
      }
    }
    Ok(Flow::Continue)
  }

  fn error_resume(&self, err: Error) -> Result<(), Error> {
    let _gate = self.latest.lock();
    self.terminal.downstream.on_error_resume(err);
    Ok(())
  }

  fn completed(&self, result: Completion) -> Result<(), Error> {
    let gate = self.latest.lock();
    let finished = self.terminal.source_completed(result);
    drop(gate);
    if finished {
      self.terminal.inners.dispose();
    }
    Ok(())
  }
}

struct Left<A, B, R, F>(Arc<PairState<A, B, R, F>>);

struct Right<A, B, R, F>(Arc<PairState<A, B, R, F>>);

impl<A, B, R, F> ObserverCore<A> for Left<A, B, R, F>
where
  A: Clone + Send,
  B: Clone + Send,
  F: Fn(A, B) -> R + Send + Sync,
{
  fn next_core(&self, value: A) -> Result<Flow, Error> {
    self.0.update(|latest| latest.0 = Some(value))
  }

  fn error_resume_core(&self, err: Error) -> Result<(), Error> { self.0.error_resume(err) }

  fn completed_core(&self, result: Completion) -> Result<(), Error> { self.0.completed(result) }
}

impl<A, B, R, F> ObserverCore<B> for Right<A, B, R, F>
where
  A: Clone + Send,
  B: Clone + Send,
  F: Fn(A, B) -> R + Send + Sync,
{
  fn next_core(&self, value: B) -> Result<Flow, Error> {
    self.0.update(|latest| latest.1 = Some(value))
  }

  fn error_resume_core(&self, err: Error) -> Result<(), Error> { self.0.error_resume(err) }

  fn completed_core(&self, result: Completion) -> Result<(), Error> { self.0.completed(result) }
}

/// Downstream side shared by the inner observers.
struct Terminal<R> {
  downstream: ObserverRef<R>,
  completed: AtomicUsize,
  total: usize,
  inners: Arc<CompositeDisposable>,
}

impl<R> Terminal<R> {
  fn new(downstream: ObserverRef<R>, total: usize, inners: Arc<CompositeDisposable>) -> Self {
    Terminal { downstream, completed: AtomicUsize::new(0), total, inners }
  }

  /// Returns whether the downstream was completed, in which case the caller
  /// disposes the inners once it released its gate.
  fn source_completed(&self, result: Completion) -> bool {
    let finished = match result {
      Completion::Failure(_) => true,
      Completion::Success => self.completed.fetch_add(1, Ordering::AcqRel) + 1 == self.total,
    };
    if finished {
      self.downstream.on_completed(result);
    }
    finished
  }
}

fn subscribe_inner<T: 'static>(
  source: &impl Observable<T>, inner: ObserverRef<T>, inners: &CompositeDisposable,
) -> Result<(), RxError> {
  match source.subscribe(inner) {
    Ok(sub) => {
      inners.add(sub);
      Ok(())
    }
    Err(err) => {
      inners.dispose();
      Err(err)
    }
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use parking_lot::Mutex;
  use std::sync::Arc;

  #[test]
  fn emits_once_every_source_has_a_value() {
    let s1 = Subject::<i32>::new();
    let s2 = Subject::<i32>::new();
    let out = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (c_out, c_completed) = (out.clone(), completed.clone());
    combine_latest([s1.clone(), s2.clone()])
      .subscribe_complete(
        move |v| c_out.lock().push(v),
        move |r| *c_completed.lock() = r.is_success(),
      )
      .unwrap();

    s1.on_next(1).unwrap();
    s1.on_next(2).unwrap();
    assert!(out.lock().is_empty());
    s2.on_next(1).unwrap();
    assert_eq!(*out.lock(), vec![vec![2, 1]]);
    s1.on_next(3).unwrap();
    assert_eq!(out.lock().last(), Some(&vec![3, 1]));
    s1.complete().unwrap();
    s2.on_next(4).unwrap();
    assert_eq!(out.lock().last(), Some(&vec![3, 4]));
    assert!(!*completed.lock());
    s2.complete().unwrap();
    assert!(*completed.lock());
    assert_eq!(out.lock().len(), 3);
  }

  #[test]
  fn failure_completes_at_once() {
    let s1 = Subject::<i32>::new();
    let s2 = Subject::<i32>::new();
    let failure = Arc::new(Mutex::new(None));
    let c_failure = failure.clone();
    combine_latest([s1.clone(), s2.clone()])
      .subscribe_complete(
        |_| {},
        move |r| *c_failure.lock() = r.error().map(|e| e.to_string()),
      )
      .unwrap();

    s2.on_completed(Completion::failure(RxError::custom("lost"))).unwrap();
    assert_eq!(failure.lock().as_deref(), Some("lost"));
    assert_eq!(s1.observer_count(), 0);
  }

  #[test]
  fn no_sources() {
    let completed = Arc::new(Mutex::new(false));
    let c_completed = completed.clone();
    combine_latest(Vec::<Subject<i32>>::new())
      .subscribe_complete(|_| {}, move |r| *c_completed.lock() = r.is_success())
      .unwrap();
    assert!(*completed.lock());
  }

  #[test]
  fn with_selector() {
    let numbers = Subject::<i32>::new();
    let labels = Subject::<&'static str>::new();
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    numbers
      .clone()
      .combine_latest_with(labels.clone(), |n: i32, l: &'static str| format!("{l}{n}"))
      .subscribe_next(move |v| c_out.lock().push(v))
      .unwrap();

    numbers.on_next(1).unwrap();
    labels.on_next("a").unwrap();
    numbers.on_next(2).unwrap();
    labels.on_next("b").unwrap();
    assert_eq!(*out.lock(), vec!["a1", "a2", "b2"]);
  }

  #[test]
  fn panicking_selector_fails_stream() {
    let a = Subject::<i32>::new();
    let b = Subject::<i32>::new();
    let failed = Arc::new(Mutex::new(false));
    let c_failed = failed.clone();
    a.clone()
      .combine_latest_with(b.clone(), |x: i32, y: i32| -> i32 {
        if y == 0 {
          panic!("divide by zero");
        }
        x / y
      })
      .subscribe_complete(|_| {}, move |r| *c_failed.lock() = r.is_failure())
      .unwrap();

    a.on_next(4).unwrap();
    b.on_next(0).unwrap();
    assert!(*failed.lock());
    assert_eq!(a.observer_count(), 0);
    assert_eq!(b.observer_count(), 0);
  }

  #[test]
  fn synchronous_sources() {
    let out = Arc::new(Mutex::new(vec![]));
    let c_out = out.clone();
    combine_latest(vec![observable::from_iter(0..3), observable::from_iter(10..12)])
      .subscribe_next(move |v| c_out.lock().push(v))
      .unwrap();
    assert_eq!(*out.lock(), vec![vec![2, 10], vec![2, 11]]);
  }
}
