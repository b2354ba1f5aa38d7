//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Disposal
pub use crate::disposable::{
  CompositeDisposable, Disposable, DisposableBag, DisposableBuilder, SingleAssignmentDisposable,
  Subscription,
};
// Errors
pub use crate::error::{Completion, Error, RxError};
// Core traits and sources
pub use crate::observable::{self, BoxObservable, Observable, SubscribeExt};
pub use crate::observer::{AnonymousObserver, Flow, Observer, ObserverCore, ObserverRef, Subscriber};
// Operators
pub use crate::ops::{self, combine_latest, merge, ObservableExt};
// Subject
pub use crate::subject::Subject;
pub use crate::unhandled::{set_unhandled_error_handler, ErrorHandler};
