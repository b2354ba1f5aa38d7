//! # rxpush: push-based reactive streams
//!
//! An in-process implementation of the observable/observer contract.
//! Sources push values synchronously into their observers, on whatever thread
//! produced them, and every type is `Send + Sync`.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxpush::prelude::*;
//!
//! let numbers = Subject::<i32>::new();
//! let subscription = numbers
//!   .clone()
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe_next(|v| println!("Value: {v}"))
//!   .unwrap();
//!
//! (0..10).for_each(|v| numbers.on_next(v).unwrap());
//! subscription.dispose();
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Describes how to produce values, holds no subscription state |
//! | [`Observer`] | Consumes `on_next`, `on_error_resume` and `on_completed` |
//! | [`Subject`] | Multicast hub, both a source and a sink |
//! | [`Subscription`] | Handle releasing an active subscription |
//!
//! Errors either resume the stream (`on_error_resume`, the stream goes on) or
//! end it (`on_completed` with a [`Completion::Failure`]). Errors that can't
//! reach any observer go to the process wide handler set with
//! [`set_unhandled_error_handler`].
//!
//! ## Feature Flags
//!
//! - **`tracing`** (default): diagnostics through the `tracing` crate. Without
//!   it only unhandled errors are printed, to stderr.
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subject`]: subject::Subject
//! [`Subscription`]: disposable::Subscription
//! [`Completion::Failure`]: error::Completion::Failure
//! [`set_unhandled_error_handler`]: unhandled::set_unhandled_error_handler

mod logging;

pub mod collections;
pub mod disposable;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod subject;
pub mod unhandled;

pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
