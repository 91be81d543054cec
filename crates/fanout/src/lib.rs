// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sequential and fan-out/fan-in async operations over ordered collections.
//!
//! Every operation family (visit-each, transform, compact-transform,
//! flatten-transform, filter) comes in two execution modes:
//!
//! - [`sequential`] awaits the caller's operation once per element, strictly in
//!   input order, on the caller's own task.
//! - [`concurrent`] spawns one work unit per element through a [`Spawner`] and
//!   joins them back into input order with a join barrier.
//!
//! Folding is sequential only ([`sequential::fold`]). [`optional`] lifts an async
//! transform over an `Option`.
//!
//! # Ordering
//!
//! Output values always line up with input positions. Execution and completion
//! order of concurrent units is unspecified, and so is the order of any side
//! effects they perform.
//!
//! # Failure
//!
//! Output is all-or-nothing. Sequential `try_*` operations stop at the first
//! error. Concurrent `try_*` operations return exactly one error (whichever the
//! barrier observes first), raise the cooperative [`cancel`] signal of every other
//! unit, and still wait for all of them before returning.
//!
//! # Example
//!
//! ```
//! use fanout::{ConcurrentExt, SequentialExt};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let squares = vec![1, 2, 3].concurrent_map(|x: i32| async move { x * x }).await;
//! assert_eq!(squares, vec![1, 4, 9]);
//!
//! let total = vec![1, 2, 3].async_fold(0, |acc, x| async move { acc - x }).await;
//! assert_eq!(total, -6);
//! # });
//! ```
#![forbid(unsafe_code)]

pub mod cancel;
pub mod concurrent;
pub mod config;
pub mod optional;
pub mod sequential;
pub mod spawner;

mod barrier;
mod ext;
mod priority;
mod unit;

pub use cancel::CancelSignal;
pub use concurrent::FanOut;
pub use config::{ConfigError, ConfigService, ConfigStore, MemoryConfigStore, RunnerConfig};
pub use ext::{ConcurrentExt, SequentialExt};
pub use optional::OptionExt;
pub use priority::{ParsePriorityError, Priority};
pub use spawner::{Panic, Spawner, ThreadSpawner, TokioSpawner};

use std::convert::Infallible;

/// Unwraps the result of a `try_*` operation that was driven with an
/// infallible error type.
pub(crate) fn into_ok<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
