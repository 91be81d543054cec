// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Join barrier: waits for every unit of one fan-out call.
//!
//! The barrier owns the units spawned by a single call. [`JoinBarrier::join`]
//! drains them in completion order, places each value into a positional
//! buffer by the unit's input index, and returns only when every unit is
//! terminal.
//!
//! # Failure selection
//!
//! The first `Err` the barrier observes is kept; every unit's cancellation
//! signal is raised at that moment; later values and errors are dropped. Which
//! error wins when several units fail is a completion race. A panicking unit
//! is handled the same way, takes precedence over any error, and is resumed on
//! the caller's task after the drain (same as a scoped thread join).

use std::future::Future;
use std::panic;

use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::spawner::Panic;
use crate::unit::WorkUnit;
use crate::CancelSignal;

/// Owns the statically-known set of units spawned by one call.
///
/// Dropping a barrier that has not been joined (or a `join` future that has
/// not finished) raises every unit's signal. The units keep running on their
/// substrate until they notice or finish; nothing can block in `drop`.
pub(crate) struct JoinBarrier<H> {
    units: Vec<WorkUnit<H>>,
}

impl<H> JoinBarrier<H> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            units: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, unit: WorkUnit<H>) {
        debug_assert_eq!(unit.index, self.units.len(), "units must be pushed in input order");
        self.units.push(unit);
    }

    pub(crate) fn len(&self) -> usize {
        self.units.len()
    }
}

impl<H> Drop for JoinBarrier<H> {
    fn drop(&mut self) {
        if self.units.is_empty() {
            return;
        }
        debug!(units = self.units.len(), "join barrier dropped before join; cancelling units");
        for unit in &self.units {
            unit.request_cancel();
        }
    }
}

/// Raises the collected signals if the join future is dropped mid-drain.
struct CancelOnDrop {
    signals: Vec<CancelSignal>,
    armed: bool,
}

impl CancelOnDrop {
    fn cancel_all(&self) {
        for signal in &self.signals {
            signal.cancel();
        }
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!(units = self.signals.len(), "fan-out dropped while joining; cancelling units");
            self.cancel_all();
        }
    }
}

impl<H, T, E> JoinBarrier<H>
where
    H: Future<Output = Result<Result<T, E>, Panic>> + Unpin,
{
    /// Waits for every unit and returns all values in input order, or the one
    /// selected error.
    ///
    /// # Panics
    ///
    /// Resumes the first observed unit panic once every unit is terminal.
    pub(crate) async fn join(mut self) -> Result<Vec<T>, E> {
        let units = std::mem::take(&mut self.units);
        let total = units.len();
        let mut guard = CancelOnDrop {
            signals: units.iter().map(|unit| unit.signal.clone()).collect(),
            armed: true,
        };
        let mut pending: FuturesUnordered<_> = units
            .into_iter()
            .map(|WorkUnit { index, handle, .. }| handle.map(move |outcome| (index, outcome)))
            .collect();

        let mut buffer: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut failure: Option<E> = None;
        let mut panicked: Option<Panic> = None;

        while let Some((index, outcome)) = pending.next().await {
            match outcome {
                Ok(Ok(value)) => {
                    if failure.is_none() && panicked.is_none() {
                        buffer[index] = Some(value);
                    }
                }
                Ok(Err(err)) => {
                    if failure.is_none() && panicked.is_none() {
                        debug!(index, in_flight = pending.len(), "unit failed; cancelling siblings");
                        guard.cancel_all();
                        failure = Some(err);
                    }
                }
                Err(payload) => {
                    warn!(index, "work unit panicked");
                    if panicked.is_none() {
                        guard.cancel_all();
                        panicked = Some(payload);
                    }
                }
            }
        }
        guard.armed = false;
        debug!(units = total, failed = failure.is_some(), "fan-out joined");

        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }
        if let Some(err) = failure {
            return Err(err);
        }
        let values: Vec<T> = buffer.into_iter().flatten().collect();
        debug_assert_eq!(values.len(), total);
        Ok(values)
    }
}
