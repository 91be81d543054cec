// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One spawned execution of the caller's operation over one element.

use std::future::Future;

use tracing::{debug_span, Instrument};

use crate::{CancelSignal, Priority, Spawner};

/// A spawned unit, identified by the input position of its element.
///
/// The index is assigned at spawn time and is the only thing the join barrier
/// uses to place the outcome; completion order never matters.
pub(crate) struct WorkUnit<H> {
    pub(crate) index: usize,
    pub(crate) handle: H,
    pub(crate) signal: CancelSignal,
}

/// Everything about a spawn that is identical for all units of one call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpawnOptions {
    pub(crate) priority: Option<Priority>,
    pub(crate) trace: bool,
}

/// Spawns `unit` for input position `index`.
///
/// The unit future runs with `signal` as its ambient cancellation signal and,
/// when tracing is on, inside a `work_unit` span.
pub(crate) fn spawn<S, F>(
    spawner: &S,
    index: usize,
    unit: F,
    signal: CancelSignal,
    options: SpawnOptions,
) -> WorkUnit<S::Handle<F::Output>>
where
    S: Spawner,
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let scoped = signal.clone().scope(unit);
    let handle = if options.trace {
        let span = debug_span!("work_unit", index, priority = ?options.priority);
        spawner.spawn(scoped.instrument(span), options.priority)
    } else {
        spawner.spawn(scoped, options.priority)
    };
    WorkUnit {
        index,
        handle,
        signal,
    }
}

impl<H> WorkUnit<H> {
    /// Asks the unit to stop early. Cooperative: the unit may ignore it.
    pub(crate) fn request_cancel(&self) {
        self.signal.cancel();
    }
}
