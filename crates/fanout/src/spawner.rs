// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Substrate port for running work units.
//!
//! The fan-out runner does not schedule anything itself. It asks a [`Spawner`]
//! to start one independent unit per element and later awaits the returned
//! handle. Cancellation is not part of this trait: requests travel through the
//! unit's [`CancelSignal`](crate::CancelSignal), which the runner installs
//! around the unit future before spawning it.
//!
//! Two substrates ship with the crate:
//!
//! - [`TokioSpawner`] spawns tasks on a tokio runtime (the default).
//! - [`ThreadSpawner`] runs every unit on a dedicated OS thread with a local
//!   executor.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::Priority;

/// Payload of a panicked work unit, as produced by `std::panic::catch_unwind`.
pub type Panic = Box<dyn Any + Send + 'static>;

/// Starts independent units of work and hands back joinable handles.
///
/// Implementations must guarantee that a spawned unit makes progress on its
/// own (without the handle being polled) and that its handle eventually
/// resolves once the unit is terminal. A unit that panics resolves to
/// `Err(payload)`.
pub trait Spawner: Send + Sync {
    /// Joinable handle for a unit producing `T`. Awaiting it is the join.
    type Handle<T: Send + 'static>: Future<Output = Result<T, Panic>> + Send + Unpin + 'static;

    /// Starts `unit`, forwarding the optional priority hint to the substrate
    /// uninterpreted.
    fn spawn<F>(&self, unit: F, priority: Option<Priority>) -> Self::Handle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;
}

impl<S: Spawner> Spawner for &S {
    type Handle<T: Send + 'static> = S::Handle<T>;

    fn spawn<F>(&self, unit: F, priority: Option<Priority>) -> Self::Handle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        (**self).spawn(unit, priority)
    }
}

// ── tokio ──────────────────────────────────────────────────────────────

/// Spawns units as tokio tasks.
///
/// Tokio has no task priorities, so the hint is dropped here; the runner still
/// records it on each unit's tracing span.
///
/// Without an explicit [`Handle`], units go to the runtime the spawning code is
/// running on; spawning outside any runtime panics (tokio's own rule).
#[derive(Clone, Debug, Default)]
pub struct TokioSpawner {
    runtime: Option<Handle>,
}

impl TokioSpawner {
    /// Spawns onto the ambient runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns onto the given runtime, wherever the call comes from.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }
}

impl Spawner for TokioSpawner {
    type Handle<T: Send + 'static> = TokioUnit<T>;

    fn spawn<F>(&self, unit: F, _priority: Option<Priority>) -> TokioUnit<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let join = match &self.runtime {
            Some(runtime) => runtime.spawn(unit),
            None => tokio::spawn(unit),
        };
        TokioUnit { join }
    }
}

/// Handle to a unit running as a tokio task.
pub struct TokioUnit<T> {
    join: JoinHandle<T>,
}

impl<T> fmt::Debug for TokioUnit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioUnit")
            .field("finished", &self.join.is_finished())
            .finish()
    }
}

impl<T> Future for TokioUnit<T> {
    type Output = Result<T, Panic>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = ready!(Pin::new(&mut self.join).poll(cx));
        Poll::Ready(outcome.map_err(|err| match err.try_into_panic() {
            Ok(payload) => payload,
            // Only reachable when the runtime shuts down under the unit.
            Err(err) => Box::new(format!("work unit aborted: {err}")) as Panic,
        }))
    }
}

// ── dedicated threads ──────────────────────────────────────────────────

/// Runs every unit on its own OS thread, driving it with a local executor.
///
/// Units must not rely on a tokio runtime (no tokio timers or IO); tokio
/// synchronization primitives, including [`cancel`](crate::cancel), work.
/// Threads have no portable priority, so the hint only shows up in the thread
/// name.
///
/// # Panics
///
/// If the OS refuses to start a thread, that unit resolves as panicked with a
/// `"failed to start work unit thread: {error}"` payload, and the join barrier
/// resumes that panic on the caller once the other units are terminal.
#[derive(Clone, Debug)]
pub struct ThreadSpawner {
    name: String,
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new("fanout-unit")
    }
}

impl ThreadSpawner {
    /// Creates a spawner whose threads are named `{name}` (plus the hint).
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Spawner for ThreadSpawner {
    type Handle<T: Send + 'static> = ThreadUnit<T>;

    fn spawn<F>(&self, unit: F, priority: Option<Priority>) -> ThreadUnit<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let name = match priority {
            Some(p) => format!("{}-{p}", self.name),
            None => self.name.clone(),
        };
        let spawned = std::thread::Builder::new().name(name).spawn(move || {
            let outcome = futures_executor::block_on(AssertUnwindSafe(unit).catch_unwind());
            // The receiver is gone only if the caller stopped waiting.
            let _ = tx.send(outcome);
        });
        match spawned {
            Ok(_) => ThreadUnit { rx },
            Err(err) => {
                warn!(error = %err, "failed to start work unit thread");
                ThreadUnit::start_failed(&err)
            }
        }
    }
}

/// Handle to a unit running on a dedicated thread.
#[derive(Debug)]
pub struct ThreadUnit<T> {
    rx: oneshot::Receiver<Result<T, Panic>>,
}

impl<T> ThreadUnit<T> {
    /// Handle for a unit whose thread never started.
    fn start_failed(err: &std::io::Error) -> Self {
        let (tx, rx) = oneshot::channel();
        let payload = Box::new(format!("failed to start work unit thread: {err}")) as Panic;
        // The receiver is held right here.
        let _ = tx.send(Err(payload));
        Self { rx }
    }
}

impl<T> Future for ThreadUnit<T> {
    type Output = Result<T, Panic>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let received = ready!(Pin::new(&mut self.rx).poll(cx));
        Poll::Ready(received.unwrap_or_else(|_| {
            Err(Box::new("work unit thread exited without a result".to_string()) as Panic)
        }))
    }
}
