// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Concurrent fan-out/fan-in operations.
//!
//! [`FanOut`] spawns one work unit per input element (in input order, each
//! tagged with its index), hands them to a join barrier, and rebuilds the
//! output by index. Compaction and flattening happen after the join, exactly as
//! in [`sequential`](crate::sequential).
//!
//! There is no throttling: an input of length n puts n units on the substrate
//! at once. Callers wanting a bound chunk their input.
//!
//! There is no concurrent fold.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::debug;

use crate::barrier::JoinBarrier;
use crate::unit::{self, SpawnOptions};
use crate::{into_ok, CancelSignal, Priority, RunnerConfig, Spawner, TokioSpawner};

/// Fan-out runner over a [`Spawner`].
///
/// Element type, operation and output must be `Send + 'static`: every unit owns
/// its element and shares the operation through an `Arc`.
///
/// ```
/// use fanout::{FanOut, Priority};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let runner = FanOut::new().with_priority(Priority::High);
/// let lengths = runner
///     .map(vec!["a", "bb", "ccc"], |s: &'static str| async move { s.len() })
///     .await;
/// assert_eq!(lengths, vec![1, 2, 3]);
/// # });
/// ```
#[derive(Clone, Debug)]
pub struct FanOut<S = TokioSpawner> {
    spawner: S,
    priority: Option<Priority>,
    trace_units: bool,
}

impl Default for FanOut<TokioSpawner> {
    fn default() -> Self {
        Self::new()
    }
}

impl FanOut<TokioSpawner> {
    /// Runner on the ambient tokio runtime, scheduler-default priority.
    pub fn new() -> Self {
        Self::with_spawner(TokioSpawner::new())
    }
}

impl<S: Spawner> FanOut<S> {
    /// Runner on an arbitrary substrate.
    pub fn with_spawner(spawner: S) -> Self {
        Self::from_config(spawner, &RunnerConfig::default())
    }

    /// Runner whose defaults come from a loaded [`RunnerConfig`].
    pub fn from_config(spawner: S, config: &RunnerConfig) -> Self {
        Self {
            spawner,
            priority: config.default_priority,
            trace_units: config.trace_units,
        }
    }

    /// Attaches `priority` to every unit this runner spawns.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Clears the hint back to the scheduler default.
    pub fn without_priority(mut self) -> Self {
        self.priority = None;
        self
    }

    /// Turns the per-unit `work_unit` tracing span on or off.
    pub fn trace_units(mut self, enabled: bool) -> Self {
        self.trace_units = enabled;
        self
    }

    /// The hint forwarded with every unit, if any.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// The substrate units are spawned on.
    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Spawns one unit per element, in input order.
    fn spawn_all<I, F, Fut, U, E>(
        &self,
        input: I,
        op: F,
    ) -> JoinBarrier<S::Handle<Result<U, E>>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        U: Send + 'static,
        E: Send + 'static,
    {
        let op = Arc::new(op);
        let options = SpawnOptions {
            priority: self.priority,
            trace: self.trace_units,
        };
        let input = input.into_iter();
        let mut barrier = JoinBarrier::with_capacity(input.size_hint().0);
        for (index, element) in input.enumerate() {
            let op = Arc::clone(&op);
            let work = async move { (*op)(element).await };
            // Direct child of the enclosing unit's signal; no intermediate node.
            let signal = CancelSignal::inherit();
            barrier.push(unit::spawn(&self.spawner, index, work, signal, options));
        }
        debug!(units = barrier.len(), priority = ?self.priority, "fan-out spawned");
        barrier
    }

    /// Runs `op` on every element concurrently; returns once all units finished.
    pub async fn for_each<I, F, Fut>(&self, input: I, op: F)
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let op = move |element: I::Item| op(element).map(Ok::<(), Infallible>);
        into_ok(self.spawn_all(input, op).join().await);
    }

    /// Fallible [`for_each`](Self::for_each): one error, after every unit is terminal.
    pub async fn try_for_each<I, F, Fut, E>(&self, input: I, op: F) -> Result<(), E>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        self.spawn_all(input, op).join().await.map(drop)
    }

    /// Transforms every element concurrently; output order matches input order.
    pub async fn map<I, F, Fut, U>(&self, input: I, op: F) -> Vec<U>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
        U: Send + 'static,
    {
        let op = move |element: I::Item| op(element).map(Ok::<U, Infallible>);
        into_ok(self.spawn_all(input, op).join().await)
    }

    /// Fallible [`map`](Self::map).
    pub async fn try_map<I, F, Fut, U, E>(&self, input: I, op: F) -> Result<Vec<U>, E>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        U: Send + 'static,
        E: Send + 'static,
    {
        self.spawn_all(input, op).join().await
    }

    /// Transforms concurrently and drops `None`s, keeping input order.
    pub async fn compact_map<I, F, Fut, U>(&self, input: I, op: F) -> Vec<U>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<U>> + Send + 'static,
        U: Send + 'static,
    {
        self.map(input, op).await.into_iter().flatten().collect()
    }

    /// Fallible [`compact_map`](Self::compact_map).
    pub async fn try_compact_map<I, F, Fut, U, E>(&self, input: I, op: F) -> Result<Vec<U>, E>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<U>, E>> + Send + 'static,
        U: Send + 'static,
        E: Send + 'static,
    {
        let slots = self.try_map(input, op).await?;
        Ok(slots.into_iter().flatten().collect())
    }

    /// Transforms each element into a sequence concurrently and concatenates
    /// the sequences in input order.
    pub async fn flat_map<I, F, Fut, C>(&self, input: I, op: F) -> Vec<C::Item>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = C> + Send + 'static,
        C: IntoIterator + Send + 'static,
    {
        self.map(input, op).await.into_iter().flatten().collect()
    }

    /// Fallible [`flat_map`](Self::flat_map).
    pub async fn try_flat_map<I, F, Fut, C, E>(&self, input: I, op: F) -> Result<Vec<C::Item>, E>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C, E>> + Send + 'static,
        C: IntoIterator + Send + 'static,
        E: Send + 'static,
    {
        let parts = self.try_map(input, op).await?;
        Ok(parts.into_iter().flatten().collect())
    }

    /// Keeps the elements whose predicate resolves to `true`, in input order.
    ///
    /// Built on [`compact_map`](Self::compact_map). The predicate future must not
    /// borrow the element.
    pub async fn filter<I, P, Fut>(&self, input: I, predicate: P) -> Vec<I::Item>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        P: Fn(&I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.compact_map(input, move |element: I::Item| {
            let keep = predicate(&element);
            async move { keep.await.then_some(element) }
        })
        .await
    }

    /// Fallible [`filter`](Self::filter).
    pub async fn try_filter<I, P, Fut, E>(&self, input: I, predicate: P) -> Result<Vec<I::Item>, E>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        P: Fn(&I::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Send + 'static,
    {
        self.try_compact_map(input, move |element: I::Item| {
            let keep = predicate(&element);
            async move { Ok::<_, E>(keep.await?.then_some(element)) }
        })
        .await
    }
}
