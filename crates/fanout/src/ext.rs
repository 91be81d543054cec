// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Method syntax on any `IntoIterator`.
//!
//! [`SequentialExt`] forwards to [`sequential`]; [`ConcurrentExt`] forwards to a
//! default [`FanOut`] on the ambient tokio runtime. Use [`FanOut`] directly for
//! another substrate or a priority hint.

use std::future::Future;

use crate::{sequential, FanOut};

/// `async_*` methods: strictly sequential, in input order.
pub trait SequentialExt: IntoIterator + Sized {
    /// See [`sequential::for_each`].
    fn async_for_each<F, Fut>(self, op: F) -> impl Future<Output = ()>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = ()>,
    {
        sequential::for_each(self, op)
    }

    /// See [`sequential::try_for_each`].
    fn async_try_for_each<F, Fut, E>(self, op: F) -> impl Future<Output = Result<(), E>>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        sequential::try_for_each(self, op)
    }

    /// See [`sequential::map`].
    fn async_map<F, Fut, U>(self, op: F) -> impl Future<Output = Vec<U>>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = U>,
    {
        sequential::map(self, op)
    }

    /// See [`sequential::try_map`].
    fn async_try_map<F, Fut, U, E>(self, op: F) -> impl Future<Output = Result<Vec<U>, E>>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = Result<U, E>>,
    {
        sequential::try_map(self, op)
    }

    /// See [`sequential::compact_map`].
    fn async_compact_map<F, Fut, U>(self, op: F) -> impl Future<Output = Vec<U>>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = Option<U>>,
    {
        sequential::compact_map(self, op)
    }

    /// See [`sequential::try_compact_map`].
    fn async_try_compact_map<F, Fut, U, E>(self, op: F) -> impl Future<Output = Result<Vec<U>, E>>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = Result<Option<U>, E>>,
    {
        sequential::try_compact_map(self, op)
    }

    /// See [`sequential::flat_map`].
    fn async_flat_map<F, Fut, C>(self, op: F) -> impl Future<Output = Vec<C::Item>>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = C>,
        C: IntoIterator,
    {
        sequential::flat_map(self, op)
    }

    /// See [`sequential::try_flat_map`].
    fn async_try_flat_map<F, Fut, C, E>(self, op: F) -> impl Future<Output = Result<Vec<C::Item>, E>>
    where
        F: FnMut(Self::Item) -> Fut,
        Fut: Future<Output = Result<C, E>>,
        C: IntoIterator,
    {
        sequential::try_flat_map(self, op)
    }

    /// See [`sequential::filter`].
    fn async_filter<P, Fut>(self, predicate: P) -> impl Future<Output = Vec<Self::Item>>
    where
        P: FnMut(&Self::Item) -> Fut,
        Fut: Future<Output = bool>,
    {
        sequential::filter(self, predicate)
    }

    /// See [`sequential::try_filter`].
    fn async_try_filter<P, Fut, E>(self, predicate: P) -> impl Future<Output = Result<Vec<Self::Item>, E>>
    where
        P: FnMut(&Self::Item) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        sequential::try_filter(self, predicate)
    }

    /// See [`sequential::fold`].
    fn async_fold<A, F, Fut>(self, init: A, op: F) -> impl Future<Output = A>
    where
        F: FnMut(A, Self::Item) -> Fut,
        Fut: Future<Output = A>,
    {
        sequential::fold(self, init, op)
    }

    /// See [`sequential::try_fold`].
    fn async_try_fold<A, F, Fut, E>(self, init: A, op: F) -> impl Future<Output = Result<A, E>>
    where
        F: FnMut(A, Self::Item) -> Fut,
        Fut: Future<Output = Result<A, E>>,
    {
        sequential::try_fold(self, init, op)
    }
}

impl<I: IntoIterator> SequentialExt for I {}

/// `concurrent_*` methods: one tokio task per element, output in input order.
///
/// There is no `concurrent_fold`.
pub trait ConcurrentExt: IntoIterator + Sized
where
    Self::Item: Send + 'static,
{
    /// See [`FanOut::for_each`].
    fn concurrent_for_each<F, Fut>(self, op: F) -> impl Future<Output = ()>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        async move { FanOut::new().for_each(self, op).await }
    }

    /// See [`FanOut::try_for_each`].
    fn concurrent_try_for_each<F, Fut, E>(self, op: F) -> impl Future<Output = Result<(), E>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        async move { FanOut::new().try_for_each(self, op).await }
    }

    /// See [`FanOut::map`].
    fn concurrent_map<F, Fut, U>(self, op: F) -> impl Future<Output = Vec<U>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
        U: Send + 'static,
    {
        async move { FanOut::new().map(self, op).await }
    }

    /// See [`FanOut::try_map`].
    fn concurrent_try_map<F, Fut, U, E>(self, op: F) -> impl Future<Output = Result<Vec<U>, E>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        U: Send + 'static,
        E: Send + 'static,
    {
        async move { FanOut::new().try_map(self, op).await }
    }

    /// See [`FanOut::compact_map`].
    fn concurrent_compact_map<F, Fut, U>(self, op: F) -> impl Future<Output = Vec<U>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<U>> + Send + 'static,
        U: Send + 'static,
    {
        async move { FanOut::new().compact_map(self, op).await }
    }

    /// See [`FanOut::try_compact_map`].
    fn concurrent_try_compact_map<F, Fut, U, E>(
        self,
        op: F,
    ) -> impl Future<Output = Result<Vec<U>, E>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<U>, E>> + Send + 'static,
        U: Send + 'static,
        E: Send + 'static,
    {
        async move { FanOut::new().try_compact_map(self, op).await }
    }

    /// See [`FanOut::flat_map`].
    fn concurrent_flat_map<F, Fut, C>(self, op: F) -> impl Future<Output = Vec<C::Item>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = C> + Send + 'static,
        C: IntoIterator + Send + 'static,
    {
        async move { FanOut::new().flat_map(self, op).await }
    }

    /// See [`FanOut::try_flat_map`].
    fn concurrent_try_flat_map<F, Fut, C, E>(
        self,
        op: F,
    ) -> impl Future<Output = Result<Vec<C::Item>, E>>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C, E>> + Send + 'static,
        C: IntoIterator + Send + 'static,
        E: Send + 'static,
    {
        async move { FanOut::new().try_flat_map(self, op).await }
    }

    /// See [`FanOut::filter`].
    fn concurrent_filter<P, Fut>(self, predicate: P) -> impl Future<Output = Vec<Self::Item>>
    where
        P: Fn(&Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        async move { FanOut::new().filter(self, predicate).await }
    }

    /// See [`FanOut::try_filter`].
    fn concurrent_try_filter<P, Fut, E>(
        self,
        predicate: P,
    ) -> impl Future<Output = Result<Vec<Self::Item>, E>>
    where
        P: Fn(&Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Send + 'static,
    {
        async move { FanOut::new().try_filter(self, predicate).await }
    }
}

impl<I> ConcurrentExt for I
where
    I: IntoIterator,
    I::Item: Send + 'static,
{
}
