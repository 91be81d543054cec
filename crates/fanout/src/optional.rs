// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lifting an async transform over an optional value.

use std::future::Future;

/// Awaits `op` on the value if there is one. `None` never calls `op`.
pub async fn map<T, U, F, Fut>(value: Option<T>, op: F) -> Option<U>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = U>,
{
    match value {
        Some(value) => Some(op(value).await),
        None => None,
    }
}

/// Fallible [`map`]; the transform's error comes back unchanged.
pub async fn try_map<T, U, E, F, Fut>(value: Option<T>, op: F) -> Result<Option<U>, E>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    match value {
        Some(value) => op(value).await.map(Some),
        None => Ok(None),
    }
}

/// Method syntax for [`map`] and [`try_map`].
pub trait OptionExt<T> {
    /// See [`map`].
    fn map_async<U, F, Fut>(self, op: F) -> impl Future<Output = Option<U>>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = U>;

    /// See [`try_map`].
    fn try_map_async<U, E, F, Fut>(self, op: F) -> impl Future<Output = Result<Option<U>, E>>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<U, E>>;
}

impl<T> OptionExt<T> for Option<T> {
    fn map_async<U, F, Fut>(self, op: F) -> impl Future<Output = Option<U>>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = U>,
    {
        map(self, op)
    }

    fn try_map_async<U, E, F, Fut>(self, op: F) -> impl Future<Output = Result<Option<U>, E>>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<U, E>>,
    {
        try_map(self, op)
    }
}
