// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sequential async operations.
//!
//! Each operation awaits the caller's future for one element before it asks
//! the input for the next, so effects happen strictly in input order and
//! nothing is spawned. `try_*` variants stop at the first error: the input is
//! not advanced past the failing element and partial output is dropped.

use std::convert::Infallible;
use std::future::Future;

use futures_util::FutureExt;

use crate::into_ok;

/// Awaits `op` for each element in order.
pub async fn for_each<I, F, Fut>(input: I, mut op: F)
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = ()>,
{
    for element in input {
        op(element).await;
    }
}

/// Fallible [`for_each`]; elements after the first failure are never visited.
pub async fn try_for_each<I, F, Fut, E>(input: I, mut op: F) -> Result<(), E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    for element in input {
        op(element).await?;
    }
    Ok(())
}

/// Transforms each element in order.
pub async fn map<I, F, Fut, U>(input: I, mut op: F) -> Vec<U>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = U>,
{
    into_ok(try_map(input, |element| op(element).map(Ok::<U, Infallible>)).await)
}

/// Fallible [`map`].
pub async fn try_map<I, F, Fut, U, E>(input: I, mut op: F) -> Result<Vec<U>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    let input = input.into_iter();
    let mut out = Vec::with_capacity(input.size_hint().0);
    for element in input {
        out.push(op(element).await?);
    }
    Ok(out)
}

/// Transforms each element in order, dropping `None`s.
pub async fn compact_map<I, F, Fut, U>(input: I, mut op: F) -> Vec<U>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Option<U>>,
{
    into_ok(try_compact_map(input, |element| op(element).map(Ok::<Option<U>, Infallible>)).await)
}

/// Fallible [`compact_map`].
pub async fn try_compact_map<I, F, Fut, U, E>(input: I, mut op: F) -> Result<Vec<U>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<Option<U>, E>>,
{
    let mut out = Vec::new();
    for element in input {
        if let Some(value) = op(element).await? {
            out.push(value);
        }
    }
    Ok(out)
}

/// Transforms each element into a sequence and concatenates them in order.
pub async fn flat_map<I, F, Fut, C>(input: I, mut op: F) -> Vec<C::Item>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = C>,
    C: IntoIterator,
{
    into_ok(try_flat_map(input, |element| op(element).map(Ok::<C, Infallible>)).await)
}

/// Fallible [`flat_map`].
pub async fn try_flat_map<I, F, Fut, C, E>(input: I, mut op: F) -> Result<Vec<C::Item>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<C, E>>,
    C: IntoIterator,
{
    let mut out = Vec::new();
    for element in input {
        out.extend(op(element).await?);
    }
    Ok(out)
}

/// Keeps the elements whose predicate resolves to `true`, in order.
///
/// Built on [`compact_map`]. The predicate future must not borrow the element.
pub async fn filter<I, P, Fut>(input: I, mut predicate: P) -> Vec<I::Item>
where
    I: IntoIterator,
    P: FnMut(&I::Item) -> Fut,
    Fut: Future<Output = bool>,
{
    compact_map(input, |element| {
        let keep = predicate(&element);
        async move { keep.await.then_some(element) }
    })
    .await
}

/// Fallible [`filter`].
pub async fn try_filter<I, P, Fut, E>(input: I, mut predicate: P) -> Result<Vec<I::Item>, E>
where
    I: IntoIterator,
    P: FnMut(&I::Item) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    try_compact_map(input, |element| {
        let keep = predicate(&element);
        async move { Ok::<_, E>(keep.await?.then_some(element)) }
    })
    .await
}

/// Threads an accumulator through `op`, left to right.
///
/// There is no concurrent counterpart.
pub async fn fold<I, A, F, Fut>(input: I, init: A, mut op: F) -> A
where
    I: IntoIterator,
    F: FnMut(A, I::Item) -> Fut,
    Fut: Future<Output = A>,
{
    into_ok(try_fold(input, init, |acc, element| op(acc, element).map(Ok::<A, Infallible>)).await)
}

/// Fallible [`fold`]. The partial accumulator is dropped on error.
pub async fn try_fold<I, A, F, Fut, E>(input: I, init: A, mut op: F) -> Result<A, E>
where
    I: IntoIterator,
    F: FnMut(A, I::Item) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    let mut acc = init;
    for element in input {
        acc = op(acc, element).await?;
    }
    Ok(acc)
}
