// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cooperative cancellation for work units.
//!
//! Every unit spawned by a [`FanOut`](crate::FanOut) call runs inside the scope of
//! its own [`CancelSignal`]. The join barrier raises the signals of the remaining
//! units once it has selected a failure; an operation notices through
//! [`is_cancelled`] or by awaiting [`cancelled`]. Nothing is preempted: a unit
//! that never checks simply runs to completion, and the barrier waits for it.
//!
//! Signals form a tree. A fan-out started from inside a unit derives its signals
//! from that unit's signal, so cancelling an outer unit reaches every nested
//! unit.
//!
//! # Timing
//!
//! The barrier raises signals synchronously, at the moment it observes the
//! first failure and before it awaits any further unit. A raised signal wakes
//! every pending [`cancelled`] future immediately; [`is_cancelled`] observes it on
//! its next call.

use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::Notify;

tokio::task_local! {
    static CURRENT: CancelSignal;
}

/// A cloneable, cooperative cancellation flag.
///
/// Clones share state. Raising is idempotent and cascades to every child
/// created with [`child`](CancelSignal::child).
#[derive(Clone, Debug, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    raised: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn raise(&self) {
        if self.raised.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();
        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.raise();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CancelSignal {
    /// Creates a signal that is not raised and has no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that is raised whenever `self` is raised.
    ///
    /// Raising the child does not affect the parent.
    pub fn child(&self) -> Self {
        let child = Self::new();
        let mut children = lock(&self.inner.children);
        if self.is_cancelled() {
            drop(children);
            child.cancel();
        } else {
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Derives the signal for one unit of a new fan-out call: a child of the
    /// current unit's signal when called from inside a unit, a fresh root
    /// otherwise.
    ///
    /// The parent only holds a weak link, so the returned signal must be kept
    /// by whoever owns the unit.
    pub(crate) fn inherit() -> Self {
        CURRENT
            .try_with(CancelSignal::child)
            .unwrap_or_default()
    }

    /// Raises the signal (and every descendant).
    pub fn cancel(&self) {
        self.inner.raise();
    }

    /// Returns `true` once the signal (or an ancestor) has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    /// Completes once the signal has been raised.
    pub async fn cancelled(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Runs `fut` with `self` installed as the ambient signal seen by
    /// [`is_cancelled`], [`cancelled`] and [`current`].
    pub fn scope<F: Future>(self, fut: F) -> impl Future<Output = F::Output> {
        CURRENT.scope(self, fut)
    }
}

/// The signal of the work unit running on this task, if any.
pub fn current() -> Option<CancelSignal> {
    CURRENT.try_with(Clone::clone).ok()
}

/// Returns `true` when called from a work unit whose cancellation was requested.
///
/// Always `false` outside a work unit (for example in sequential operations run
/// directly by the caller).
pub fn is_cancelled() -> bool {
    CURRENT.try_with(CancelSignal::is_cancelled).unwrap_or(false)
}

/// Completes when the current work unit's cancellation is requested.
///
/// Outside a work unit this never completes, which makes it safe to use as a
/// `tokio::select!` branch in code that runs in both execution modes.
pub async fn cancelled() {
    match current() {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn raising_is_idempotent_and_shared_by_clones() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());
        signal.cancel();
        signal.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn children_follow_parent_but_not_the_reverse() {
        let parent = CancelSignal::new();
        let a = parent.child();
        let b = parent.child();
        a.cancel();
        assert!(!parent.is_cancelled());
        assert!(!b.is_cancelled());
        parent.cancel();
        assert!(b.is_cancelled());
        let grandchild_of_raised = b.child();
        assert!(grandchild_of_raised.is_cancelled());
    }

    #[test]
    fn ambient_accessors_outside_a_unit() {
        assert!(!is_cancelled());
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn scope_installs_the_ambient_signal() {
        let signal = CancelSignal::new();
        let seen = signal
            .clone()
            .scope(async {
                let before = is_cancelled();
                if let Some(signal) = current() {
                    signal.cancel();
                }
                (before, is_cancelled())
            })
            .await;
        assert_eq!(seen, (false, true));
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_a_waiting_task() {
        let signal = CancelSignal::new();
        let waiter = tokio::spawn(signal.clone().scope(async {
            cancelled().await;
            is_cancelled()
        }));
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.cancel();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn inherit_links_nested_calls_to_the_enclosing_unit() {
        let outer = CancelSignal::new();
        let inner = outer.clone().scope(async { CancelSignal::inherit() }).await;
        assert!(!inner.is_cancelled());
        outer.cancel();
        assert!(inner.is_cancelled());
        assert!(!CancelSignal::inherit().is_cancelled());
    }

    #[tokio::test]
    async fn inherited_signals_need_no_other_owner() {
        let outer = CancelSignal::new();
        // Only the leaves survive the scope, as with the units of a nested call.
        let leaves: Vec<CancelSignal> = outer
            .clone()
            .scope(async { (0..3).map(|_| CancelSignal::inherit()).collect() })
            .await;
        outer.cancel();
        assert!(leaves.iter().all(CancelSignal::is_cancelled));
    }
}
