// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cooperative cancellation of sibling units, drop-triggered cancellation,
//! nested fan-outs, and panic propagation through the join barrier.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::Failed;
use fanout::{cancel, ConcurrentExt, FanOut};
use futures_util::FutureExt;

const FALLBACK: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Counters {
    observed: AtomicUsize,
    finished: AtomicUsize,
}

impl Counters {
    fn observed(&self) -> usize {
        self.observed.load(Ordering::SeqCst)
    }

    fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Unit body: fails immediately for `fail_on`, otherwise waits for
/// cancellation (or the fallback) and records which one came first.
async fn wait_or_fail(x: usize, fail_on: usize, counters: Arc<Counters>) -> Result<usize, Failed> {
    let outcome = if x == fail_on {
        Err(Failed(u64::try_from(x).unwrap()))
    } else {
        tokio::select! {
            () = cancel::cancelled() => {
                counters.observed.fetch_add(1, Ordering::SeqCst);
            }
            () = tokio::time::sleep(FALLBACK) => {}
        }
        Ok(x)
    };
    counters.finished.fetch_add(1, Ordering::SeqCst);
    outcome
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn siblings_observe_cancellation_after_a_failure() {
    let n = 6;
    let counters = Arc::new(Counters::default());
    let shared = Arc::clone(&counters);
    let started = std::time::Instant::now();
    let result = (0..n)
        .concurrent_try_map(move |x| wait_or_fail(x, 2, Arc::clone(&shared)))
        .await;

    assert_eq!(result, Err(Failed(2)));
    assert_eq!(counters.observed(), n - 1);
    // Every unit was terminal before the call returned.
    assert_eq!(counters.finished(), n);
    assert!(started.elapsed() < FALLBACK);
}

#[tokio::test]
async fn units_that_ignore_cancellation_still_finish_first() {
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);
    let result = FanOut::new()
        .try_for_each(0..4u64, move |x| {
            let counter = Arc::clone(&counter);
            async move {
                if x == 0 {
                    return Err(Failed(0));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;
    assert_eq!(result, Err(Failed(0)));
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn successful_calls_never_raise_signals() {
    let out = (0..5u64)
        .concurrent_map(|x| async move {
            tokio::task::yield_now().await;
            (x, cancel::is_cancelled(), cancel::current().is_some())
        })
        .await;
    assert!(out.iter().all(|&(_, cancelled, inside)| !cancelled && inside));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_call_cancels_in_flight_units() {
    let counters = Arc::new(Counters::default());
    let shared = Arc::clone(&counters);
    let runner = FanOut::new();
    let call = runner.for_each(0..3usize, move |_| {
        let shared = Arc::clone(&shared);
        async move {
            tokio::select! {
                () = cancel::cancelled() => {
                    shared.observed.fetch_add(1, Ordering::SeqCst);
                }
                () = tokio::time::sleep(FALLBACK) => {}
            }
            shared.finished.fetch_add(1, Ordering::SeqCst);
        }
    });
    let timed_out = tokio::time::timeout(Duration::from_millis(20), call).await;
    assert!(timed_out.is_err());

    // The units outlive the dropped call but stop promptly.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while counters.finished() < 3 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(counters.observed(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn nested_fan_out_inherits_cancellation() {
    let counters = Arc::new(Counters::default());
    let shared = Arc::clone(&counters);
    let result = (0..3usize)
        .concurrent_try_map(move |outer| {
            let shared = Arc::clone(&shared);
            async move {
                if outer == 0 {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    return Err(Failed(0));
                }
                // Inner units never fail on their own; they only stop when
                // the outer failure reaches them.
                let inner = Arc::clone(&shared);
                let runner = FanOut::new();
                runner
                    .try_map(0..2usize, move |x| wait_or_fail(x, usize::MAX, Arc::clone(&inner)))
                    .await
            }
        })
        .await;

    assert_eq!(result, Err(Failed(0)));
    assert_eq!(counters.observed(), 4);
    assert_eq!(counters.finished(), 4);
}

#[tokio::test]
#[should_panic(expected = "unit exploded")]
async fn unit_panic_resumes_on_the_caller() {
    let _ = (0..3u64)
        .concurrent_map(|x| async move {
            if x == 1 {
                panic!("unit exploded");
            }
            x
        })
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panic_is_resumed_only_after_siblings_are_terminal() {
    let counters = Arc::new(Counters::default());
    let shared = Arc::clone(&counters);
    let runner = FanOut::new();
    let call = runner.try_map(0..4usize, move |x| {
        let shared = Arc::clone(&shared);
        async move {
            if x == 0 {
                panic!("unit exploded");
            }
            wait_or_fail(x, usize::MAX, shared).await
        }
    });
    let caught = AssertUnwindSafe(call).catch_unwind().await;

    assert!(caught.is_err());
    assert_eq!(counters.observed(), 3);
    assert_eq!(counters.finished(), 3);
}
