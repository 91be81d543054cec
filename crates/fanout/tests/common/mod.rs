// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

/// Error type for operations that fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failed(pub u64);

/// Shared, serialized append-only log.
#[derive(Clone, Debug, Default)]
pub struct Log(Arc<Mutex<Vec<u64>>>);

impl Log {
    pub fn push(&self, value: u64) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(value);
    }

    pub fn snapshot(&self) -> Vec<u64> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn sorted(&self) -> Vec<u64> {
        let mut values = self.snapshot();
        values.sort_unstable();
        values
    }
}

/// One element of an input whose units are forced to complete in reverse.
///
/// Unit `i` waits until unit `i + 1` has finished, so the last element
/// completes first and element 0 completes last, on any substrate.
#[derive(Debug)]
pub struct Link {
    pub value: u64,
    wait_for: Option<oneshot::Receiver<()>>,
    release: Option<oneshot::Sender<()>>,
}

impl Link {
    /// Waits for the successor, records completion, releases the predecessor.
    pub async fn finish(self, completions: &Log) -> u64 {
        if let Some(successor) = self.wait_for {
            // A dropped sender means the successor is gone; stop waiting.
            let _ = successor.await;
        }
        completions.push(self.value);
        if let Some(predecessor) = self.release {
            let _ = predecessor.send(());
        }
        self.value
    }
}

/// Builds links for `values` so that completion order is the reverse of
/// input order.
pub fn reversed_completion(values: &[u64]) -> Vec<Link> {
    let n = values.len();
    let mut receivers: Vec<Option<oneshot::Receiver<()>>> = Vec::with_capacity(n);
    let mut senders: Vec<Option<oneshot::Sender<()>>> = Vec::with_capacity(n);
    senders.push(None);
    for _ in 1..n {
        let (tx, rx) = oneshot::channel();
        // Channel k connects unit k (sender) to unit k - 1 (receiver).
        receivers.push(Some(rx));
        senders.push(Some(tx));
    }
    receivers.push(None);
    values
        .iter()
        .zip(receivers.into_iter().zip(senders))
        .map(|(&value, (wait_for, release))| Link {
            value,
            wait_for,
            release,
        })
        .collect()
}
