use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Counters that decide when a crawl has run out of work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkCounts {
    /// Tasks handed to the frontier (counted before the send completes).
    pub enqueued: u64,
    /// Tasks taken off the frontier for execution.
    pub spawned: u64,
    /// Tasks that signalled completion.
    pub finished: u64,
}

impl WorkCounts {
    /// Nothing queued, nothing mid-execution.
    pub fn is_drained(&self) -> bool {
        self.finished == self.spawned && self.spawned == self.enqueued
    }
}

/// Shared accounting between the frontier, the workers and the scheduler.
///
/// All three counters live under one lock so the drain check reads a
/// consistent view. A worker enqueues its children before its
/// [`CompletionGuard`] drops, so `enqueued` is always ahead of `finished`
/// while any child is still in flight.
#[derive(Debug, Default)]
pub(crate) struct WorkTracker {
    counts: Mutex<WorkCounts>,
    changed: Notify,
}

impl WorkTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WorkCounts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn counts(&self) -> WorkCounts {
        *self.lock()
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.lock().is_drained()
    }

    pub(crate) fn record_enqueue(&self) {
        self.lock().enqueued += 1;
    }

    /// Undoes [`record_enqueue`](Self::record_enqueue) for a task that never
    /// reached the channel.
    pub(crate) fn cancel_enqueue(&self) {
        {
            let mut counts = self.lock();
            counts.enqueued = counts.enqueued.saturating_sub(1);
        }
        self.changed.notify_one();
    }

    /// Marks a dequeued task as running. The returned guard reports
    /// completion when dropped, including during a panic unwind.
    pub(crate) fn record_spawn(self: &Arc<Self>) -> CompletionGuard {
        self.lock().spawned += 1;
        CompletionGuard {
            tracker: self.clone(),
        }
    }

    /// Resolves after the counters changed in a way that may end the crawl.
    pub(crate) async fn changed(&self) {
        self.changed.notified().await
    }

    fn record_finish(&self) {
        self.lock().finished += 1;
        self.changed.notify_one();
    }
}

#[derive(Debug)]
pub(crate) struct CompletionGuard {
    tracker: Arc<WorkTracker>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.tracker.record_finish();
    }
}
