use crate::address::Address;
use crate::error::{Result, ScanError};
use crate::tracker::WorkTracker;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A page waiting to be crawled together with its remaining depth budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub address: Address,
    pub depth_remaining: i64,
}

impl CrawlTask {
    pub fn new(address: Address, depth_remaining: i64) -> Self {
        Self {
            address,
            depth_remaining,
        }
    }

    pub fn child(&self, address: Address) -> Self {
        Self::new(address, self.depth_remaining - 1)
    }
}

/// Bounded FIFO of pending crawl tasks. The receiving half is owned by the
/// scheduler; workers push through cloned [`FrontierHandle`]s.
pub struct Frontier {
    receiver: mpsc::Receiver<CrawlTask>,
    handle: FrontierHandle,
}

#[derive(Clone)]
pub struct FrontierHandle {
    sender: mpsc::Sender<CrawlTask>,
    tracker: Arc<WorkTracker>,
    cancel: CancellationToken,
}

impl Frontier {
    /// `capacity` must be non-zero.
    pub(crate) fn new(
        capacity: usize,
        tracker: Arc<WorkTracker>,
        cancel: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            receiver,
            handle: FrontierHandle {
                sender,
                tracker,
                cancel,
            },
        }
    }

    pub fn handle(&self) -> FrontierHandle {
        self.handle.clone()
    }

    /// Waits for the next task. `None` means no more work will ever arrive:
    /// the frontier was closed and emptied, or the crawl was cancelled.
    pub async fn dequeue(&mut self) -> Option<CrawlTask> {
        tokio::select! {
            biased;
            _ = self.handle.cancel.cancelled() => None,
            task = self.receiver.recv() => task,
        }
    }

    /// Number of tasks buffered in the channel.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Stops accepting tasks. Blocked and future enqueues fail with
    /// [`ScanError::FrontierClosed`].
    pub fn close(&mut self) {
        debug!("Closing frontier with {} pending task(s)", self.receiver.len());
        self.receiver.close();
    }
}

impl FrontierHandle {
    /// Pushes a task, waiting while the frontier is full.
    ///
    /// A full frontier is backpressure: the caller is suspended until the
    /// scheduler drains a slot. Only closing or cancellation end the wait
    /// with an error.
    pub async fn enqueue(&self, task: CrawlTask) -> Result<()> {
        self.tracker.record_enqueue();

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScanError::Cancelled),
            sent = self.sender.send(task) => sent.map_err(|_| ScanError::FrontierClosed),
        };

        if sent.is_err() {
            self.tracker.cancel_enqueue();
        }
        sent
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
