use crate::error::{Result, ScanError};
use crate::frontier::{CrawlTask, Frontier};
use crate::result::{CrawlOutcome, CrawlStats};
use crate::tracker::WorkTracker;
use crate::worker::{self, CrawlContext, TaskOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Scheduler lifecycle. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum CrawlPhase {
    /// Dequeuing tasks and admitting workers.
    Running,
    /// Frontier closed, waiting for the remaining workers to return.
    Draining,
    /// All workers joined; the graph is final.
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Running => "running",
            CrawlPhase::Draining => "draining",
            CrawlPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Owns the frontier and the worker pool of one crawl and decides when the
/// crawl is over.
pub(crate) struct Scheduler {
    ctx: Arc<CrawlContext>,
    frontier: Frontier,
    tracker: Arc<WorkTracker>,
    slots: Arc<Semaphore>,
    workers: JoinSet<TaskOutcome>,
    stats: CrawlStats,
    phase: CrawlPhase,
}

impl Scheduler {
    pub(crate) fn new(
        ctx: Arc<CrawlContext>,
        frontier: Frontier,
        tracker: Arc<WorkTracker>,
        max_workers: usize,
    ) -> Self {
        Self {
            ctx,
            frontier,
            tracker,
            slots: Arc::new(Semaphore::new(max_workers)),
            workers: JoinSet::new(),
            stats: CrawlStats::default(),
            phase: CrawlPhase::Running,
        }
    }

    /// Seeds the frontier with `root` and runs until the work drains or the
    /// crawl is cancelled.
    pub(crate) async fn run(mut self, root: CrawlTask) -> Result<CrawlOutcome> {
        let started = Instant::now();
        let root_address = root.address.clone();

        match self.ctx.frontier.enqueue(root).await {
            Ok(()) | Err(ScanError::Cancelled) => {}
            Err(e) => return Err(e),
        }

        let cancelled = self.drive().await;
        if cancelled {
            info!("Crawl of {} cancelled, returning partial sitemap", root_address);
        }

        self.transition(CrawlPhase::Draining);
        self.frontier.close();
        while let Some(joined) = self.workers.join_next().await {
            self.record(joined);
        }
        self.transition(CrawlPhase::Done);

        self.stats.work = self.tracker.counts();
        self.stats.elapsed = started.elapsed();

        Ok(CrawlOutcome {
            sitemap: self.ctx.graph.snapshot(&root_address),
            stats: self.stats,
            cancelled,
        })
    }

    /// Returns `true` if the loop ended because of cancellation.
    async fn drive(&mut self) -> bool {
        loop {
            // Enqueue is counted before a parent's completion, so a drained
            // tracker means no task is pending or running and none can appear.
            if self.tracker.is_drained() {
                debug!("Frontier drained: {:?}", self.tracker.counts());
                return false;
            }

            let task = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => return true,
                _ = self.tracker.changed() => continue,
                Some(joined) = self.workers.join_next() => {
                    self.record(joined);
                    continue;
                }
                task = self.frontier.dequeue() => task,
            };

            let Some(task) = task else {
                return self.ctx.cancel.is_cancelled();
            };

            // Counted as finished on drop if the task never gets a slot.
            let completion = self.tracker.record_spawn();

            let permit = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => return true,
                permit = self.slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return true,
                },
            };

            self.workers
                .spawn(worker::execute(self.ctx.clone(), task, permit, completion));
        }
    }

    fn record(&mut self, joined: std::result::Result<TaskOutcome, JoinError>) {
        match joined {
            Ok(outcome) => self.stats.record(&outcome),
            Err(e) => {
                warn!("Crawl task failed: {}", e);
                self.stats.aborted_tasks += 1;
            }
        }
    }

    fn transition(&mut self, phase: CrawlPhase) {
        debug_assert!(phase > self.phase, "phase {} after {}", phase, self.phase);
        debug!("Scheduler {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}
