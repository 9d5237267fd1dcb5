use crate::graph::Sitemap;
use crate::tracker::WorkCounts;
use crate::worker::TaskOutcome;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlStats {
    /// Pages fetched and parsed successfully.
    pub pages_crawled: usize,
    pub fetch_errors: usize,
    /// Pages whose link processing stopped at an unresolvable reference.
    pub truncated_pages: usize,
    /// Graph edges added.
    pub links_found: usize,
    pub skipped_depth: usize,
    pub skipped_visited: usize,
    /// Tasks that were interrupted by cancellation or panicked.
    pub aborted_tasks: usize,
    pub work: WorkCounts,
    pub elapsed: Duration,
}

impl CrawlStats {
    pub(crate) fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Crawled { links, truncated } => {
                self.pages_crawled += 1;
                self.links_found += links;
                if *truncated {
                    self.truncated_pages += 1;
                }
            }
            TaskOutcome::DepthExhausted => self.skipped_depth += 1,
            TaskOutcome::AlreadyVisited => self.skipped_visited += 1,
            TaskOutcome::FetchFailed => self.fetch_errors += 1,
            TaskOutcome::Cancelled => self.aborted_tasks += 1,
        }
    }
}

/// Result of one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub sitemap: Sitemap,
    pub stats: CrawlStats,
    /// The crawl was stopped by its cancellation token; `sitemap` is partial.
    pub cancelled: bool,
}
