use crate::address::Address;
use crate::config::OriginPolicy;
use crate::error::ScanError;
use crate::extract::LinkExtractor;
use crate::fetch::Fetcher;
use crate::frontier::{CrawlTask, FrontierHandle};
use crate::graph::PageGraph;
use crate::registry::VisitedRegistry;
use crate::tracker::CompletionGuard;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Called with the number of pages claimed so far and the page being crawled.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// State shared by every task of one crawl.
pub(crate) struct CrawlContext {
    pub origin: Address,
    pub origin_policy: OriginPolicy,
    pub registry: VisitedRegistry,
    pub graph: PageGraph,
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub frontier: FrontierHandle,
    pub cancel: CancellationToken,
    pub progress_callback: Option<ProgressCallback>,
}

/// What happened to a single dequeued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Page fetched. `truncated` is set when a malformed link stopped link
    /// processing part way through the page.
    Crawled { links: usize, truncated: bool },
    DepthExhausted,
    AlreadyVisited,
    FetchFailed,
    Cancelled,
}

/// Same-origin links kept from one page, plus the resolution error that cut
/// processing short, if any.
#[derive(Debug)]
pub(crate) struct LinkSelection {
    pub kept: Vec<Address>,
    pub error: Option<ScanError>,
}

/// Resolves raw hrefs against `page` and keeps the ones that belong to the
/// crawl origin. The first reference that cannot be resolved ends processing;
/// links kept before it are still returned.
pub(crate) fn select_links(
    page: &Address,
    origin: &Address,
    policy: OriginPolicy,
    raw_links: &[String],
) -> LinkSelection {
    let mut kept = Vec::new();

    for raw in raw_links {
        let resolved = match page.resolve(raw) {
            Ok(url) => url,
            Err(e) => return LinkSelection { kept, error: Some(e) },
        };

        let Some(candidate) = Address::from_url(resolved) else {
            debug!("Skipping non-http link {} on {}", raw, page);
            continue;
        };
        if !candidate.same_origin(origin, policy) {
            debug!("Skipping cross-origin link {} on {}", candidate, page);
            continue;
        }
        if &candidate == page {
            continue;
        }
        kept.push(candidate);
    }

    LinkSelection { kept, error: None }
}

/// Runs one task to completion. `completion` is released only after every
/// child has been handed to the frontier.
pub(crate) async fn execute(
    ctx: Arc<CrawlContext>,
    task: CrawlTask,
    permit: OwnedSemaphorePermit,
    completion: CompletionGuard,
) -> TaskOutcome {
    let outcome = crawl_page(&ctx, &task, permit).await;
    drop(completion);
    outcome
}

async fn crawl_page(
    ctx: &CrawlContext,
    task: &CrawlTask,
    permit: OwnedSemaphorePermit,
) -> TaskOutcome {
    if task.depth_remaining < 0 {
        debug!("Maximum depth reached, skipping {}", task.address);
        return TaskOutcome::DepthExhausted;
    }

    if !ctx.registry.try_claim(&task.address) {
        debug!("Already crawled, skipping {}", task.address);
        return TaskOutcome::AlreadyVisited;
    }

    ctx.graph.register(&task.address);

    if let Some(ref callback) = ctx.progress_callback {
        callback(ctx.registry.len(), task.address.to_string());
    }

    // Held across fetch+extract only. A worker blocked on a full frontier
    // must not hold a slot.
    let raw_links = {
        let _permit = permit;
        debug!(
            "Crawling {} (depth budget {})",
            task.address, task.depth_remaining
        );

        let fetched = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return TaskOutcome::Cancelled,
            fetched = ctx.fetcher.fetch(&task.address) => fetched,
        };

        match fetched {
            Ok(body) => ctx.extractor.extract_links(&body),
            Err(e) => {
                warn!("Failed to fetch {}: {}", task.address, e);
                return TaskOutcome::FetchFailed;
            }
        }
    };

    let selection = select_links(&task.address, &ctx.origin, ctx.origin_policy, &raw_links);
    if let Some(ref e) = selection.error {
        warn!("Stopped processing links on {}: {}", task.address, e);
    }

    let mut links = 0;
    for child in selection.kept {
        if !ctx.graph.append_child(&task.address, child.clone()) {
            continue;
        }
        links += 1;
        debug!("Found link: {} -> {}", task.address, child);

        if let Err(e) = ctx.frontier.enqueue(task.child(child)).await {
            debug!("Could not enqueue child of {}: {}", task.address, e);
            return TaskOutcome::Cancelled;
        }
    }

    TaskOutcome::Crawled {
        links,
        truncated: selection.error.is_some(),
    }
}
