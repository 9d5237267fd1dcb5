use indicatif::{ProgressBar, ProgressStyle};
use sitemapper_scanner::config::{
    DEFAULT_MAX_DEPTH, DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
};
use sitemapper_scanner::{
    CancellationToken, CrawlConfig, CrawlOutcome, Crawler, OriginPolicy, ProgressCallback,
    ScanError,
};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: Url,
    pub max_depth: i64,
    pub workers: usize,
    pub queue_capacity: usize,
    pub timeout_secs: u64,
    pub origin_policy: OriginPolicy,
    pub show_progress_bars: bool,
}

impl CrawlOptions {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            max_depth: DEFAULT_MAX_DEPTH,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            origin_policy: OriginPolicy::Host,
            show_progress_bars: false,
        }
    }

    pub fn to_config(&self) -> CrawlConfig {
        CrawlConfig::new()
            .with_max_depth(self.max_depth)
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_origin_policy(self.origin_policy)
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Execute a crawl with the given options.
///
/// A cancelled crawl is not an error: the outcome carries the partial
/// sitemap and `cancelled` is set.
pub async fn execute_crawl(
    options: CrawlOptions,
    cancel: CancellationToken,
) -> Result<CrawlOutcome, ScanError> {
    let mut crawler = Crawler::new(options.to_config())?;

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let callback: ProgressCallback = Arc::new(move |count: usize, url: String| {
            pb_clone.set_message(format!(
                "Crawling... {} pages, {}",
                count,
                extract_url_path(&url)
            ));
        });
        crawler = crawler.with_progress_callback(callback);
    }

    let result = crawler
        .crawl_with_cancellation(options.url.as_str(), cancel)
        .await;

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    result
}
