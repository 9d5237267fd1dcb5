pub mod address;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod graph;
pub mod registry;
pub mod result;
mod scheduler;
mod tracker;
pub mod worker;

pub use address::Address;
pub use config::{CrawlConfig, OriginPolicy};
pub use crawler::{Crawler, run_crawl};
pub use error::ScanError;
pub use extract::{HtmlLinkExtractor, LinkExtractor};
pub use fetch::{Fetcher, HttpFetcher};
pub use frontier::CrawlTask;
pub use graph::{PageGraph, PageNode, Sitemap};
pub use registry::VisitedRegistry;
pub use result::{CrawlOutcome, CrawlStats};
pub use tracker::WorkCounts;
pub use worker::{ProgressCallback, TaskOutcome};

// Re-exported so callers can cancel a crawl without a direct dependency.
pub use tokio_util::sync::CancellationToken;
