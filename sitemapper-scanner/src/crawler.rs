use crate::address::Address;
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::extract::{HtmlLinkExtractor, LinkExtractor};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::frontier::{CrawlTask, Frontier};
use crate::graph::{PageGraph, Sitemap};
use crate::registry::VisitedRegistry;
use crate::result::CrawlOutcome;
use crate::scheduler::Scheduler;
use crate::tracker::WorkTracker;
use crate::worker::{CrawlContext, ProgressCallback};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Crawler {
    config: CrawlConfig,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    /// Builds a crawler with the HTTP fetcher and HTML link extractor.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config.timeout)?;

        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(HtmlLinkExtractor::new()),
            progress_callback: None,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub async fn crawl(&self, root: &str) -> Result<CrawlOutcome> {
        self.crawl_with_cancellation(root, CancellationToken::new())
            .await
    }

    /// Crawls from `root` until the frontier drains or `cancel` fires.
    ///
    /// Fails only if `root` is not an absolute http(s) URL or the configuration
    /// is invalid. Per-page failures are logged and leave the page childless.
    pub async fn crawl_with_cancellation(
        &self,
        root: &str,
        cancel: CancellationToken,
    ) -> Result<CrawlOutcome> {
        let root = Address::parse(root)?;
        self.config.validate()?;

        info!(
            "Starting crawl of {} (depth {}, {} workers, queue capacity {})",
            root, self.config.max_depth, self.config.workers, self.config.queue_capacity
        );

        let tracker = Arc::new(WorkTracker::new());
        let frontier = Frontier::new(self.config.queue_capacity, tracker.clone(), cancel.clone());

        let ctx = Arc::new(CrawlContext {
            origin: root.clone(),
            origin_policy: self.config.origin_policy,
            registry: VisitedRegistry::new(),
            graph: PageGraph::new(),
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            frontier: frontier.handle(),
            cancel,
            progress_callback: self.progress_callback.clone(),
        });

        let outcome = Scheduler::new(ctx, frontier, tracker, self.config.workers)
            .run(CrawlTask::new(root, self.config.max_depth))
            .await?;

        info!(
            "Crawl complete. Visited {} pages in {:.2?}",
            outcome.sitemap.len(),
            outcome.stats.elapsed
        );
        Ok(outcome)
    }
}

/// Crawls `root` over HTTP with default timeouts and returns the finished graph.
pub async fn run_crawl(
    root: &str,
    max_depth: i64,
    max_workers: usize,
    queue_capacity: usize,
) -> Result<Sitemap> {
    let config = CrawlConfig::new()
        .with_max_depth(max_depth)
        .with_workers(max_workers)
        .with_queue_capacity(queue_capacity);

    Ok(Crawler::new(config)?.crawl(root).await?.sitemap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const ROOT: &str = "https://example.com/";

    /// In-memory site. Unknown pages answer 404.
    #[derive(Default)]
    struct StaticSite {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl StaticSite {
        fn new() -> Self {
            Self::default()
        }

        fn page(mut self, path: &str, links: &[&str]) -> Self {
            let anchors: String = links
                .iter()
                .map(|href| format!(r#"<a href="{}">link</a>"#, href))
                .collect();
            self.pages.insert(
                format!("https://example.com{}", path),
                format!("<html><body>{}</body></html>", anchors),
            );
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }

        fn fetch_count(&self, url: &str) -> usize {
            self.fetched().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl Fetcher for StaticSite {
        async fn fetch(&self, address: &Address) -> Result<String> {
            self.fetched.lock().unwrap().push(address.to_string());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.pages
                .get(address.as_str())
                .cloned()
                .ok_or_else(|| ScanError::HttpStatus {
                    url: address.to_string(),
                    status: 404,
                })
        }
    }

    fn crawler(site: &Arc<StaticSite>, config: CrawlConfig) -> Crawler {
        Crawler::new(config).unwrap().with_fetcher(site.clone())
    }

    fn addr(path: &str) -> Address {
        Address::parse(&format!("https://example.com{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_root_without_links() {
        let site = Arc::new(StaticSite::new().page("/", &[]));
        let outcome = crawler(&site, CrawlConfig::new()).crawl(ROOT).await.unwrap();

        assert!(!outcome.cancelled);
        assert_eq!(outcome.sitemap.len(), 1);
        assert!(outcome.sitemap.children(&addr("/")).is_empty());
        assert_eq!(outcome.stats.pages_crawled, 1);
        assert!(outcome.stats.work.is_drained());
    }

    #[tokio::test]
    async fn test_equivalent_links_are_deduplicated() {
        let site = Arc::new(
            StaticSite::new()
                .page("/", &["/a", "https://example.com/a", "/a#section"])
                .page("/a", &[]),
        );
        let config = CrawlConfig::new().with_max_depth(2);
        let outcome = crawler(&site, config).crawl(ROOT).await.unwrap();

        assert_eq!(outcome.sitemap.children(&addr("/")), &[addr("/a")]);
        assert_eq!(site.fetch_count("https://example.com/a"), 1);
    }

    #[tokio::test]
    async fn test_cross_origin_links_never_enter_the_graph() {
        let site = Arc::new(
            StaticSite::new().page("/", &["https://other.com/x", "/local"]).page("/local", &[]),
        );
        let outcome = crawler(&site, CrawlConfig::new()).crawl(ROOT).await.unwrap();

        let other = Address::parse("https://other.com/x").unwrap();
        assert!(!outcome.sitemap.contains(&other));
        assert!(outcome.sitemap.pages().all(|node| !node.children.contains(&other)));
        assert!(!site.fetched().iter().any(|u| u.contains("other.com")));
    }

    #[tokio::test]
    async fn test_depth_zero_fetches_only_the_root() {
        let site = Arc::new(StaticSite::new().page("/", &["/a", "/b"]).page("/a", &[]).page("/b", &[]));
        let config = CrawlConfig::new().with_max_depth(0);
        let outcome = crawler(&site, config).crawl(ROOT).await.unwrap();

        assert_eq!(site.fetched(), vec![ROOT.to_string()]);
        assert_eq!(outcome.sitemap.len(), 1);
        // Children are recorded as edges but their depth -1 tasks are discarded.
        assert_eq!(outcome.sitemap.children(&addr("/")), &[addr("/a"), addr("/b")]);
        assert_eq!(outcome.stats.skipped_depth, 2);
    }

    #[tokio::test]
    async fn test_negative_depth_fetches_nothing() {
        let site = Arc::new(StaticSite::new().page("/", &["/a"]));
        let config = CrawlConfig::new().with_max_depth(-1);
        let outcome = crawler(&site, config).crawl(ROOT).await.unwrap();

        assert!(site.fetched().is_empty());
        assert!(outcome.sitemap.is_empty());
        assert_eq!(outcome.stats.skipped_depth, 1);
    }

    #[tokio::test]
    async fn test_depth_decreases_by_one_per_hop() {
        let site = Arc::new(
            StaticSite::new()
                .page("/", &["/1"])
                .page("/1", &["/2"])
                .page("/2", &["/3"])
                .page("/3", &["/4"]),
        );
        let config = CrawlConfig::new().with_max_depth(2);
        let outcome = crawler(&site, config).crawl(ROOT).await.unwrap();

        let mut fetched = site.fetched();
        fetched.sort();
        assert_eq!(
            fetched,
            vec![
                "https://example.com/",
                "https://example.com/1",
                "https://example.com/2"
            ]
        );
        assert_eq!(outcome.sitemap.children(&addr("/2")), &[addr("/3")]);
        assert!(!outcome.sitemap.contains(&addr("/3")));
    }

    #[tokio::test]
    async fn test_small_frontier_applies_backpressure_without_dropping_tasks() {
        let links: Vec<String> = (0..40).map(|i| format!("/page{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

        let mut site = StaticSite::new().page("/", &link_refs);
        for link in &links {
            site = site.page(link, &["/"]);
        }
        let site = Arc::new(site.with_delay(Duration::from_millis(2)));

        let config = CrawlConfig::new().with_queue_capacity(1).with_workers(2);
        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            crawler(&site, config).crawl(ROOT),
        )
        .await
        .expect("crawl should not deadlock on a full frontier")
        .unwrap();

        assert_eq!(outcome.sitemap.len(), 41);
        assert_eq!(outcome.sitemap.children(&addr("/")).len(), 40);
        for link in &links {
            assert_eq!(site.fetch_count(&format!("https://example.com{}", link)), 1);
        }
        assert!(outcome.stats.work.is_drained());
    }

    #[tokio::test]
    async fn test_self_references_create_no_self_loop() {
        let site = Arc::new(
            StaticSite::new().page("/", &["/", "#top", "https://example.com/", "/a"]).page("/a", &["/a"]),
        );
        let outcome = crawler(&site, CrawlConfig::new()).crawl(ROOT).await.unwrap();

        for node in outcome.sitemap.pages() {
            assert!(!node.children.contains(&node.address), "self loop on {}", node.address);
        }
        assert_eq!(outcome.sitemap.children(&addr("/")), &[addr("/a")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_page_is_crawled_once_under_concurrency() {
        let links: Vec<String> = (0..25).map(|i| format!("/hub{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

        let mut site = StaticSite::new().page("/", &link_refs).page("/shared", &["/"]);
        for link in &links {
            site = site.page(link, &["/shared", "/"]);
        }
        let site = Arc::new(site.with_delay(Duration::from_millis(5)));

        let config = CrawlConfig::new().with_workers(16);
        let outcome = crawler(&site, config).crawl(ROOT).await.unwrap();

        assert_eq!(site.fetch_count("https://example.com/shared"), 1);
        assert_eq!(site.fetch_count(ROOT), 1);
        assert_eq!(outcome.sitemap.len(), 27);
        assert!(outcome.stats.skipped_visited >= 24);
    }

    #[tokio::test]
    async fn test_worker_limit_bounds_concurrent_fetches() {
        let links: Vec<String> = (0..30).map(|i| format!("/p{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

        let mut site = StaticSite::new().page("/", &link_refs);
        for link in &links {
            site = site.page(link, &[]);
        }
        let site = Arc::new(site.with_delay(Duration::from_millis(20)));

        let config = CrawlConfig::new().with_workers(3);
        crawler(&site, config).crawl(ROOT).await.unwrap();

        let peak = site.peak_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded the worker limit", peak);
        assert!(peak > 1, "expected workers to overlap, peak was {}", peak);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_local_to_its_page() {
        let site = Arc::new(
            StaticSite::new()
                .page("/", &["/broken", "/ok"])
                .page("/ok", &["/deeper"])
                .page("/deeper", &[]),
        );
        let outcome = crawler(&site, CrawlConfig::new()).crawl(ROOT).await.unwrap();

        assert!(outcome.sitemap.contains(&addr("/broken")));
        assert!(outcome.sitemap.children(&addr("/broken")).is_empty());
        assert!(outcome.sitemap.contains(&addr("/deeper")));
        assert_eq!(outcome.stats.fetch_errors, 1);
        assert_eq!(outcome.stats.pages_crawled, 3);
    }

    #[tokio::test]
    async fn test_unresolvable_link_truncates_only_that_page() {
        let site = Arc::new(
            StaticSite::new()
                .page("/", &["/a", "http://[::1", "/b"])
                .page("/a", &["/c"])
                .page("/c", &[]),
        );
        let outcome = crawler(&site, CrawlConfig::new()).crawl(ROOT).await.unwrap();

        assert_eq!(outcome.sitemap.children(&addr("/")), &[addr("/a")]);
        assert!(outcome.sitemap.contains(&addr("/c")));
        assert_eq!(outcome.stats.truncated_pages, 1);
    }

    #[tokio::test]
    async fn test_cycles_and_diamonds_terminate() {
        let site = Arc::new(
            StaticSite::new()
                .page("/", &["/a", "/b"])
                .page("/a", &["/c"])
                .page("/b", &["/c"])
                .page("/c", &["/"]),
        );
        let outcome = crawler(&site, CrawlConfig::new()).crawl(ROOT).await.unwrap();

        assert_eq!(outcome.sitemap.len(), 4);
        assert_eq!(site.fetched().len(), 4);
        assert_eq!(outcome.sitemap.children(&addr("/c")), &[addr("/")]);
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_result_promptly() {
        let links: Vec<String> = (0..10).map(|i| format!("/slow{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let mut site = StaticSite::new().page("/", &link_refs);
        for link in &links {
            site = site.page(link, &[]);
        }
        let site = Arc::new(site.with_delay(Duration::from_millis(200)));

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        let config = CrawlConfig::new().with_workers(2);
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            crawler(&site, config).crawl_with_cancellation(ROOT, cancel),
        )
        .await
        .expect("cancelled crawl should return promptly")
        .unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.sitemap.contains(&addr("/")));
        assert!(outcome.stats.pages_crawled < 11);
    }

    #[tokio::test]
    async fn test_progress_callback_reports_each_claimed_page() {
        let site = Arc::new(StaticSite::new().page("/", &["/a", "/b"]).page("/a", &[]).page("/b", &[]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let crawler = crawler(&site, CrawlConfig::new()).with_progress_callback(Arc::new(
            move |count, url| {
                seen_clone.lock().unwrap().push((count, url));
            },
        ));
        crawler.crawl(ROOT).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (1, ROOT.to_string()));
    }

    #[tokio::test]
    async fn test_invalid_root_is_fatal() {
        let site = Arc::new(StaticSite::new());
        let crawler = crawler(&site, CrawlConfig::new());

        assert!(matches!(
            crawler.crawl("/relative").await,
            Err(ScanError::InvalidUrl(_))
        ));
        assert!(matches!(
            crawler.crawl("mailto:a@example.com").await,
            Err(ScanError::InvalidUrl(_))
        ));
        assert!(site.fetched().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            Crawler::new(CrawlConfig::new().with_workers(0)),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    /// End-to-end over HTTP with the real fetcher and extractor.
    #[tokio::test]
    async fn test_link_discovery_over_http() {
        let mock_server = MockServer::start().await;

        let root_html = format!(
            r#"<html><body>
                <a href="{}/page1">Page 1</a>
                <a href="/page2">Page 2</a>
                <a href="https://elsewhere.example.org/">External</a>
            </body></html>"#,
            mock_server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/page1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html><body><a href=\"/page2\">P2</a></body></html>"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html><body>P2</body></html>"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let crawler = Crawler::new(CrawlConfig::new().with_max_depth(3).with_workers(4)).unwrap();
        let outcome = crawler.crawl(&mock_server.uri()).await.unwrap();

        let root = Address::parse(&mock_server.uri()).unwrap();
        let page1 = Address::parse(&format!("{}/page1", mock_server.uri())).unwrap();
        let page2 = Address::parse(&format!("{}/page2", mock_server.uri())).unwrap();

        assert_eq!(outcome.sitemap.len(), 3);
        assert_eq!(outcome.sitemap.children(&root), &[page1.clone(), page2.clone()]);
        assert_eq!(outcome.sitemap.children(&page1), &[page2]);
        assert_eq!(outcome.stats.fetch_errors, 0);
    }

    #[tokio::test]
    async fn test_run_crawl_over_http_stops_at_max_depth() {
        let mock_server = MockServer::start().await;

        let pages: [(&str, &[u8]); 2] = [
            ("/", b"<html><body><a href=\"/a\">A</a></body></html>"),
            ("/a", b"<html><body><a href=\"/a/b\">B</a></body></html>"),
        ];
        for (page, body) in pages {
            Mock::given(method("GET"))
                .and(path(page))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_bytes(body),
                )
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        // One hop past the depth limit: linked to, never fetched
        Mock::given(method("GET"))
            .and(path("/a/b"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .expect(0)
            .mount(&mock_server)
            .await;

        let sitemap = run_crawl(&mock_server.uri(), 1, 2, 1).await.unwrap();

        let root = Address::parse(&mock_server.uri()).unwrap();
        let a = Address::parse(&format!("{}/a", mock_server.uri())).unwrap();
        let b = Address::parse(&format!("{}/a/b", mock_server.uri())).unwrap();

        assert_eq!(sitemap.root(), &root);
        assert_eq!(sitemap.len(), 2);
        assert_eq!(sitemap.children(&root), &[a.clone()]);
        assert_eq!(sitemap.children(&a), &[b.clone()]);
        assert!(!sitemap.contains(&b));
    }

    #[tokio::test]
    async fn test_run_crawl_rejects_invalid_arguments() {
        assert!(matches!(
            run_crawl("/relative", 2, 2, 2).await,
            Err(ScanError::InvalidUrl(_))
        ));
        assert!(matches!(
            run_crawl(ROOT, 2, 0, 2).await,
            Err(ScanError::InvalidConfig(_))
        ));
        assert!(matches!(
            run_crawl(ROOT, 2, 2, 0).await,
            Err(ScanError::InvalidConfig(_))
        ));
    }
}
