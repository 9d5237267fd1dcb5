use crate::error::{Result, ScanError};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_MAX_DEPTH: i64 = 10;
pub const DEFAULT_WORKERS: usize = 100;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How a discovered link is compared against the crawl origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum OriginPolicy {
    /// Hostname only; `http://example.com` and `https://example.com:8443` match.
    #[default]
    Host,
    /// Scheme, hostname and effective port must all match.
    SchemeHostPort,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlConfig {
    pub max_depth: i64,
    pub workers: usize,
    pub queue_capacity: usize,
    pub timeout: Duration,
    pub origin_policy: OriginPolicy,
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            origin_policy: OriginPolicy::Host,
        }
    }

    pub fn with_max_depth(mut self, depth: i64) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.origin_policy = policy;
        self
    }

    /// Rejects settings that would make the crawl unable to start or progress.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ScanError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ScanError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "request timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::new()
    }
}
