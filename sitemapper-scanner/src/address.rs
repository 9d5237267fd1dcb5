use crate::config::OriginPolicy;
use crate::error::{Result, ScanError};
use serde::Serialize;
use std::fmt;
use url::Url;

/// A normalized absolute crawl address.
///
/// Only `http`/`https` URLs with a host are addresses. The fragment is
/// stripped on construction, so `/page` and `/page#top` compare equal and
/// share one entry in the registry and the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(Url);

impl Address {
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", input, e)))?;
        Self::from_url(url).ok_or_else(|| {
            ScanError::InvalidUrl(format!("{}: not an absolute http(s) URL with a host", input))
        })
    }

    /// Returns `None` for URLs that can never be crawled (mailto:, data:, no host...).
    pub fn from_url(mut url: Url) -> Option<Self> {
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        url.set_fragment(None);
        Some(Self(url))
    }

    /// Resolves a possibly-relative reference against this address.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        self.0
            .join(href.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{} (base {}): {}", href, self.0, e)))
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn same_origin(&self, other: &Address, policy: OriginPolicy) -> bool {
        match policy {
            OriginPolicy::Host => self.host() == other.host(),
            OriginPolicy::SchemeHostPort => {
                self.0.scheme() == other.0.scheme()
                    && self.host() == other.host()
                    && self.0.port_or_known_default() == other.0.port_or_known_default()
            }
        }
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
