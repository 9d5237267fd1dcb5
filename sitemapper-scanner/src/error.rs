use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} returned by {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not an HTML document: {url} ({content_type})")]
    NotHtml { url: String, content_type: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frontier closed")]
    FrontierClosed,

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
