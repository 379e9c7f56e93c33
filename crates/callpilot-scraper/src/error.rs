use thiserror::Error;

use callpilot_core::Transient;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("timed out after {timeout_secs}s loading {url}")]
    PageTimeout { url: String, timeout_secs: u64 },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("hosted crawl {job_id} failed: {reason}")]
    HostedCrawl { job_id: String, reason: String },

    #[error("scrape of {url} failed: {reason}")]
    ScrapeFailed { url: String, reason: String },
}

/// Retriable: 429, 5xx, and network-level failures (timeout, connect).
/// A page timeout is not retried; it already consumed its full budget.
impl Transient for ScraperError {
    fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            ScraperError::RateLimited { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
            ScraperError::Deserialize { .. }
            | ScraperError::PageTimeout { .. }
            | ScraperError::InvalidUrl { .. }
            | ScraperError::HostedCrawl { .. }
            | ScraperError::ScrapeFailed { .. } => false,
        }
    }
}
