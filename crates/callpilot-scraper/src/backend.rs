use async_trait::async_trait;

use crate::error::ScraperError;
use crate::types::{CrawlLimits, CrawlOutput};

/// A source of pages for one website.
///
/// Implemented by the direct [`HttpCrawler`](crate::HttpCrawler) and the
/// hosted [`HostedCrawler`](crate::HostedCrawler). The orchestrator only sees
/// this trait.
#[async_trait]
pub trait CrawlBackend: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Crawl outward from `seed` within `limits`.
    ///
    /// # Errors
    ///
    /// Returns a [`ScraperError`] when the crawl could not start (bad seed,
    /// unreachable host) or the backend itself failed. Individual page
    /// failures after the seed are reported through
    /// [`CrawlOutput::complete`] instead.
    async fn crawl(&self, seed: &str, limits: &CrawlLimits) -> Result<CrawlOutput, ScraperError>;
}
