use serde::{Deserialize, Serialize};

/// One fetched page. Lives only for the duration of a build; the HTML is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub raw_html: String,
    /// Readable text (plain text or markdown, depending on the backend).
    pub extracted_text: String,
}

/// Bounds applied to a single crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    pub max_pages: usize,
    /// Link depth from the seed. `None` means unlimited.
    pub max_depth: Option<u32>,
    /// Delay between consecutive page fetches.
    pub delay_ms: u64,
}

impl CrawlLimits {
    #[must_use]
    pub fn primary_from_app_config(config: &callpilot_core::AppConfig) -> Self {
        Self {
            max_pages: config.scraper_max_pages,
            max_depth: None,
            delay_ms: config.scraper_delay_ms,
        }
    }

    #[must_use]
    pub fn fallback_from_app_config(config: &callpilot_core::AppConfig) -> Self {
        Self {
            max_pages: config.fallback_max_pages,
            max_depth: Some(config.fallback_max_depth),
            delay_ms: 0,
        }
    }
}

/// What a backend produced for one seed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutput {
    pub pages: Vec<ScrapedPage>,
    /// `true` when the crawl ran to completion: the frontier emptied (or the
    /// page cap was reached) without any fetch failing. A short but complete
    /// crawl means the site is small, not that the backend struggled.
    pub complete: bool,
}
