//! Primary-then-fallback crawl policy.

use serde::Serialize;

use crate::backend::CrawlBackend;
use crate::error::ScraperError;
use crate::hosted::HostedCrawler;
use crate::http_crawler::HttpCrawler;
use crate::types::{CrawlLimits, ScrapedPage};
use crate::urls::ensure_public_seed;

/// Pages kept from a scrape and which backend produced them.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub pages: Vec<ScrapedPage>,
    pub backend: &'static str,
    pub used_fallback: bool,
}

pub struct ScrapeOrchestrator {
    primary: Box<dyn CrawlBackend>,
    primary_limits: CrawlLimits,
    fallback: Option<(Box<dyn CrawlBackend>, CrawlLimits)>,
    min_pages: usize,
    allow_private_hosts: bool,
}

impl ScrapeOrchestrator {
    #[must_use]
    pub fn new(
        primary: Box<dyn CrawlBackend>,
        primary_limits: CrawlLimits,
        min_pages: usize,
    ) -> Self {
        Self {
            primary,
            primary_limits,
            fallback: None,
            min_pages,
            allow_private_hosts: false,
        }
    }

    /// Direct HTTP crawler as primary; the hosted crawler as fallback when an
    /// API key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if either HTTP client cannot be built.
    pub fn from_app_config(config: &callpilot_core::AppConfig) -> Result<Self, ScraperError> {
        let primary = HttpCrawler::from_app_config(config)?;
        let mut orchestrator = Self::new(
            Box::new(primary),
            CrawlLimits::primary_from_app_config(config),
            config.scraper_min_pages,
        )
        .allow_private_hosts(config.scraper_allow_private_hosts);
        match HostedCrawler::from_app_config(config)? {
            Some(hosted) => {
                orchestrator = orchestrator.with_fallback(
                    Box::new(hosted),
                    CrawlLimits::fallback_from_app_config(config),
                );
            }
            None => tracing::info!("scraper: no fallback crawler API key, fallback disabled"),
        }
        Ok(orchestrator)
    }

    #[must_use]
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Seeds on loopback or private addresses are refused unless allowed.
    #[must_use]
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Check a seed before starting a crawl.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] for a malformed seed, or one on a
    /// private or local address when those are not allowed.
    pub fn check_seed(&self, seed: &str) -> Result<(), ScraperError> {
        if self.allow_private_hosts {
            crate::urls::normalize_seed(seed).map(|_| ())
        } else {
            ensure_public_seed(seed)
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Box<dyn CrawlBackend>, limits: CrawlLimits) -> Self {
        self.fallback = Some((fallback, limits));
        self
    }

    /// Crawl `seed`, falling back to the secondary backend when the primary
    /// fails outright or stops short with fewer than `min_pages` pages.
    ///
    /// A primary crawl that finished cleanly is accepted even when the site is
    /// smaller than `min_pages`.
    ///
    /// Once the fallback runs, its result decides the outcome:
    ///
    /// - fallback error or zero pages: [`ScraperError::ScrapeFailed`], even if
    ///   the short primary crawl found some pages. An empty or failing
    ///   fallback on a site the primary could not finish is treated as a
    ///   site that cannot be scraped reliably.
    /// - fewer pages than the primary: the primary's pages are kept.
    /// - otherwise: the fallback's pages replace the primary's.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ScrapeFailed`] when no backend produced any
    /// usable page, or [`ScraperError::InvalidUrl`] for a seed that
    /// [`check_seed`](Self::check_seed) refuses.
    pub async fn scrape(&self, seed: &str) -> Result<ScrapeReport, ScraperError> {
        self.check_seed(seed)?;
        let primary_name = self.primary.name();
        let (primary_pages, primary_error) =
            match self.primary.crawl(seed, &self.primary_limits).await {
                Ok(output) => {
                    let enough = output.pages.len() >= self.min_pages;
                    if enough || (output.complete && !output.pages.is_empty()) {
                        return Ok(ScrapeReport {
                            pages: output.pages,
                            backend: primary_name,
                            used_fallback: false,
                        });
                    }
                    tracing::warn!(
                        %seed,
                        backend = primary_name,
                        pages = output.pages.len(),
                        min_pages = self.min_pages,
                        "scraper: insufficient yield from primary crawl"
                    );
                    (output.pages, None)
                }
                Err(e @ ScraperError::InvalidUrl { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        %seed,
                        backend = primary_name,
                        error = %e,
                        "scraper: primary crawl failed"
                    );
                    (Vec::new(), Some(e.to_string()))
                }
            };

        let Some((fallback, fallback_limits)) = &self.fallback else {
            if primary_pages.is_empty() {
                return Err(ScraperError::ScrapeFailed {
                    url: seed.to_owned(),
                    reason: primary_error
                        .unwrap_or_else(|| "primary crawl found no pages".to_owned()),
                });
            }
            tracing::info!(%seed, "scraper: no fallback configured, keeping primary pages");
            return Ok(ScrapeReport {
                pages: primary_pages,
                backend: primary_name,
                used_fallback: false,
            });
        };

        let fallback_name = fallback.name();
        tracing::info!(%seed, backend = fallback_name, "scraper: running fallback crawl");
        match fallback.crawl(seed, fallback_limits).await {
            Ok(output) if output.pages.is_empty() => Err(ScraperError::ScrapeFailed {
                url: seed.to_owned(),
                reason: format!("fallback crawl ({fallback_name}) returned no pages"),
            }),
            Ok(output) if output.pages.len() < primary_pages.len() => {
                tracing::info!(
                    %seed,
                    primary = primary_pages.len(),
                    fallback = output.pages.len(),
                    "scraper: fallback yielded fewer pages, keeping primary"
                );
                Ok(ScrapeReport {
                    pages: primary_pages,
                    backend: primary_name,
                    used_fallback: false,
                })
            }
            Ok(output) => Ok(ScrapeReport {
                pages: output.pages,
                backend: fallback_name,
                used_fallback: true,
            }),
            Err(e) => {
                tracing::error!(
                    %seed,
                    backend = fallback_name,
                    error = %e,
                    "scraper: fallback crawl failed"
                );
                Err(ScraperError::ScrapeFailed {
                    url: seed.to_owned(),
                    reason: format!("fallback crawl ({fallback_name}) failed: {e}"),
                })
            }
        }
    }
}
