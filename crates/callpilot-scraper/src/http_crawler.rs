//! Breadth-first same-host crawler over plain HTTP.
//!
//! Two FIFO queues form the frontier: links whose path looks
//! business-relevant (about, services, contact, ...) are always dequeued
//! before regular links. Excluded paths and static assets never enter the
//! frontier.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use callpilot_core::{retry_with_backoff, RetryPolicy};

use crate::backend::CrawlBackend;
use crate::error::ScraperError;
use crate::html::read_page;
use crate::types::{CrawlLimits, CrawlOutput, ScrapedPage};
use crate::urls::{canonicalize_url, is_excluded, is_priority, normalize_seed, same_host};

/// Stop after this many fetch attempts per allowed page, so a site that
/// keeps failing cannot hold the crawl open indefinitely.
const ATTEMPTS_PER_PAGE: usize = 5;

pub struct HttpCrawler {
    client: Client,
    page_timeout: Duration,
    retry: RetryPolicy,
}

struct FetchedPage {
    /// Final URL after redirects.
    url: String,
    html: String,
}

impl HttpCrawler {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        user_agent: &str,
        page_timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(page_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            page_timeout: Duration::from_secs(page_timeout_secs),
            retry,
        })
    }

    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_app_config(config: &callpilot_core::AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            &config.scraper_user_agent,
            config.scraper_page_timeout_secs,
            RetryPolicy::from_app_config(config),
        )
    }

    /// Fetch one page. `Ok(None)` means the response was not HTML.
    async fn fetch_page(&self, url: &str) -> Result<Option<FetchedPage>, ScraperError> {
        let timeout_secs = self.page_timeout.as_secs();
        retry_with_backoff(self.retry, "crawler", || async move {
            match tokio::time::timeout(self.page_timeout, self.fetch_once(url)).await {
                Ok(result) => result,
                Err(_) => Err(ScraperError::PageTimeout {
                    url: url.to_owned(),
                    timeout_secs,
                }),
            }
        })
        .await
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<FetchedPage>, ScraperError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            let domain = response.url().host_str().unwrap_or_default().to_owned();
            return Err(ScraperError::RateLimited {
                domain,
                retry_after_secs,
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));
        if !is_html {
            return Ok(None);
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;
        Ok(Some(FetchedPage {
            url: final_url,
            html,
        }))
    }
}

#[async_trait]
impl CrawlBackend for HttpCrawler {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn crawl(&self, seed: &str, limits: &CrawlLimits) -> Result<CrawlOutput, ScraperError> {
        let seed_url = normalize_seed(seed)?;
        let host = seed_url.host_str().unwrap_or_default().to_owned();
        let seed = canonicalize_url(seed_url.as_str()).unwrap_or_else(|| seed_url.to_string());

        let mut priority: VecDeque<(String, u32)> = VecDeque::new();
        let mut regular: VecDeque<(String, u32)> = VecDeque::from([(seed.clone(), 0)]);
        let mut seen: HashSet<String> = HashSet::from([seed.clone()]);
        let mut pages: Vec<ScrapedPage> = Vec::new();
        let mut failures = 0usize;
        let mut attempts = 0usize;
        let max_attempts = limits.max_pages.saturating_mul(ATTEMPTS_PER_PAGE);

        while pages.len() < limits.max_pages {
            let Some((url, depth)) = priority.pop_front().or_else(|| regular.pop_front()) else {
                break;
            };
            if attempts >= max_attempts {
                tracing::warn!(%seed, attempts, "crawler: attempt cap reached");
                failures += 1;
                break;
            }
            if attempts > 0 && limits.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(limits.delay_ms)).await;
            }
            attempts += 1;

            let fetched = match self.fetch_page(&url).await {
                Ok(Some(fetched)) => fetched,
                Ok(None) => continue,
                Err(e) if url == seed => return Err(e),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "crawler: page fetch failed");
                    failures += 1;
                    continue;
                }
            };

            let parts = read_page(&fetched.html, &fetched.url);
            let follow = limits.max_depth.is_none_or(|max| depth < max);
            if follow {
                for link in parts.links {
                    if !same_host(&link, &host) || is_excluded(&link) {
                        continue;
                    }
                    if !seen.insert(link.clone()) {
                        continue;
                    }
                    if is_priority(&link) {
                        priority.push_back((link, depth + 1));
                    } else {
                        regular.push_back((link, depth + 1));
                    }
                }
            }

            if parts.text.trim().is_empty() {
                tracing::debug!(url = %fetched.url, "crawler: page has no text");
                continue;
            }
            pages.push(ScrapedPage {
                url: fetched.url,
                title: parts.title,
                raw_html: fetched.html,
                extracted_text: parts.text,
            });
        }

        tracing::info!(
            %seed,
            pages = pages.len(),
            attempts,
            failures,
            "crawler: crawl finished"
        );
        Ok(CrawlOutput {
            pages,
            complete: failures == 0,
        })
    }
}
