//! Client for a hosted crawl service (Firecrawl v1 API shape).
//!
//! A crawl is an asynchronous job: `POST /v1/crawl` starts it and returns an
//! id, `GET /v1/crawl/{id}` reports status and, once `completed`, the scraped
//! documents. Large results are paginated through a `next` URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use callpilot_core::{retry_with_backoff, RetryPolicy};

use crate::backend::CrawlBackend;
use crate::error::ScraperError;
use crate::html::{extract_title, html_to_text};
use crate::types::{CrawlLimits, CrawlOutput, ScrapedPage};
use crate::urls::normalize_seed;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_MAX_POLLS: u32 = 100;
const DEFAULT_MAX_DEPTH: u32 = 3;

pub struct HostedCrawler {
    client: Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
    retry: RetryPolicy,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartCrawlRequest<'a> {
    url: &'a str,
    limit: usize,
    max_depth: u32,
    scrape_options: ScrapeOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeOptions {
    formats: [&'static str; 2],
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct StartCrawlResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlStatusResponse {
    status: String,
    #[serde(default)]
    data: Vec<CrawlDocument>,
    next: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlDocument {
    markdown: Option<String>,
    html: Option<String>,
    #[serde(default)]
    metadata: DocumentMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentMetadata {
    title: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    url: Option<String>,
    status_code: Option<u16>,
}

impl CrawlDocument {
    fn into_page(self) -> Option<ScrapedPage> {
        if self.metadata.status_code.is_some_and(|code| code >= 400) {
            return None;
        }
        let url = self.metadata.source_url.or(self.metadata.url)?;
        let raw_html = self.html.unwrap_or_default();
        let extracted_text = match self.markdown {
            Some(md) if !md.trim().is_empty() => md,
            _ => html_to_text(&raw_html),
        };
        if extracted_text.trim().is_empty() {
            return None;
        }
        let title = self
            .metadata
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| extract_title(&raw_html));
        Some(ScrapedPage {
            url,
            title,
            raw_html,
            extracted_text,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl HostedCrawler {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            retry,
        })
    }

    /// Build from config. Returns `Ok(None)` when no API key is configured,
    /// which disables the fallback path.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_app_config(
        config: &callpilot_core::AppConfig,
    ) -> Result<Option<Self>, ScraperError> {
        let Some(api_key) = config.fallback_crawler_api_key.as_deref() else {
            return Ok(None);
        };
        Self::new(
            &config.fallback_crawler_url,
            api_key,
            config.http_timeout_secs,
            RetryPolicy::from_app_config(config),
        )
        .map(Some)
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    async fn start_crawl(&self, seed: &str, limits: &CrawlLimits) -> Result<String, ScraperError> {
        let url = format!("{}/v1/crawl", self.base_url);
        let body = StartCrawlRequest {
            url: seed,
            limit: limits.max_pages,
            max_depth: limits.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            scrape_options: ScrapeOptions {
                formats: ["markdown", "html"],
                only_main_content: true,
            },
        };

        let parsed: StartCrawlResponse = retry_with_backoff(self.retry, "hosted crawler", || {
            let url = url.clone();
            let body = &body;
            async move {
                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(body)
                    .send()
                    .await?;
                read_json(response, &url, "crawl start response").await
            }
        })
        .await?;

        match parsed.id {
            Some(id) if parsed.success || parsed.error.is_none() => Ok(id),
            id => Err(ScraperError::HostedCrawl {
                job_id: id.unwrap_or_default(),
                reason: parsed
                    .error
                    .unwrap_or_else(|| "crawl was not accepted".to_owned()),
            }),
        }
    }

    async fn get_status(&self, url: &str) -> Result<CrawlStatusResponse, ScraperError> {
        retry_with_backoff(self.retry, "hosted crawler", || async move {
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            read_json(response, url, "crawl status response").await
        })
        .await
    }

    /// Poll until the job leaves the in-progress states, then follow `next`
    /// links until `max_pages` documents are collected.
    async fn collect(
        &self,
        job_id: &str,
        max_pages: usize,
    ) -> Result<Vec<ScrapedPage>, ScraperError> {
        let status_url = format!("{}/v1/crawl/{job_id}", self.base_url);

        let mut polls = 0u32;
        let mut status = loop {
            let status = self.get_status(&status_url).await?;
            match status.status.as_str() {
                "completed" => break status,
                "failed" | "cancelled" => {
                    return Err(ScraperError::HostedCrawl {
                        job_id: job_id.to_owned(),
                        reason: status
                            .error
                            .unwrap_or_else(|| format!("job {}", status.status)),
                    });
                }
                _ => {}
            }
            polls += 1;
            if polls >= self.max_polls {
                return Err(ScraperError::HostedCrawl {
                    job_id: job_id.to_owned(),
                    reason: format!("still {} after {polls} polls", status.status),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        };

        let mut pages = Vec::new();
        loop {
            pages.extend(status.data.drain(..).filter_map(CrawlDocument::into_page));
            if pages.len() >= max_pages {
                pages.truncate(max_pages);
                break;
            }
            let Some(next) = status.next.take() else {
                break;
            };
            status = self.get_status(&next).await?;
        }
        Ok(pages)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    url: &str,
    context: &str,
) -> Result<T, ScraperError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(ScraperError::RateLimited {
            domain: response.url().host_str().unwrap_or_default().to_owned(),
            retry_after_secs,
        });
    }
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }
    let body = response.text().await?;
    serde_json::from_str::<T>(&body).map_err(|source| ScraperError::Deserialize {
        context: format!("{context} from {url}"),
        source,
    })
}

#[async_trait]
impl CrawlBackend for HostedCrawler {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn crawl(&self, seed: &str, limits: &CrawlLimits) -> Result<CrawlOutput, ScraperError> {
        let seed_url = normalize_seed(seed)?;
        let job_id = self.start_crawl(seed_url.as_str(), limits).await?;
        tracing::info!(%seed_url, %job_id, "hosted crawler: job started");

        let pages = self.collect(&job_id, limits.max_pages).await?;
        tracing::info!(%job_id, pages = pages.len(), "hosted crawler: job completed");
        Ok(CrawlOutput {
            pages,
            complete: true,
        })
    }
}
