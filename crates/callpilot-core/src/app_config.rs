use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Outbound provider calls
    pub http_timeout_secs: u64,
    pub http_max_retries: u32,
    pub http_retry_backoff_ms: u64,

    // Crawling
    pub scraper_user_agent: String,
    pub scraper_page_timeout_secs: u64,
    pub scraper_max_pages: usize,
    pub scraper_min_pages: usize,
    pub scraper_delay_ms: u64,
    /// Accept seeds on loopback, private, or link-local addresses.
    pub scraper_allow_private_hosts: bool,
    pub fallback_crawler_url: String,
    pub fallback_crawler_api_key: Option<String>,
    pub fallback_max_pages: usize,
    pub fallback_max_depth: u32,

    // Knowledge base
    pub knowledge_max_file_bytes: usize,
    pub voice_api_base_url: String,
    pub voice_api_key: Option<String>,

    // Sentiment
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub sentiment_model: String,
    pub sentiment_max_transcript_chars: usize,
    pub sentiment_batch_size: i64,

    // Calendar
    pub google_calendar_base_url: String,
    pub google_oauth_token_url: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,

    // Scheduling
    pub calendar_warmup_secs: u64,
    pub calendar_sync_interval_secs: u64,
    pub sentiment_interval_secs: u64,
    pub rollup_cron: String,
}

impl AppConfig {
    /// Google OAuth client credentials, when both halves are configured.
    #[must_use]
    pub fn google_oauth_client(&self) -> Option<(&str, &str)> {
        match (&self.google_client_id, &self.google_client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "[redacted]")
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_retry_backoff_ms", &self.http_retry_backoff_ms)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_page_timeout_secs", &self.scraper_page_timeout_secs)
            .field("scraper_max_pages", &self.scraper_max_pages)
            .field("scraper_min_pages", &self.scraper_min_pages)
            .field("scraper_delay_ms", &self.scraper_delay_ms)
            .field(
                "scraper_allow_private_hosts",
                &self.scraper_allow_private_hosts,
            )
            .field("fallback_crawler_url", &self.fallback_crawler_url)
            .field(
                "fallback_crawler_api_key",
                &redact(self.fallback_crawler_api_key.as_ref()),
            )
            .field("fallback_max_pages", &self.fallback_max_pages)
            .field("fallback_max_depth", &self.fallback_max_depth)
            .field("knowledge_max_file_bytes", &self.knowledge_max_file_bytes)
            .field("voice_api_base_url", &self.voice_api_base_url)
            .field("voice_api_key", &redact(self.voice_api_key.as_ref()))
            .field("openai_api_key", &redact(self.openai_api_key.as_ref()))
            .field("openai_base_url", &self.openai_base_url)
            .field("sentiment_model", &self.sentiment_model)
            .field(
                "sentiment_max_transcript_chars",
                &self.sentiment_max_transcript_chars,
            )
            .field("sentiment_batch_size", &self.sentiment_batch_size)
            .field("google_calendar_base_url", &self.google_calendar_base_url)
            .field("google_oauth_token_url", &self.google_oauth_token_url)
            .field("google_client_id", &self.google_client_id)
            .field(
                "google_client_secret",
                &redact(self.google_client_secret.as_ref()),
            )
            .field("calendar_warmup_secs", &self.calendar_warmup_secs)
            .field(
                "calendar_sync_interval_secs",
                &self.calendar_sync_interval_secs,
            )
            .field("sentiment_interval_secs", &self.sentiment_interval_secs)
            .field("rollup_cron", &self.rollup_cron)
            .finish()
    }
}
