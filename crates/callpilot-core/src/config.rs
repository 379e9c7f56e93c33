use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns [`ConfigError`] if `DATABASE_URL` is missing or any variable fails
/// to parse.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates can leave keys blank.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("CALLPILOT_ENV", "development"))?;
    let bind_addr = parse_var(&lookup, "CALLPILOT_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CALLPILOT_LOG_LEVEL", "info");

    let db_max_connections = parse_var(&lookup, "CALLPILOT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_var(&lookup, "CALLPILOT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_var(&lookup, "CALLPILOT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "CALLPILOT_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "{db_min_connections} exceeds CALLPILOT_DB_MAX_CONNECTIONS ({db_max_connections})"
            ),
        });
    }

    let http_timeout_secs = parse_var(&lookup, "CALLPILOT_HTTP_TIMEOUT_SECS", "30")?;
    let http_max_retries = parse_var(&lookup, "CALLPILOT_HTTP_MAX_RETRIES", "2")?;
    let http_retry_backoff_ms = parse_var(&lookup, "CALLPILOT_HTTP_RETRY_BACKOFF_MS", "500")?;

    let scraper_user_agent = or_default(
        "CALLPILOT_SCRAPER_USER_AGENT",
        "callpilot/0.1 (knowledge-builder)",
    );
    let scraper_page_timeout_secs = parse_var(&lookup, "CALLPILOT_SCRAPER_PAGE_TIMEOUT_SECS", "30")?;
    let scraper_max_pages = parse_var(&lookup, "CALLPILOT_SCRAPER_MAX_PAGES", "20")?;
    let scraper_min_pages = parse_var(&lookup, "CALLPILOT_SCRAPER_MIN_PAGES", "5")?;
    let scraper_delay_ms = parse_var(&lookup, "CALLPILOT_SCRAPER_DELAY_MS", "1000")?;
    let scraper_allow_private_hosts =
        parse_var(&lookup, "CALLPILOT_SCRAPER_ALLOW_PRIVATE_HOSTS", "false")?;
    let fallback_crawler_url =
        or_default("CALLPILOT_FALLBACK_CRAWLER_URL", "https://api.firecrawl.dev");
    let fallback_crawler_api_key = optional("CALLPILOT_FALLBACK_CRAWLER_API_KEY");
    let fallback_max_pages = parse_var(&lookup, "CALLPILOT_FALLBACK_MAX_PAGES", "50")?;
    let fallback_max_depth = parse_var(&lookup, "CALLPILOT_FALLBACK_MAX_DEPTH", "3")?;

    let knowledge_max_file_bytes =
        parse_var(&lookup, "CALLPILOT_KNOWLEDGE_MAX_FILE_BYTES", "307200")?;
    if knowledge_max_file_bytes < 1024 {
        return Err(ConfigError::InvalidEnvVar {
            var: "CALLPILOT_KNOWLEDGE_MAX_FILE_BYTES".to_string(),
            reason: format!("{knowledge_max_file_bytes} is below the 1024-byte minimum"),
        });
    }
    let voice_api_base_url = or_default("VOICE_API_BASE_URL", "https://api.vapi.ai");
    let voice_api_key = optional("VOICE_API_KEY");

    let openai_api_key = optional("OPENAI_API_KEY");
    let openai_base_url = or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
    let sentiment_model = or_default("CALLPILOT_SENTIMENT_MODEL", "gpt-4o-mini");
    let sentiment_max_transcript_chars =
        parse_var(&lookup, "CALLPILOT_SENTIMENT_MAX_TRANSCRIPT_CHARS", "4000")?;
    let sentiment_batch_size = parse_var(&lookup, "CALLPILOT_SENTIMENT_BATCH_SIZE", "50")?;

    let google_calendar_base_url = or_default(
        "GOOGLE_CALENDAR_BASE_URL",
        "https://www.googleapis.com/calendar/v3",
    );
    let google_oauth_token_url =
        or_default("GOOGLE_OAUTH_TOKEN_URL", "https://oauth2.googleapis.com/token");
    let google_client_id = optional("GOOGLE_CLIENT_ID");
    let google_client_secret = optional("GOOGLE_CLIENT_SECRET");

    let calendar_warmup_secs = parse_var(&lookup, "CALLPILOT_CALENDAR_WARMUP_SECS", "120")?;
    let calendar_sync_interval_secs =
        parse_var(&lookup, "CALLPILOT_CALENDAR_SYNC_INTERVAL_SECS", "1800")?;
    let sentiment_interval_secs = parse_var(&lookup, "CALLPILOT_SENTIMENT_INTERVAL_SECS", "900")?;
    let rollup_cron = or_default("CALLPILOT_ROLLUP_CRON", "0 0 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_max_retries,
        http_retry_backoff_ms,
        scraper_user_agent,
        scraper_page_timeout_secs,
        scraper_max_pages,
        scraper_min_pages,
        scraper_delay_ms,
        scraper_allow_private_hosts,
        fallback_crawler_url,
        fallback_crawler_api_key,
        fallback_max_pages,
        fallback_max_depth,
        knowledge_max_file_bytes,
        voice_api_base_url,
        voice_api_key,
        openai_api_key,
        openai_base_url,
        sentiment_model,
        sentiment_max_transcript_chars,
        sentiment_batch_size,
        google_calendar_base_url,
        google_oauth_token_url,
        google_client_id,
        google_client_secret,
        calendar_warmup_secs,
        calendar_sync_interval_secs,
        sentiment_interval_secs,
        rollup_cron,
    })
}

/// Parse `var` (or `default` when unset) into `T`, naming the variable on failure.
fn parse_var<F, T>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CALLPILOT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
