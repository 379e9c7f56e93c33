pub mod app_config;
pub mod config;
pub mod retry;
pub mod sentiment;

pub use app_config::{AppConfig, Environment};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use retry::{retry_with_backoff, RetryPolicy, Transient};
pub use sentiment::SentimentLabel;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
