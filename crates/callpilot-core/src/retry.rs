//! Bounded retry with exponential back-off and jitter for outbound provider
//! calls.
//!
//! Every HTTP client in the workspace wraps its requests in
//! [`retry_with_backoff`]. Each crate's error type decides which of its
//! variants are worth another attempt by implementing [`Transient`].

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::AppConfig;

const MAX_DELAY_MS: u64 = 60_000;

/// Classifies an error as transient (retry after a delay) or permanent.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// How many extra attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure. `0` disables retries.
    pub max_retries: u32,
    /// Base delay: the n-th retry waits `backoff_base_ms * 2^(n-1)` ms ± 25 %.
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.http_max_retries,
            backoff_base_ms: config.http_retry_backoff_ms,
        }
    }

    /// A policy that never retries and never sleeps. Used by tests.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    fn delay_for(self, attempt: u32) -> Duration {
        let computed = self
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
        let capped = computed.min(MAX_DELAY_MS);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        Duration::from_millis(jittered)
    }
}

/// Runs `operation`, retrying transient failures according to `policy`.
///
/// `label` names the provider in log lines (`"voice upload"`, `"calendar"`).
/// Permanent errors and the last transient error after the budget is spent
/// are returned unchanged.
///
/// # Errors
///
/// Returns whatever error `operation` produced on its final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Transient + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    provider = label,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient provider error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
