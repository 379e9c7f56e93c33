//! Background job scheduler.
//!
//! [`SyncScheduler::start`] registers the calendar sync, sentiment batch and
//! analytics rollup jobs on a [`JobScheduler`] and starts it;
//! [`SyncScheduler::shutdown`] stops every job. Jobs run tenants one at a
//! time and log per-tenant failures; nothing a job does can stop the
//! scheduler or the process.

mod analytics;
mod calendar;
mod sentiment;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_cron_scheduler::{JobScheduler, JobSchedulerError};

use callpilot_calendar::CalendarClient;
use callpilot_sentiment::SentimentAnalyzer;

/// Shared dependencies handed to every job.
pub struct JobContext {
    pub pool: PgPool,
    pub calendar: CalendarClient,
    /// `None` when no LLM key is configured; the sentiment job is skipped.
    pub sentiment: Option<SentimentAnalyzer>,
    pub sentiment_batch_size: i64,
}

impl JobContext {
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_app_config(
        pool: PgPool,
        config: &callpilot_core::AppConfig,
    ) -> anyhow::Result<Self> {
        let calendar = CalendarClient::from_app_config(config)?;
        if !calendar.can_refresh() {
            tracing::warn!(
                "GOOGLE_CLIENT_ID/SECRET not set; expired calendar tokens cannot be refreshed"
            );
        }
        let sentiment = SentimentAnalyzer::from_app_config(config)?;
        Ok(Self {
            pool,
            calendar,
            sentiment,
            sentiment_batch_size: config.sentiment_batch_size,
        })
    }
}

/// Timing for the registered jobs.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub calendar_warmup: Duration,
    pub calendar_interval: Duration,
    pub sentiment_interval: Duration,
    /// Six-field cron expression (seconds first), UTC.
    pub rollup_cron: String,
}

impl Schedule {
    #[must_use]
    pub fn from_app_config(config: &callpilot_core::AppConfig) -> Self {
        Self {
            calendar_warmup: Duration::from_secs(config.calendar_warmup_secs),
            calendar_interval: Duration::from_secs(config.calendar_sync_interval_secs),
            sentiment_interval: Duration::from_secs(config.sentiment_interval_secs),
            rollup_cron: config.rollup_cron.clone(),
        }
    }
}

/// Owns the running [`JobScheduler`]. Jobs stop on [`shutdown`](Self::shutdown).
pub struct SyncScheduler {
    scheduler: JobScheduler,
}

impl SyncScheduler {
    /// Registers all jobs and starts the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
    /// a job cannot be registered (e.g. an invalid rollup cron), or the
    /// scheduler fails to start.
    pub async fn start(
        ctx: Arc<JobContext>,
        schedule: &Schedule,
    ) -> Result<Self, JobSchedulerError> {
        let scheduler = JobScheduler::new().await?;

        calendar::register_calendar_sync(
            &scheduler,
            Arc::clone(&ctx),
            schedule.calendar_warmup,
            schedule.calendar_interval,
        )
        .await?;
        if ctx.sentiment.is_some() {
            sentiment::register_sentiment_batch(
                &scheduler,
                Arc::clone(&ctx),
                schedule.sentiment_interval,
            )
            .await?;
        } else {
            tracing::warn!("OPENAI_API_KEY not set; sentiment batch job not registered");
        }
        analytics::register_rollups(&scheduler, ctx, &schedule.rollup_cron).await?;

        scheduler.start().await?;
        tracing::info!("scheduler: started");
        Ok(Self { scheduler })
    }

    /// Stops all jobs, including ones registered after start.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the scheduler fails to shut down.
    pub async fn shutdown(mut self) -> Result<(), JobSchedulerError> {
        self.scheduler.shutdown().await?;
        tracing::info!("scheduler: stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callpilot_core::RetryPolicy;

    fn context() -> Arc<JobContext> {
        // Never connects: no job fires within these tests.
        let pool =
            PgPool::connect_lazy("postgres://callpilot@localhost/unused").expect("lazy pool");
        let calendar = CalendarClient::new(
            "http://127.0.0.1:9/calendar/v3",
            "http://127.0.0.1:9/token",
            5,
            RetryPolicy::none(),
        )
        .expect("calendar client");
        Arc::new(JobContext {
            pool,
            calendar,
            sentiment: None,
            sentiment_batch_size: 50,
        })
    }

    fn quiet_schedule(rollup_cron: &str) -> Schedule {
        Schedule {
            calendar_warmup: Duration::from_secs(3600),
            calendar_interval: Duration::from_secs(1800),
            sentiment_interval: Duration::from_secs(900),
            rollup_cron: rollup_cron.to_owned(),
        }
    }

    #[tokio::test]
    async fn scheduler_starts_and_shuts_down_cleanly() {
        let scheduler = SyncScheduler::start(context(), &quiet_schedule("0 0 0 1 1 *"))
            .await
            .expect("start");
        scheduler.shutdown().await.expect("shutdown");

        // A second instance in the same process is independent of the first.
        let again = SyncScheduler::start(context(), &quiet_schedule("0 0 0 1 1 *"))
            .await
            .expect("restart");
        again.shutdown().await.expect("shutdown again");
    }

    #[tokio::test]
    async fn invalid_rollup_cron_fails_to_start() {
        let result = SyncScheduler::start(context(), &quiet_schedule("every hour")).await;
        assert!(result.is_err());
    }
}
