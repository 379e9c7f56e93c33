//! Periodic sentiment scoring of finished calls.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::JobContext;

pub(super) async fn register_sentiment_batch(
    scheduler: &JobScheduler,
    ctx: Arc<JobContext>,
    interval: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let ctx = Arc::clone(&ctx);
        Box::pin(async move {
            run_sentiment_batch(&ctx).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(
        interval_secs = interval.as_secs(),
        "scheduler: registered sentiment batch"
    );
    Ok(())
}

async fn run_sentiment_batch(ctx: &JobContext) {
    let Some(analyzer) = ctx.sentiment.as_ref() else {
        return;
    };
    match callpilot_sentiment::run_sentiment_batch(&ctx.pool, analyzer, ctx.sentiment_batch_size)
        .await
    {
        Ok(report) if report.pending == 0 => {
            tracing::debug!("scheduler: no calls pending sentiment");
        }
        Ok(report) => tracing::info!(
            pending = report.pending,
            analyzed = report.analyzed,
            failed = report.failed,
            "scheduler: sentiment batch complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: sentiment batch failed"),
    }
}
