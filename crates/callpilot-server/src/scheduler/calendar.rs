//! Calendar appointment sync: one run after a warm-up delay, then every
//! interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::JobContext;

/// Register the warm-up job. When it fires it runs one sync and then adds
/// the repeating job to the same scheduler.
pub(super) async fn register_calendar_sync(
    scheduler: &JobScheduler,
    ctx: Arc<JobContext>,
    warmup: Duration,
    interval: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_one_shot_async(warmup, move |_uuid, scheduler| {
        let ctx = Arc::clone(&ctx);

        Box::pin(async move {
            run_calendar_sync(&ctx).await;

            let repeating = match repeating_job(Arc::clone(&ctx), interval) {
                Ok(job) => job,
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: failed to build calendar sync job");
                    return;
                }
            };
            match scheduler.add(repeating).await {
                Ok(_) => tracing::info!(
                    interval_secs = interval.as_secs(),
                    "scheduler: registered repeating calendar sync"
                ),
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: failed to add calendar sync job");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(
        warmup_secs = warmup.as_secs(),
        "scheduler: registered calendar sync warm-up"
    );
    Ok(())
}

fn repeating_job(ctx: Arc<JobContext>, interval: Duration) -> Result<Job, JobSchedulerError> {
    Job::new_repeated_async(interval, move |_uuid, _lock| {
        let ctx = Arc::clone(&ctx);
        Box::pin(async move {
            run_calendar_sync(&ctx).await;
        })
    })
}

async fn run_calendar_sync(ctx: &JobContext) {
    tracing::info!("scheduler: starting calendar sync");
    match callpilot_calendar::sync_all_tenants(&ctx.pool, &ctx.calendar, Utc::now()).await {
        Ok(report) => tracing::info!(
            tenants = report.tenants,
            failed = report.failed,
            "scheduler: calendar sync complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: calendar sync failed"),
    }
}
