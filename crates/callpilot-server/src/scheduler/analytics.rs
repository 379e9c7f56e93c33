//! Hourly daily-rollup refresh.
//!
//! Each run refreshes today's summaries for every tenant with calls today.
//! The first run after midnight UTC also closes out yesterday, so late calls
//! from the previous day are never left out of its final rollup. Any summary
//! from the last week that predates a sentiment score on one of its calls is
//! refreshed too, so scores written after a day was closed still land.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::JobContext;

/// How far back a late sentiment score still triggers a refresh.
const STALE_LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct RollupReport {
    pub refreshed: usize,
    pub failed: usize,
}

pub(super) async fn register_rollups(
    scheduler: &JobScheduler,
    ctx: Arc<JobContext>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let ctx = Arc::clone(&ctx);
        Box::pin(async move {
            tracing::info!("scheduler: starting analytics rollups");
            let report = run_rollups(&ctx.pool, Utc::now()).await;
            tracing::info!(
                refreshed = report.refreshed,
                failed = report.failed,
                "scheduler: analytics rollups complete"
            );
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered analytics rollups");
    Ok(())
}

fn rollup_dates(now: DateTime<Utc>) -> Vec<NaiveDate> {
    let today = now.date_naive();
    if now.hour() == 0 {
        vec![today - Duration::days(1), today]
    } else {
        vec![today]
    }
}

pub(super) async fn run_rollups(pool: &PgPool, now: DateTime<Utc>) -> RollupReport {
    let mut report = RollupReport::default();
    let mut targets = BTreeSet::new();

    for date in rollup_dates(now) {
        match callpilot_db::list_tenants_with_calls_on(pool, date).await {
            Ok(ids) => targets.extend(ids.into_iter().map(|tenant_id| (date, tenant_id))),
            Err(e) => {
                tracing::error!(%date, error = %e, "scheduler: failed to list tenants for rollup");
            }
        }
    }

    let since = now.date_naive() - Duration::days(STALE_LOOKBACK_DAYS);
    match callpilot_db::list_stale_daily_summaries(pool, since).await {
        Ok(stale) => {
            if !stale.is_empty() {
                tracing::info!(count = stale.len(), "scheduler: refreshing rescored summaries");
            }
            targets.extend(stale.into_iter().map(|(tenant_id, date)| (date, tenant_id)));
        }
        Err(e) => tracing::error!(error = %e, "scheduler: failed to list stale summaries"),
    }

    for (date, tenant_id) in targets {
        let result = async {
            callpilot_db::refresh_daily_summary(pool, tenant_id, date).await?;
            callpilot_db::refresh_assistant_performance(pool, tenant_id, date).await
        }
        .await;
        match result {
            Ok(_) => report.refreshed += 1,
            Err(e) => {
                report.failed += 1;
                tracing::error!(
                    %tenant_id,
                    %date,
                    error = %e,
                    "scheduler: rollup failed for tenant"
                );
            }
        }
    }

    report
}
