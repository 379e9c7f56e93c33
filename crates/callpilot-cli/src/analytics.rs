//! Analytics rollup command.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use uuid::Uuid;

/// Sub-commands available under `analytics`.
#[derive(Debug, Subcommand)]
pub enum AnalyticsCommands {
    /// Recompute daily summaries and per-assistant performance
    Rollup {
        /// Refresh a single tenant (defaults to every tenant with calls that day)
        #[arg(long)]
        tenant: Option<Uuid>,
        /// UTC date to refresh, as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

/// # Errors
///
/// Returns an error if the tenant list cannot be loaded. Per-tenant failures
/// are logged; the command fails after the loop if any occurred.
pub(crate) async fn run_rollup(
    pool: &sqlx::PgPool,
    tenant: Option<Uuid>,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let tenants = match tenant {
        Some(id) => vec![id],
        None => callpilot_db::list_tenants_with_calls_on(pool, date).await?,
    };

    if tenants.is_empty() {
        println!("no calls on {date}; nothing to roll up");
        return Ok(());
    }

    println!("{:<38}{:<8}{:<10}{:<8}ASSISTANTS", "TENANT", "CALLS", "SUCCESS", "APPTS");
    let mut failed = 0_usize;
    for tenant_id in tenants {
        let result = async {
            let summary = callpilot_db::refresh_daily_summary(pool, tenant_id, date).await?;
            let assistants =
                callpilot_db::refresh_assistant_performance(pool, tenant_id, date).await?;
            Ok::<_, callpilot_db::DbError>((summary, assistants.len()))
        }
        .await;

        match result {
            Ok((summary, assistants)) => println!(
                "{:<38}{:<8}{:<10}{:<8}{}",
                tenant_id,
                summary.total_calls,
                summary.successful_calls,
                summary.total_appointments,
                assistants
            ),
            Err(e) => {
                failed += 1;
                tracing::error!(%tenant_id, %date, error = %e, "rollup failed for tenant");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} tenant rollup(s) failed for {date}");
    }
    Ok(())
}
