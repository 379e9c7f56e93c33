//! Calendar sync command.

use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

use callpilot_calendar::CalendarClient;

/// Sub-commands available under `calendar`.
#[derive(Debug, Subcommand)]
pub enum CalendarCommands {
    /// Mirror calendar events into appointments
    Sync {
        /// Sync a single tenant instead of every connected one
        #[arg(long)]
        tenant: Option<Uuid>,
    },
}

/// # Errors
///
/// Returns an error if the client cannot be built, the named tenant has no
/// calendar connection, or that tenant's sync fails. In the all-tenants mode
/// only the connection listing can fail the command.
pub(crate) async fn run_calendar_sync(
    pool: &sqlx::PgPool,
    config: &callpilot_core::AppConfig,
    tenant: Option<Uuid>,
) -> anyhow::Result<()> {
    let client = CalendarClient::from_app_config(config)?;
    let now = Utc::now();

    if let Some(tenant_id) = tenant {
        let connection = callpilot_db::get_calendar_connection(pool, tenant_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("tenant {tenant_id} has no calendar connection"))?;
        let report = callpilot_calendar::sync_tenant(pool, &client, &connection, now).await?;
        println!(
            "events: {}  inserted: {}  updated: {}  skipped: {}",
            report.events_seen, report.inserted, report.updated, report.skipped
        );
        return Ok(());
    }

    let report = callpilot_calendar::sync_all_tenants(pool, &client, now).await?;
    println!(
        "tenants: {}  synced: {}  failed: {}  inserted: {}  updated: {}",
        report.tenants, report.synced, report.failed, report.inserted, report.updated
    );
    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "some tenants failed to sync; see log above");
    }
    Ok(())
}
