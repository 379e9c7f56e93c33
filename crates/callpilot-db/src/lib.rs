//! Postgres access for callpilot.
//!
//! One module per table group. Every query is a runtime `sqlx` query over a
//! shared [`PgPool`]; rollups and sequence reservations are single atomic
//! statements so concurrent callers never observe partial state.

pub mod analytics;
pub mod appointments;
pub mod calendar_connections;
pub mod calls;
pub mod knowledge;
pub mod tenants;

use std::collections::HashSet;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub use analytics::{
    get_daily_summary, list_assistant_performance, list_stale_daily_summaries,
    list_tenants_with_calls_on, refresh_assistant_performance, refresh_daily_summary,
    AssistantPerformanceRow, DailySummaryRow,
};
pub use appointments::{
    get_appointment_by_event_id, upsert_appointment, AppointmentRow, AppointmentUpsert,
    NewAppointment,
};
pub use calendar_connections::{
    get_calendar_connection, list_calendar_connections, mark_calendar_synced,
    update_calendar_access_token, CalendarConnectionRow,
};
pub use calls::{
    get_call_sentiment, insert_call_sentiment, list_calls_pending_sentiment,
    record_sentiment_failure, CallSentimentRow, NewCallSentiment, PendingSentimentCall,
};
pub use knowledge::{
    get_knowledge_meta, insert_knowledge_file, list_knowledge_files, record_knowledge_build,
    reserve_knowledge_sequences, upsert_knowledge_meta, KnowledgeFileRow, KnowledgeMetaRow,
    NewKnowledgeFile,
};
pub use tenants::{get_tenant, list_tenants, TenantRow};

// Relative to this crate's manifest: <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing. The server and the CLI each build exactly one pool from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &callpilot_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("invalid sequence reservation: count must be positive, got {0}")]
    InvalidSequenceCount(i32),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// # Errors
///
/// Returns [`sqlx::Error`] if no connection can be established within the
/// acquire timeout.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Apply every embedded migration the database has not seen yet.
///
/// Returns how many were newly applied by this call (zero when the schema
/// is already current).
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // A fresh database has no _sqlx_migrations table yet.
    let already_applied: HashSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .map(|versions| versions.into_iter().collect())
            .unwrap_or_default();

    MIGRATOR.run(pool).await?;

    Ok(MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration() && !already_applied.contains(&m.version))
        .count())
}

/// # Errors
///
/// Returns [`sqlx::Error`] if `SELECT 1` fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// [`ping`], with the failure wrapped as a [`DbError`] for API handlers.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the database does not answer.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await.map_err(DbError::from)
}
