//! Per-tenant appointment sync.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use callpilot_db::{AppointmentUpsert, CalendarConnectionRow};

use crate::client::CalendarClient;
use crate::error::CalendarError;
use crate::parse::appointment_from_event;

/// Tokens that expire within this many seconds are refreshed up front.
const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;
const LOOKBACK_DAYS: i64 = 1;
const LOOKAHEAD_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TenantSyncReport {
    pub events_seen: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Cancelled, all-day, or id-less events.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalendarSyncReport {
    pub tenants: usize,
    pub synced: usize,
    pub failed: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Mirror one tenant's calendar events in `[now - 1d, now + 30d]` into
/// `appointments`.
///
/// An expired (or about to expire) access token is refreshed first when the
/// connection has a refresh token and the client has OAuth credentials; the
/// new token is persisted before events are listed.
///
/// # Errors
///
/// - [`CalendarError::TokenExpired`] if the token is expired and cannot be
///   refreshed.
/// - [`CalendarError::Unauthorized`] if the provider rejects the token.
/// - Any HTTP or database error from the listing or the upserts.
pub async fn sync_tenant(
    pool: &PgPool,
    client: &CalendarClient,
    connection: &CalendarConnectionRow,
    now: DateTime<Utc>,
) -> Result<TenantSyncReport, CalendarError> {
    let tenant_id = connection.tenant_id;
    let access_token = current_access_token(pool, client, connection, now).await?;

    let events = client
        .list_events(
            &access_token,
            &connection.calendar_id,
            now - Duration::days(LOOKBACK_DAYS),
            now + Duration::days(LOOKAHEAD_DAYS),
        )
        .await
        .map_err(|e| match e {
            CalendarError::UnexpectedStatus { status: 401, .. } => {
                CalendarError::Unauthorized { tenant_id }
            }
            other => other,
        })?;

    let mut report = TenantSyncReport {
        events_seen: events.len(),
        ..TenantSyncReport::default()
    };
    for event in &events {
        let Some(appointment) =
            appointment_from_event(tenant_id, connection.assistant_id, event, now)
        else {
            report.skipped += 1;
            continue;
        };
        match callpilot_db::upsert_appointment(pool, &appointment).await? {
            AppointmentUpsert::Inserted => report.inserted += 1,
            AppointmentUpsert::Updated => report.updated += 1,
        }
    }

    callpilot_db::mark_calendar_synced(pool, tenant_id, now).await?;

    tracing::info!(
        %tenant_id,
        events = report.events_seen,
        inserted = report.inserted,
        updated = report.updated,
        skipped = report.skipped,
        "calendar: tenant synced"
    );
    Ok(report)
}

async fn current_access_token(
    pool: &PgPool,
    client: &CalendarClient,
    connection: &CalendarConnectionRow,
    now: DateTime<Utc>,
) -> Result<String, CalendarError> {
    let tenant_id = connection.tenant_id;
    if !connection.token_expired(now + Duration::seconds(TOKEN_EXPIRY_SKEW_SECS)) {
        return Ok(connection.access_token.clone());
    }

    let Some(refresh_token) = connection.refresh_token.as_deref() else {
        return Err(CalendarError::TokenExpired { tenant_id });
    };
    let Some(refreshed) = client.refresh_access_token(refresh_token, now).await? else {
        return Err(CalendarError::TokenExpired { tenant_id });
    };

    callpilot_db::update_calendar_access_token(
        pool,
        tenant_id,
        &refreshed.access_token,
        refreshed.expires_at,
    )
    .await?;
    tracing::debug!(
        %tenant_id,
        expires_at = %refreshed.expires_at,
        "calendar: access token refreshed"
    );
    Ok(refreshed.access_token)
}

/// Sync every connected tenant, one at a time.
///
/// A failing tenant is logged and counted; it never stops the loop.
///
/// # Errors
///
/// Returns [`CalendarError::Db`] only if the connection list itself cannot
/// be loaded.
pub async fn sync_all_tenants(
    pool: &PgPool,
    client: &CalendarClient,
    now: DateTime<Utc>,
) -> Result<CalendarSyncReport, CalendarError> {
    let connections = callpilot_db::list_calendar_connections(pool).await?;
    let mut report = CalendarSyncReport {
        tenants: connections.len(),
        ..CalendarSyncReport::default()
    };

    for connection in &connections {
        match sync_tenant(pool, client, connection, now).await {
            Ok(tenant) => {
                report.synced += 1;
                report.inserted += tenant.inserted;
                report.updated += tenant.updated;
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(
                    tenant_id = %connection.tenant_id,
                    error = %e,
                    "calendar: tenant sync failed"
                );
            }
        }
    }

    tracing::info!(
        tenants = report.tenants,
        synced = report.synced,
        failed = report.failed,
        inserted = report.inserted,
        updated = report.updated,
        "calendar: sync pass finished"
    );
    Ok(report)
}
