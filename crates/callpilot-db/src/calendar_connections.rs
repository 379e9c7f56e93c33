//! Database operations for the `calendar_connections` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A tenant's linked calendar and its OAuth tokens.
#[derive(Clone, sqlx::FromRow)]
pub struct CalendarConnectionRow {
    pub tenant_id: Uuid,
    pub assistant_id: Option<Uuid>,
    pub calendar_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for CalendarConnectionRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarConnectionRow")
            .field("tenant_id", &self.tenant_id)
            .field("assistant_id", &self.assistant_id)
            .field("calendar_id", &self.calendar_id)
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("token_expires_at", &self.token_expires_at)
            .field("last_synced_at", &self.last_synced_at)
            .finish_non_exhaustive()
    }
}

impl CalendarConnectionRow {
    /// `true` when the access token has a known expiry at or before `now`.
    #[must_use]
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|exp| exp <= now)
    }
}

/// List every calendar connection.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_calendar_connections(
    pool: &PgPool,
) -> Result<Vec<CalendarConnectionRow>, DbError> {
    let rows = sqlx::query_as::<_, CalendarConnectionRow>(
        "SELECT tenant_id, assistant_id, calendar_id, access_token, refresh_token, \
                token_expires_at, last_synced_at, updated_at \
         FROM calendar_connections \
         ORDER BY tenant_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch the calendar connection for a tenant.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_calendar_connection(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Option<CalendarConnectionRow>, DbError> {
    let row = sqlx::query_as::<_, CalendarConnectionRow>(
        "SELECT tenant_id, assistant_id, calendar_id, access_token, refresh_token, \
                token_expires_at, last_synced_at, updated_at \
         FROM calendar_connections \
         WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Store a refreshed access token and its expiry.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the tenant has no connection, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_calendar_access_token(
    pool: &PgPool,
    tenant_id: Uuid,
    access_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE calendar_connections \
         SET access_token = $2, token_expires_at = $3, updated_at = NOW() \
         WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .bind(access_token)
    .bind(expires_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Record that a sync pass for the tenant completed at `synced_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the tenant has no connection, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_calendar_synced(
    pool: &PgPool,
    tenant_id: Uuid,
    synced_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE calendar_connections \
         SET last_synced_at = $2, updated_at = NOW() \
         WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .bind(synced_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
