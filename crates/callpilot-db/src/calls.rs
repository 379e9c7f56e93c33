//! Database operations for `calls` and `call_sentiments`.
//!
//! Call rows are written by the voice platform's webhook ingestion; this
//! module only reads them and attaches one sentiment row per call.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use callpilot_core::SentimentLabel;

use crate::DbError;

/// A completed call with a transcript and no sentiment row yet.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingSentimentCall {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub transcript: String,
    pub started_at: DateTime<Utc>,
    /// Failed analyses so far.
    pub sentiment_attempts: i32,
}

/// A row from the `call_sentiments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CallSentimentRow {
    pub call_id: Uuid,
    pub tenant_id: Uuid,
    pub sentiment_score: i32,
    pub sentiment_label: String,
    pub key_topics: Json<Vec<String>>,
    pub model: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Values for a new `call_sentiments` row.
#[derive(Debug, Clone)]
pub struct NewCallSentiment<'a> {
    pub call_id: Uuid,
    pub tenant_id: Uuid,
    pub sentiment_score: i32,
    pub sentiment_label: SentimentLabel,
    pub key_topics: &'a [String],
    pub model: &'a str,
}

/// List ended calls with a non-empty transcript that have not been analyzed.
///
/// Calls that already failed `max_attempts` times are left out. The rest
/// are ordered by failed attempts, then oldest first, so calls that keep
/// failing never starve calls that have not been tried yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_calls_pending_sentiment(
    pool: &PgPool,
    limit: i64,
    max_attempts: i32,
) -> Result<Vec<PendingSentimentCall>, DbError> {
    let rows = sqlx::query_as::<_, PendingSentimentCall>(
        "SELECT c.id, c.tenant_id, c.transcript, c.started_at, c.sentiment_attempts \
         FROM calls c \
         LEFT JOIN call_sentiments s ON s.call_id = c.id \
         WHERE s.call_id IS NULL \
           AND c.ended_at IS NOT NULL \
           AND c.transcript IS NOT NULL \
           AND BTRIM(c.transcript) <> '' \
           AND c.sentiment_attempts < $2 \
         ORDER BY c.sentiment_attempts, c.started_at, c.id \
         LIMIT $1",
    )
    .bind(limit)
    .bind(max_attempts)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count one failed analysis for a call and return its new attempt total.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the call does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_sentiment_failure(
    pool: &PgPool,
    call_id: Uuid,
    attempted_at: DateTime<Utc>,
) -> Result<i32, DbError> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE calls \
         SET sentiment_attempts = sentiment_attempts + 1, \
             sentiment_last_attempt_at = $2 \
         WHERE id = $1 \
         RETURNING sentiment_attempts",
    )
    .bind(call_id)
    .bind(attempted_at)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Insert a sentiment row for a call.
///
/// Returns `true` if a row was written, `false` if the call already had one
/// (a concurrent batch got there first).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_call_sentiment(
    pool: &PgPool,
    sentiment: &NewCallSentiment<'_>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO call_sentiments \
             (call_id, tenant_id, sentiment_score, sentiment_label, key_topics, model) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (call_id) DO NOTHING",
    )
    .bind(sentiment.call_id)
    .bind(sentiment.tenant_id)
    .bind(sentiment.sentiment_score)
    .bind(sentiment.sentiment_label.as_str())
    .bind(Json(sentiment.key_topics))
    .bind(sentiment.model)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetch the sentiment row for a call, or `None` if it has not been analyzed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_call_sentiment(
    pool: &PgPool,
    call_id: Uuid,
) -> Result<Option<CallSentimentRow>, DbError> {
    let row = sqlx::query_as::<_, CallSentimentRow>(
        "SELECT call_id, tenant_id, sentiment_score, sentiment_label, key_topics, \
                model, analyzed_at \
         FROM call_sentiments \
         WHERE call_id = $1",
    )
    .bind(call_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
