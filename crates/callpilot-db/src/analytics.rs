//! Daily analytics rollups.
//!
//! Both refreshes are single `INSERT ... SELECT ... ON CONFLICT DO UPDATE`
//! statements over the raw `calls`, `call_sentiments`, and `appointments`
//! tables. Re-running a refresh for the same key with no new source data
//! rewrites identical values. Day boundaries are UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `daily_summaries` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DailySummaryRow {
    pub tenant_id: Uuid,
    pub summary_date: NaiveDate,
    pub total_calls: i32,
    pub successful_calls: i32,
    pub total_appointments: i32,
    pub avg_call_duration: Decimal,
    pub total_call_time_minutes: Decimal,
    pub sentiment_positive: i32,
    pub sentiment_neutral: i32,
    pub sentiment_negative: i32,
    pub avg_sentiment_score: Option<Decimal>,
    pub call_outcomes: Json<BTreeMap<String, i64>>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `assistant_daily_performance` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AssistantPerformanceRow {
    pub assistant_id: Uuid,
    pub perf_date: NaiveDate,
    pub tenant_id: Uuid,
    pub call_count: i32,
    pub appointment_count: i32,
    pub avg_duration: Decimal,
    pub avg_sentiment: Option<Decimal>,
    pub success_rate: Decimal,
    pub updated_at: DateTime<Utc>,
}

const DAILY_SUMMARY_COLUMNS: &str = "tenant_id, summary_date, total_calls, successful_calls, \
     total_appointments, avg_call_duration, total_call_time_minutes, sentiment_positive, \
     sentiment_neutral, sentiment_negative, avg_sentiment_score, call_outcomes, updated_at";

const ASSISTANT_PERFORMANCE_COLUMNS: &str = "assistant_id, perf_date, tenant_id, call_count, \
     appointment_count, avg_duration, avg_sentiment, success_rate, updated_at";

// ---------------------------------------------------------------------------
// Refresh operations
// ---------------------------------------------------------------------------

/// Recompute the daily summary for `(tenant_id, date)` and upsert it.
///
/// Calls count toward the day they started; appointments toward the day they
/// were booked. A missing or blank call outcome is bucketed as `unknown`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn refresh_daily_summary(
    pool: &PgPool,
    tenant_id: Uuid,
    date: NaiveDate,
) -> Result<DailySummaryRow, DbError> {
    let sql = format!(
        "WITH bounds AS ( \
             SELECT ($2::date)::timestamp AT TIME ZONE 'UTC'       AS day_start, \
                    ($2::date + 1)::timestamp AT TIME ZONE 'UTC'   AS day_end \
         ), \
         day_calls AS ( \
             SELECT c.id, c.duration_seconds, c.successful, \
                    COALESCE(NULLIF(BTRIM(c.outcome), ''), 'unknown') AS outcome \
             FROM calls c, bounds b \
             WHERE c.tenant_id = $1 \
               AND c.started_at >= b.day_start \
               AND c.started_at <  b.day_end \
         ), \
         call_stats AS ( \
             SELECT COUNT(*)::int                                              AS total_calls, \
                    (COUNT(*) FILTER (WHERE successful))::int                  AS successful_calls, \
                    ROUND(COALESCE(AVG(duration_seconds), 0), 2)               AS avg_call_duration, \
                    ROUND(COALESCE(SUM(duration_seconds), 0) / 60.0, 2)        AS total_call_time_minutes \
             FROM day_calls \
         ), \
         sentiment_stats AS ( \
             SELECT (COUNT(*) FILTER (WHERE s.sentiment_label = 'positive'))::int AS positive, \
                    (COUNT(*) FILTER (WHERE s.sentiment_label = 'neutral'))::int  AS neutral, \
                    (COUNT(*) FILTER (WHERE s.sentiment_label = 'negative'))::int AS negative, \
                    ROUND(AVG(s.sentiment_score), 2)                              AS avg_score \
             FROM day_calls d \
             JOIN call_sentiments s ON s.call_id = d.id \
         ), \
         outcome_stats AS ( \
             SELECT COALESCE(jsonb_object_agg(outcome, n), '{{}}'::jsonb) AS call_outcomes \
             FROM (SELECT outcome, COUNT(*) AS n FROM day_calls GROUP BY outcome) o \
         ), \
         appointment_stats AS ( \
             SELECT COUNT(*)::int AS total_appointments \
             FROM appointments a, bounds b \
             WHERE a.tenant_id = $1 \
               AND a.booked_at >= b.day_start \
               AND a.booked_at <  b.day_end \
         ) \
         INSERT INTO daily_summaries \
             (tenant_id, summary_date, total_calls, successful_calls, total_appointments, \
              avg_call_duration, total_call_time_minutes, sentiment_positive, \
              sentiment_neutral, sentiment_negative, avg_sentiment_score, call_outcomes) \
         SELECT $1, $2, cs.total_calls, cs.successful_calls, ap.total_appointments, \
                cs.avg_call_duration, cs.total_call_time_minutes, ss.positive, \
                ss.neutral, ss.negative, ss.avg_score, os.call_outcomes \
         FROM call_stats cs, sentiment_stats ss, outcome_stats os, appointment_stats ap \
         ON CONFLICT (tenant_id, summary_date) DO UPDATE SET \
             total_calls             = EXCLUDED.total_calls, \
             successful_calls        = EXCLUDED.successful_calls, \
             total_appointments      = EXCLUDED.total_appointments, \
             avg_call_duration       = EXCLUDED.avg_call_duration, \
             total_call_time_minutes = EXCLUDED.total_call_time_minutes, \
             sentiment_positive      = EXCLUDED.sentiment_positive, \
             sentiment_neutral       = EXCLUDED.sentiment_neutral, \
             sentiment_negative      = EXCLUDED.sentiment_negative, \
             avg_sentiment_score     = EXCLUDED.avg_sentiment_score, \
             call_outcomes           = EXCLUDED.call_outcomes, \
             updated_at              = NOW() \
         RETURNING {DAILY_SUMMARY_COLUMNS}"
    );

    let row = sqlx::query_as::<_, DailySummaryRow>(&sql)
        .bind(tenant_id)
        .bind(date)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Recompute per-assistant performance for every assistant of `tenant_id`
/// on `date` and upsert one row per assistant.
///
/// `success_rate` is a percentage in `[0, 100]`; it is `0` for an assistant
/// with no calls that day. `avg_sentiment` is `NULL` when none of the day's
/// calls has been analyzed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn refresh_assistant_performance(
    pool: &PgPool,
    tenant_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<AssistantPerformanceRow>, DbError> {
    let sql = format!(
        "WITH bounds AS ( \
             SELECT ($2::date)::timestamp AT TIME ZONE 'UTC'       AS day_start, \
                    ($2::date + 1)::timestamp AT TIME ZONE 'UTC'   AS day_end \
         ) \
         INSERT INTO assistant_daily_performance \
             (assistant_id, perf_date, tenant_id, call_count, appointment_count, \
              avg_duration, avg_sentiment, success_rate) \
         SELECT a.id, $2, $1, cs.call_count, ap.appointment_count, \
                cs.avg_duration, cs.avg_sentiment, cs.success_rate \
         FROM assistants a \
         CROSS JOIN bounds b \
         CROSS JOIN LATERAL ( \
             SELECT COUNT(*)::int                                  AS call_count, \
                    ROUND(COALESCE(AVG(c.duration_seconds), 0), 2) AS avg_duration, \
                    ROUND(AVG(s.sentiment_score), 2)               AS avg_sentiment, \
                    ROUND(COALESCE( \
                        100.0 * COUNT(*) FILTER (WHERE c.successful) / NULLIF(COUNT(*), 0), \
                        0), 2)                                     AS success_rate \
             FROM calls c \
             LEFT JOIN call_sentiments s ON s.call_id = c.id \
             WHERE c.assistant_id = a.id \
               AND c.started_at >= b.day_start \
               AND c.started_at <  b.day_end \
         ) cs \
         CROSS JOIN LATERAL ( \
             SELECT COUNT(*)::int AS appointment_count \
             FROM appointments appt \
             WHERE appt.assistant_id = a.id \
               AND appt.booked_at >= b.day_start \
               AND appt.booked_at <  b.day_end \
         ) ap \
         WHERE a.tenant_id = $1 \
         ON CONFLICT (assistant_id, perf_date) DO UPDATE SET \
             tenant_id         = EXCLUDED.tenant_id, \
             call_count        = EXCLUDED.call_count, \
             appointment_count = EXCLUDED.appointment_count, \
             avg_duration      = EXCLUDED.avg_duration, \
             avg_sentiment     = EXCLUDED.avg_sentiment, \
             success_rate      = EXCLUDED.success_rate, \
             updated_at        = NOW() \
         RETURNING {ASSISTANT_PERFORMANCE_COLUMNS}"
    );

    let mut rows = sqlx::query_as::<_, AssistantPerformanceRow>(&sql)
        .bind(tenant_id)
        .bind(date)
        .fetch_all(pool)
        .await?;
    rows.sort_by_key(|r| r.assistant_id);

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Read operations
// ---------------------------------------------------------------------------

/// Tenants with at least one call that started on `date` (UTC).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tenants_with_calls_on(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Vec<Uuid>, DbError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT tenant_id \
         FROM calls \
         WHERE started_at >= ($1::date)::timestamp AT TIME ZONE 'UTC' \
           AND started_at <  ($1::date + 1)::timestamp AT TIME ZONE 'UTC' \
         ORDER BY tenant_id",
    )
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// `(tenant_id, date)` pairs on or after `since` whose stored summary was
/// computed before one of that day's calls was scored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_daily_summaries(
    pool: &PgPool,
    since: NaiveDate,
) -> Result<Vec<(Uuid, NaiveDate)>, DbError> {
    let rows = sqlx::query_as::<_, (Uuid, NaiveDate)>(
        "SELECT DISTINCT ds.tenant_id, ds.summary_date \
         FROM daily_summaries ds \
         JOIN calls c \
           ON c.tenant_id = ds.tenant_id \
          AND c.started_at >= (ds.summary_date)::timestamp AT TIME ZONE 'UTC' \
          AND c.started_at <  (ds.summary_date + 1)::timestamp AT TIME ZONE 'UTC' \
         JOIN call_sentiments s ON s.call_id = c.id \
         WHERE ds.summary_date >= $1 \
           AND s.analyzed_at > ds.updated_at \
         ORDER BY ds.summary_date, ds.tenant_id",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch the stored daily summary for `(tenant_id, date)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_daily_summary(
    pool: &PgPool,
    tenant_id: Uuid,
    date: NaiveDate,
) -> Result<Option<DailySummaryRow>, DbError> {
    let sql = format!(
        "SELECT {DAILY_SUMMARY_COLUMNS} \
         FROM daily_summaries \
         WHERE tenant_id = $1 AND summary_date = $2"
    );

    let row = sqlx::query_as::<_, DailySummaryRow>(&sql)
        .bind(tenant_id)
        .bind(date)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// List stored per-assistant rows for a tenant on `date`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_assistant_performance(
    pool: &PgPool,
    tenant_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<AssistantPerformanceRow>, DbError> {
    let sql = format!(
        "SELECT {ASSISTANT_PERFORMANCE_COLUMNS} \
         FROM assistant_daily_performance \
         WHERE tenant_id = $1 AND perf_date = $2 \
         ORDER BY assistant_id"
    );

    let rows = sqlx::query_as::<_, AssistantPerformanceRow>(&sql)
        .bind(tenant_id)
        .bind(date)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
