//! Live integration tests for callpilot-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/callpilot-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use callpilot_core::SentimentLabel;
use callpilot_db::{
    get_appointment_by_event_id, get_call_sentiment, get_calendar_connection, get_daily_summary,
    get_knowledge_meta, insert_call_sentiment, insert_knowledge_file, list_assistant_performance,
    list_calls_pending_sentiment, list_knowledge_files, list_tenants_with_calls_on,
    mark_calendar_synced, record_knowledge_build, record_sentiment_failure,
    refresh_assistant_performance, refresh_daily_summary, reserve_knowledge_sequences,
    update_calendar_access_token, upsert_appointment, upsert_knowledge_meta, AppointmentUpsert,
    DbError, NewAppointment, NewCallSentiment, NewKnowledgeFile,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_test_tenant(pool: &sqlx::PgPool, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO tenants (id, business_name, website_url) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(format!("https://{}.example", name.to_lowercase().replace(' ', "-")))
        .execute(pool)
        .await
        .unwrap_or_else(|e| panic!("insert_test_tenant failed for '{name}': {e}"));
    id
}

async fn insert_test_assistant(pool: &sqlx::PgPool, tenant_id: Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO assistants (id, tenant_id, name) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(tenant_id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap_or_else(|e| panic!("insert_test_assistant failed for '{name}': {e}"));
    id
}

struct TestCall<'a> {
    assistant_id: Option<Uuid>,
    started_at: DateTime<Utc>,
    duration_seconds: i32,
    outcome: Option<&'a str>,
    successful: bool,
    transcript: Option<&'a str>,
}

async fn insert_test_call(pool: &sqlx::PgPool, tenant_id: Uuid, call: &TestCall<'_>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO calls \
             (id, tenant_id, assistant_id, started_at, ended_at, duration_seconds, \
              outcome, successful, transcript) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(id)
    .bind(tenant_id)
    .bind(call.assistant_id)
    .bind(call.started_at)
    .bind(call.started_at + Duration::seconds(i64::from(call.duration_seconds)))
    .bind(call.duration_seconds)
    .bind(call.outcome)
    .bind(call.successful)
    .bind(call.transcript)
    .execute(pool)
    .await
    .expect("insert_test_call failed");
    id
}

async fn insert_test_sentiment(pool: &sqlx::PgPool, tenant_id: Uuid, call_id: Uuid, score: i32) {
    let topics = vec!["booking".to_string()];
    let inserted = insert_call_sentiment(
        pool,
        &NewCallSentiment {
            call_id,
            tenant_id,
            sentiment_score: score,
            sentiment_label: SentimentLabel::from_score(score),
            key_topics: &topics,
            model: "test-model",
        },
    )
    .await
    .expect("insert_call_sentiment failed");
    assert!(inserted);
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).expect("valid hour"))
}

fn sample_appointment(tenant_id: Uuid, event_id: &str, booked_at: DateTime<Utc>) -> NewAppointment {
    NewAppointment {
        tenant_id,
        assistant_id: None,
        calendar_event_id: event_id.to_string(),
        start_time: booked_at + Duration::days(2),
        end_time: booked_at + Duration::days(2) + Duration::minutes(30),
        summary: Some("Cleaning - Jane Doe".to_string()),
        description: Some("Email: jane@example.com\nPhone: 555-0100".to_string()),
        email: Some("jane@example.com".to_string()),
        phone: Some("555-0100".to_string()),
        service: Some("Cleaning".to_string()),
        patient_type: Some("new".to_string()),
        booked_at,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Knowledge sequence allocation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn sequence_reservation_starts_at_one(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Bright Smiles").await;

    let first = reserve_knowledge_sequences(&pool, tenant, "Bright Smiles", 3)
        .await
        .expect("reserve failed");
    assert_eq!(first, 1);

    let next = reserve_knowledge_sequences(&pool, tenant, "Bright Smiles", 2)
        .await
        .expect("reserve failed");
    assert_eq!(next, 4, "second block continues after the first");
}

#[sqlx::test(migrations = "../../migrations")]
async fn sequence_reservation_continues_from_persisted_max(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Oak Dental").await;
    let urls = vec!["https://oak.example/".to_string()];

    // Rows written before the counter row existed.
    for seq in [1, 2, 7] {
        let name = format!("oak-dental-knowledge-{seq:03}.txt");
        insert_knowledge_file(
            &pool,
            &NewKnowledgeFile {
                tenant_id: tenant,
                business_name: "Oak Dental",
                sequence_number: seq,
                external_file_id: Some("file-x"),
                file_name: &name,
                byte_size: 10,
                content_sha256: "abc",
                source_urls: &urls,
            },
        )
        .await
        .expect("insert_knowledge_file failed");
    }

    let first = reserve_knowledge_sequences(&pool, tenant, "Oak Dental", 2)
        .await
        .expect("reserve failed");
    assert_eq!(first, 8);
}

#[sqlx::test(migrations = "../../migrations")]
async fn sequence_reservations_never_overlap_under_concurrency(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Parallel Clinic").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            reserve_knowledge_sequences(&pool, tenant, "Parallel Clinic", 3)
                .await
                .expect("reserve failed")
        }));
    }

    let mut seen = Vec::new();
    for handle in handles {
        let first = handle.await.expect("task panicked");
        seen.extend(first..first + 3);
    }
    seen.sort_unstable();
    let expected: Vec<i32> = (1..=24).collect();
    assert_eq!(seen, expected, "every number handed out exactly once");
}

#[sqlx::test(migrations = "../../migrations")]
async fn sequence_reservation_is_scoped_per_business(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Two Brands").await;

    let a = reserve_knowledge_sequences(&pool, tenant, "Brand A", 5)
        .await
        .expect("reserve failed");
    let b = reserve_knowledge_sequences(&pool, tenant, "Brand B", 1)
        .await
        .expect("reserve failed");
    assert_eq!(a, 1);
    assert_eq!(b, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn sequence_reservation_rejects_non_positive_count(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Zero").await;
    let err = reserve_knowledge_sequences(&pool, tenant, "Zero", 0)
        .await
        .expect_err("zero count must fail");
    assert!(matches!(err, DbError::InvalidSequenceCount(0)));
}

// ---------------------------------------------------------------------------
// Section 2: Knowledge files and meta
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn knowledge_files_keep_null_external_id(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Audit Co").await;
    let urls = vec![
        "https://audit.example/".to_string(),
        "https://audit.example/about".to_string(),
    ];

    insert_knowledge_file(
        &pool,
        &NewKnowledgeFile {
            tenant_id: tenant,
            business_name: "Audit Co",
            sequence_number: 1,
            external_file_id: None,
            file_name: "audit-co-knowledge-001.txt",
            byte_size: 2048,
            content_sha256: "deadbeef",
            source_urls: &urls,
        },
    )
    .await
    .expect("insert_knowledge_file failed");

    let files = list_knowledge_files(&pool, tenant)
        .await
        .expect("list_knowledge_files failed");
    assert_eq!(files.len(), 1);
    assert!(files[0].external_file_id.is_none());
    assert_eq!(files[0].source_urls.0, urls);
}

#[sqlx::test(migrations = "../../migrations")]
async fn knowledge_meta_is_overwritten_not_accumulated(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Meta Co").await;

    upsert_knowledge_meta(&pool, tenant, 3, 600_000, 18)
        .await
        .expect("first upsert failed");
    let meta = upsert_knowledge_meta(&pool, tenant, 1, 90_000, 6)
        .await
        .expect("second upsert failed");

    assert_eq!(meta.total_files, 1);
    assert_eq!(meta.total_content_size, 90_000);
    assert_eq!(meta.pages_scraped, 6);

    let fetched = get_knowledge_meta(&pool, tenant)
        .await
        .expect("get_knowledge_meta failed")
        .expect("meta row should exist");
    assert_eq!(fetched.total_files, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn knowledge_build_is_recorded_all_or_nothing(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Batch Co").await;
    let urls = vec!["https://batch.example/".to_string()];
    let file = |seq: i32, name: &'static str| NewKnowledgeFile {
        tenant_id: tenant,
        business_name: "Batch Co",
        sequence_number: seq,
        external_file_id: Some("file-x"),
        file_name: name,
        byte_size: 500,
        content_sha256: "abc",
        source_urls: &urls,
    };

    let meta = record_knowledge_build(
        &pool,
        tenant,
        &[file(1, "batch-co-knowledge-001.txt"), file(2, "batch-co-knowledge-002.txt")],
        4,
    )
    .await
    .expect("record_knowledge_build failed");
    assert_eq!(meta.total_files, 2);
    assert_eq!(meta.total_content_size, 1000);
    assert_eq!(meta.pages_scraped, 4);

    // The duplicate sequence fails the batch after the first row went in.
    let err = record_knowledge_build(
        &pool,
        tenant,
        &[file(3, "batch-co-knowledge-003.txt"), file(2, "batch-co-knowledge-002.txt")],
        9,
    )
    .await
    .expect_err("duplicate sequence must fail");
    assert!(matches!(err, DbError::Sqlx(_)));

    let files = list_knowledge_files(&pool, tenant)
        .await
        .expect("list_knowledge_files failed");
    let seqs: Vec<i32> = files.iter().map(|f| f.sequence_number).collect();
    assert_eq!(seqs, [1, 2]);
    let meta = get_knowledge_meta(&pool, tenant)
        .await
        .expect("get_knowledge_meta failed")
        .expect("meta row should exist");
    assert_eq!(meta.pages_scraped, 4, "failed batch must not touch the summary");
}

// ---------------------------------------------------------------------------
// Section 3: Call sentiment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn pending_sentiment_skips_analyzed_and_empty_transcripts(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Pending").await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");

    let with_transcript = insert_test_call(
        &pool,
        tenant,
        &TestCall {
            assistant_id: None,
            started_at: at(day, 9),
            duration_seconds: 60,
            outcome: None,
            successful: false,
            transcript: Some("Caller: hi, I'd like to book a cleaning."),
        },
    )
    .await;
    let analyzed = insert_test_call(
        &pool,
        tenant,
        &TestCall {
            assistant_id: None,
            started_at: at(day, 10),
            duration_seconds: 60,
            outcome: None,
            successful: false,
            transcript: Some("Caller: thanks!"),
        },
    )
    .await;
    insert_test_call(
        &pool,
        tenant,
        &TestCall {
            assistant_id: None,
            started_at: at(day, 11),
            duration_seconds: 0,
            outcome: None,
            successful: false,
            transcript: Some("   "),
        },
    )
    .await;
    insert_test_sentiment(&pool, tenant, analyzed, 80).await;

    let pending = list_calls_pending_sentiment(&pool, 50, 5)
        .await
        .expect("list_calls_pending_sentiment failed");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, with_transcript);
    assert_eq!(pending[0].sentiment_attempts, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_sentiment_calls_queue_behind_untried_ones_until_capped(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Queue").await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date");
    let call_at = |hour| TestCall {
        assistant_id: None,
        started_at: at(day, hour),
        duration_seconds: 60,
        outcome: None,
        successful: false,
        transcript: Some("Caller: can I move my appointment?"),
    };
    let older = insert_test_call(&pool, tenant, &call_at(9)).await;
    let newer = insert_test_call(&pool, tenant, &call_at(10)).await;

    let attempts = record_sentiment_failure(&pool, older, at(day, 12))
        .await
        .expect("record_sentiment_failure failed");
    assert_eq!(attempts, 1);

    let pending = list_calls_pending_sentiment(&pool, 1, 3)
        .await
        .expect("list_calls_pending_sentiment failed");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, newer, "untried call goes first");

    for hour in 13..15 {
        record_sentiment_failure(&pool, older, at(day, hour))
            .await
            .expect("record_sentiment_failure failed");
    }
    let pending = list_calls_pending_sentiment(&pool, 50, 3)
        .await
        .expect("list_calls_pending_sentiment failed");
    let ids: Vec<Uuid> = pending.iter().map(|c| c.id).collect();
    assert_eq!(ids, [newer], "call at the attempt cap is no longer picked");

    let missing = record_sentiment_failure(&pool, Uuid::new_v4(), at(day, 15)).await;
    assert!(matches!(missing, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_sentiment_insert_is_ignored(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Dup").await;
    let call = insert_test_call(
        &pool,
        tenant,
        &TestCall {
            assistant_id: None,
            started_at: Utc::now(),
            duration_seconds: 30,
            outcome: None,
            successful: true,
            transcript: Some("hello there friend"),
        },
    )
    .await;
    insert_test_sentiment(&pool, tenant, call, 55).await;

    let topics: Vec<String> = vec![];
    let second = insert_call_sentiment(
        &pool,
        &NewCallSentiment {
            call_id: call,
            tenant_id: tenant,
            sentiment_score: 5,
            sentiment_label: SentimentLabel::Negative,
            key_topics: &topics,
            model: "other",
        },
    )
    .await
    .expect("insert_call_sentiment failed");
    assert!(!second);

    let row = get_call_sentiment(&pool, call)
        .await
        .expect("get_call_sentiment failed")
        .expect("row should exist");
    assert_eq!(row.sentiment_score, 55);
    assert_eq!(row.sentiment_label, "neutral");
}

// ---------------------------------------------------------------------------
// Section 4: Appointments and calendar connections
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn appointment_upsert_never_duplicates_event(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Calendar Co").await;
    let booked = Utc::now() - Duration::hours(3);
    let appt = sample_appointment(tenant, "evt-123", booked);

    let first = upsert_appointment(&pool, &appt)
        .await
        .expect("first upsert failed");
    assert_eq!(first, AppointmentUpsert::Inserted);
    let before = get_appointment_by_event_id(&pool, "evt-123")
        .await
        .expect("get failed")
        .expect("row should exist");

    let second = upsert_appointment(&pool, &appt)
        .await
        .expect("second upsert failed");
    assert_eq!(second, AppointmentUpsert::Updated);
    let after = get_appointment_by_event_id(&pool, "evt-123")
        .await
        .expect("get failed")
        .expect("row should exist");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE calendar_event_id = 'evt-123'")
            .fetch_one(&pool)
            .await
            .expect("count failed");
    assert_eq!(count, 1);

    assert_eq!(before.id, after.id);
    assert_eq!(before.summary, after.summary);
    assert_eq!(before.email, after.email);
    assert_eq!(before.start_time, after.start_time);
    assert_eq!(before.booked_at, after.booked_at);
    assert!(after.synced_at >= before.synced_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn appointment_upsert_applies_changed_fields(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Reschedule").await;
    let booked = Utc::now() - Duration::hours(1);
    let mut appt = sample_appointment(tenant, "evt-move", booked);
    upsert_appointment(&pool, &appt)
        .await
        .expect("first upsert failed");

    appt.start_time += Duration::hours(4);
    appt.end_time += Duration::hours(4);
    appt.service = Some("Whitening".to_string());
    upsert_appointment(&pool, &appt)
        .await
        .expect("second upsert failed");

    let row = get_appointment_by_event_id(&pool, "evt-move")
        .await
        .expect("get failed")
        .expect("row should exist");
    assert_eq!(row.start_time, appt.start_time);
    assert_eq!(row.service.as_deref(), Some("Whitening"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn calendar_connection_token_update_and_sync_mark(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Tokens").await;
    sqlx::query(
        "INSERT INTO calendar_connections (tenant_id, calendar_id, access_token, refresh_token) \
         VALUES ($1, 'primary', 'old-token', 'refresh')",
    )
    .bind(tenant)
    .execute(&pool)
    .await
    .expect("insert connection failed");

    let expires = Utc::now() + Duration::hours(1);
    update_calendar_access_token(&pool, tenant, "new-token", expires)
        .await
        .expect("token update failed");
    let synced = Utc::now();
    mark_calendar_synced(&pool, tenant, synced)
        .await
        .expect("mark synced failed");

    let conn = get_calendar_connection(&pool, tenant)
        .await
        .expect("get failed")
        .expect("connection should exist");
    assert_eq!(conn.access_token, "new-token");
    assert!(conn.last_synced_at.is_some());

    let missing = mark_calendar_synced(&pool, Uuid::new_v4(), synced).await;
    assert!(matches!(missing, Err(DbError::NotFound)));
}

// ---------------------------------------------------------------------------
// Section 5: Analytics rollups
// ---------------------------------------------------------------------------

/// Seed 10 calls on `day`: 4 successful, sentiments 3 positive / 2 neutral /
/// 1 negative, plus one call on the previous day that must not be counted.
async fn seed_analytics_day(pool: &sqlx::PgPool, tenant: Uuid, assistant: Uuid, day: NaiveDate) {
    let outcomes = [
        Some("booked"),
        Some("booked"),
        Some("booked"),
        Some("booked"),
        Some("voicemail"),
        Some("voicemail"),
        Some("hangup"),
        None,
        Some(""),
        Some("hangup"),
    ];
    let scores = [Some(90), Some(80), Some(75), Some(50), Some(45), Some(10)];

    for (i, outcome) in outcomes.iter().enumerate() {
        let idx = u32::try_from(i).expect("small index");
        let call = insert_test_call(
            pool,
            tenant,
            &TestCall {
                assistant_id: Some(assistant),
                started_at: at(day, 8 + idx),
                duration_seconds: 120,
                outcome: *outcome,
                successful: i < 4,
                transcript: Some("transcript"),
            },
        )
        .await;
        if let Some(Some(score)) = scores.get(i) {
            insert_test_sentiment(pool, tenant, call, *score).await;
        }
    }

    insert_test_call(
        pool,
        tenant,
        &TestCall {
            assistant_id: Some(assistant),
            started_at: at(day.pred_opt().expect("valid date"), 23),
            duration_seconds: 999,
            outcome: Some("booked"),
            successful: true,
            transcript: None,
        },
    )
    .await;
}

#[sqlx::test(migrations = "../../migrations")]
async fn daily_summary_aggregates_calls_and_sentiment(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Rollup Dental").await;
    let assistant = insert_test_assistant(&pool, tenant, "Front Desk").await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date");
    seed_analytics_day(&pool, tenant, assistant, day).await;

    let mut appt = sample_appointment(tenant, "evt-rollup", at(day, 12));
    appt.assistant_id = Some(assistant);
    upsert_appointment(&pool, &appt)
        .await
        .expect("upsert_appointment failed");

    let summary = refresh_daily_summary(&pool, tenant, day)
        .await
        .expect("refresh_daily_summary failed");

    assert_eq!(summary.total_calls, 10);
    assert_eq!(summary.successful_calls, 4);
    assert_eq!(summary.sentiment_positive, 3);
    assert_eq!(summary.sentiment_neutral, 2);
    assert_eq!(summary.sentiment_negative, 1);
    assert_eq!(summary.total_appointments, 1);
    assert_eq!(summary.avg_call_duration, Decimal::new(12000, 2));
    assert_eq!(summary.total_call_time_minutes, Decimal::new(2000, 2));
    // (90 + 80 + 75 + 50 + 45 + 10) / 6 = 58.33
    assert_eq!(summary.avg_sentiment_score, Some(Decimal::new(5833, 2)));

    let outcomes = &summary.call_outcomes.0;
    assert_eq!(outcomes.get("booked"), Some(&4));
    assert_eq!(outcomes.get("voicemail"), Some(&2));
    assert_eq!(outcomes.get("hangup"), Some(&2));
    assert_eq!(outcomes.get("unknown"), Some(&2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn daily_summary_refresh_is_idempotent(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Idempotent").await;
    let assistant = insert_test_assistant(&pool, tenant, "Desk").await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 11).expect("valid date");
    seed_analytics_day(&pool, tenant, assistant, day).await;

    let first = refresh_daily_summary(&pool, tenant, day)
        .await
        .expect("first refresh failed");
    let second = refresh_daily_summary(&pool, tenant, day)
        .await
        .expect("second refresh failed");

    assert_eq!(first.total_calls, second.total_calls);
    assert_eq!(first.sentiment_positive, second.sentiment_positive);
    assert_eq!(first.sentiment_neutral, second.sentiment_neutral);
    assert_eq!(first.sentiment_negative, second.sentiment_negative);
    assert_eq!(first.call_outcomes, second.call_outcomes);
    assert_eq!(first.avg_sentiment_score, second.avg_sentiment_score);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_summaries WHERE tenant_id = $1")
        .bind(tenant)
        .fetch_one(&pool)
        .await
        .expect("count failed");
    assert_eq!(rows, 1);

    let stored = get_daily_summary(&pool, tenant, day)
        .await
        .expect("get_daily_summary failed")
        .expect("row should exist");
    assert_eq!(stored.total_calls, 10);
}

#[sqlx::test(migrations = "../../migrations")]
async fn daily_summary_for_empty_day_is_zeroed(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Quiet").await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 12).expect("valid date");

    let summary = refresh_daily_summary(&pool, tenant, day)
        .await
        .expect("refresh failed");
    assert_eq!(summary.total_calls, 0);
    assert_eq!(summary.avg_call_duration, Decimal::ZERO);
    assert!(summary.avg_sentiment_score.is_none());
    assert!(summary.call_outcomes.0.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn assistant_performance_per_assistant(pool: sqlx::PgPool) {
    let tenant = insert_test_tenant(&pool, "Perf").await;
    let busy = insert_test_assistant(&pool, tenant, "Busy").await;
    let idle = insert_test_assistant(&pool, tenant, "Idle").await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 13).expect("valid date");
    seed_analytics_day(&pool, tenant, busy, day).await;

    let rows = refresh_assistant_performance(&pool, tenant, day)
        .await
        .expect("refresh failed");
    assert_eq!(rows.len(), 2);

    let busy_row = rows
        .iter()
        .find(|r| r.assistant_id == busy)
        .expect("busy row");
    assert_eq!(busy_row.call_count, 10);
    assert_eq!(busy_row.success_rate, Decimal::new(4000, 2));
    assert_eq!(busy_row.avg_duration, Decimal::new(12000, 2));

    let idle_row = rows
        .iter()
        .find(|r| r.assistant_id == idle)
        .expect("idle row");
    assert_eq!(idle_row.call_count, 0);
    assert_eq!(idle_row.success_rate, Decimal::ZERO);
    assert!(idle_row.avg_sentiment.is_none());

    refresh_assistant_performance(&pool, tenant, day)
        .await
        .expect("second refresh failed");
    let stored = list_assistant_performance(&pool, tenant, day)
        .await
        .expect("list failed");
    assert_eq!(stored.len(), 2, "second refresh must not add rows");
}

#[sqlx::test(migrations = "../../migrations")]
async fn tenants_with_calls_on_filters_by_utc_day(pool: sqlx::PgPool) {
    let active = insert_test_tenant(&pool, "Active").await;
    let other = insert_test_tenant(&pool, "Other Day").await;
    let day = NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date");

    insert_test_call(
        &pool,
        active,
        &TestCall {
            assistant_id: None,
            started_at: at(day, 0),
            duration_seconds: 10,
            outcome: None,
            successful: false,
            transcript: None,
        },
    )
    .await;
    insert_test_call(
        &pool,
        other,
        &TestCall {
            assistant_id: None,
            started_at: at(day.succ_opt().expect("valid date"), 0),
            duration_seconds: 10,
            outcome: None,
            successful: false,
            transcript: None,
        },
    )
    .await;

    let tenants = list_tenants_with_calls_on(&pool, day)
        .await
        .expect("list failed");
    assert_eq!(tenants, vec![active]);
}
