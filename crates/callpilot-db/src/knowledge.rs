//! Database operations for `knowledge_files`, `knowledge_sequences`, and
//! `knowledge_meta`.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `knowledge_files` table.
///
/// `external_file_id` is `None` when the upload to the voice platform failed;
/// the row is kept for auditing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KnowledgeFileRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub business_name: String,
    pub sequence_number: i32,
    pub external_file_id: Option<String>,
    pub file_name: String,
    pub byte_size: i32,
    pub content_sha256: String,
    pub source_urls: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `knowledge_meta` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KnowledgeMetaRow {
    pub tenant_id: Uuid,
    pub total_files: i32,
    pub total_content_size: i64,
    pub pages_scraped: i32,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new `knowledge_files` row.
#[derive(Debug, Clone)]
pub struct NewKnowledgeFile<'a> {
    pub tenant_id: Uuid,
    pub business_name: &'a str,
    pub sequence_number: i32,
    pub external_file_id: Option<&'a str>,
    pub file_name: &'a str,
    pub byte_size: i32,
    pub content_sha256: &'a str,
    pub source_urls: &'a [String],
}

// ---------------------------------------------------------------------------
// Sequence allocation
// ---------------------------------------------------------------------------

/// Atomically reserve `count` consecutive sequence numbers for a
/// `(tenant, business)` pair and return the first one.
///
/// The counter row is created on first use, seeded from the highest
/// `sequence_number` already persisted in `knowledge_files`, so numbering
/// continues from the previous high-water mark. The single-statement upsert
/// takes a row lock, which makes concurrent reservations disjoint.
///
/// # Errors
///
/// Returns [`DbError::InvalidSequenceCount`] if `count` is not positive, or
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn reserve_knowledge_sequences(
    pool: &PgPool,
    tenant_id: Uuid,
    business_name: &str,
    count: i32,
) -> Result<i32, DbError> {
    if count <= 0 {
        return Err(DbError::InvalidSequenceCount(count));
    }

    let first: i32 = sqlx::query_scalar(
        "INSERT INTO knowledge_sequences (tenant_id, business_name, last_sequence) \
         VALUES ( \
             $1, $2, \
             (SELECT COALESCE(MAX(sequence_number), 0) \
              FROM knowledge_files \
              WHERE tenant_id = $1 AND business_name = $2) + $3 \
         ) \
         ON CONFLICT (tenant_id, business_name) DO UPDATE SET \
             last_sequence = GREATEST( \
                 knowledge_sequences.last_sequence, \
                 EXCLUDED.last_sequence - $3 \
             ) + $3 \
         RETURNING last_sequence - $3 + 1",
    )
    .bind(tenant_id)
    .bind(business_name)
    .bind(count)
    .fetch_one(pool)
    .await?;

    Ok(first)
}

// ---------------------------------------------------------------------------
// knowledge_files operations
// ---------------------------------------------------------------------------

/// Insert one knowledge file row and return it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation on `(tenant_id, business_name, sequence_number)`.
pub async fn insert_knowledge_file(
    pool: &PgPool,
    file: &NewKnowledgeFile<'_>,
) -> Result<KnowledgeFileRow, DbError> {
    insert_file(pool, file).await
}

async fn insert_file<'e>(
    executor: impl PgExecutor<'e>,
    file: &NewKnowledgeFile<'_>,
) -> Result<KnowledgeFileRow, DbError> {
    let row = sqlx::query_as::<_, KnowledgeFileRow>(
        "INSERT INTO knowledge_files \
             (tenant_id, business_name, sequence_number, external_file_id, \
              file_name, byte_size, content_sha256, source_urls) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id, tenant_id, business_name, sequence_number, external_file_id, \
                   file_name, byte_size, content_sha256, source_urls, created_at",
    )
    .bind(file.tenant_id)
    .bind(file.business_name)
    .bind(file.sequence_number)
    .bind(file.external_file_id)
    .bind(file.file_name)
    .bind(file.byte_size)
    .bind(file.content_sha256)
    .bind(Json(file.source_urls))
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Persist a finished build: every file row plus the overwritten
/// `knowledge_meta` summary, in one transaction.
///
/// `total_files` and `total_content_size` are derived from `files`. Either
/// all rows and the summary are written, or none are.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert or the upsert fails; the
/// transaction is rolled back.
pub async fn record_knowledge_build(
    pool: &PgPool,
    tenant_id: Uuid,
    files: &[NewKnowledgeFile<'_>],
    pages_scraped: i32,
) -> Result<KnowledgeMetaRow, DbError> {
    let total_files = i32::try_from(files.len()).unwrap_or(i32::MAX);
    let total_content_size: i64 = files.iter().map(|f| i64::from(f.byte_size)).sum();

    let mut tx = pool.begin().await?;
    for file in files {
        insert_file(&mut *tx, file).await?;
    }
    let meta = upsert_meta(
        &mut *tx,
        tenant_id,
        total_files,
        total_content_size,
        pages_scraped,
    )
    .await?;
    tx.commit().await?;

    Ok(meta)
}

/// List every knowledge file for a tenant, ordered by business and sequence.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_knowledge_files(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Vec<KnowledgeFileRow>, DbError> {
    let rows = sqlx::query_as::<_, KnowledgeFileRow>(
        "SELECT id, tenant_id, business_name, sequence_number, external_file_id, \
                file_name, byte_size, content_sha256, source_urls, created_at \
         FROM knowledge_files \
         WHERE tenant_id = $1 \
         ORDER BY business_name, sequence_number",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// knowledge_meta operations
// ---------------------------------------------------------------------------

/// Insert or overwrite the scrape summary for a tenant.
///
/// Values replace the previous row; they are never accumulated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_knowledge_meta(
    pool: &PgPool,
    tenant_id: Uuid,
    total_files: i32,
    total_content_size: i64,
    pages_scraped: i32,
) -> Result<KnowledgeMetaRow, DbError> {
    upsert_meta(pool, tenant_id, total_files, total_content_size, pages_scraped).await
}

async fn upsert_meta<'e>(
    executor: impl PgExecutor<'e>,
    tenant_id: Uuid,
    total_files: i32,
    total_content_size: i64,
    pages_scraped: i32,
) -> Result<KnowledgeMetaRow, DbError> {
    let row = sqlx::query_as::<_, KnowledgeMetaRow>(
        "INSERT INTO knowledge_meta (tenant_id, total_files, total_content_size, pages_scraped) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (tenant_id) DO UPDATE SET \
             total_files        = EXCLUDED.total_files, \
             total_content_size = EXCLUDED.total_content_size, \
             pages_scraped      = EXCLUDED.pages_scraped, \
             updated_at         = NOW() \
         RETURNING tenant_id, total_files, total_content_size, pages_scraped, updated_at",
    )
    .bind(tenant_id)
    .bind(total_files)
    .bind(total_content_size)
    .bind(pages_scraped)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Return the scrape summary for a tenant, or `None` if no build has run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_knowledge_meta(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Option<KnowledgeMetaRow>, DbError> {
    let row = sqlx::query_as::<_, KnowledgeMetaRow>(
        "SELECT tenant_id, total_files, total_content_size, pages_scraped, updated_at \
         FROM knowledge_meta \
         WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
