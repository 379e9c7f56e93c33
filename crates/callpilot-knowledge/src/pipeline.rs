//! End-to-end knowledge-base build for one tenant.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use callpilot_db::NewKnowledgeFile;
use callpilot_scraper::{clean_page, ContentPacker, ScrapeOrchestrator, ScrapedPage};

use crate::error::KnowledgeError;
use crate::upload::VoiceClient;

/// What to build: whose knowledge base, and from which website.
#[derive(Debug, Clone)]
pub struct KnowledgeBuildRequest {
    pub tenant_id: Uuid,
    pub business_name: String,
    pub website_url: String,
}

/// One persisted file as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeFileSummary {
    pub sequence_number: i32,
    pub file_name: String,
    pub byte_size: usize,
    pub external_file_id: Option<String>,
    pub source_urls: Vec<String>,
}

/// Result of a build, serialized as `{"status": "success", ...}` or
/// `{"status": "error", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KnowledgeOutcome {
    Success {
        /// Ids of successfully uploaded files only.
        file_ids: Vec<String>,
        files: Vec<KnowledgeFileSummary>,
        pages_scraped: usize,
        total_content_size: usize,
        crawl_backend: &'static str,
        used_fallback: bool,
    },
    Error {
        error: String,
    },
}

impl KnowledgeOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Scrape, clean, pack, upload, and persist a tenant's knowledge base.
///
/// 1. Crawl `request.website_url` (primary backend, fallback on low yield).
/// 2. Clean every page and drop the ones with nothing left.
/// 3. Pack the cleaned pages and reserve one sequence number per file.
/// 4. Upload each file; a failed upload is persisted with no external id.
/// 5. Write all file rows and overwrite the tenant's `knowledge_meta`
///    summary in one transaction.
///
/// Never returns an error: a failed crawl, an empty result, or a database
/// failure becomes [`KnowledgeOutcome::Error`]. Nothing is persisted when
/// the crawl or cleaning step fails, and a failed write leaves neither
/// file rows nor a summary behind.
pub async fn build_knowledge_base(
    pool: &PgPool,
    orchestrator: &ScrapeOrchestrator,
    packer: &ContentPacker,
    uploader: &VoiceClient,
    request: &KnowledgeBuildRequest,
) -> KnowledgeOutcome {
    match run_build(pool, orchestrator, packer, uploader, request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                tenant_id = %request.tenant_id,
                url = %request.website_url,
                error = %e,
                "knowledge: build failed"
            );
            KnowledgeOutcome::Error {
                error: e.to_string(),
            }
        }
    }
}

async fn run_build(
    pool: &PgPool,
    orchestrator: &ScrapeOrchestrator,
    packer: &ContentPacker,
    uploader: &VoiceClient,
    request: &KnowledgeBuildRequest,
) -> Result<KnowledgeOutcome, KnowledgeError> {
    let tenant_id = request.tenant_id;
    tracing::info!(%tenant_id, url = %request.website_url, "knowledge: build started");

    let report = orchestrator.scrape(&request.website_url).await?;
    let pages_scraped = report.pages.len();

    let cleaned: Vec<ScrapedPage> = report.pages.iter().filter_map(clean_page).collect();
    if cleaned.is_empty() {
        return Err(KnowledgeError::NoContent {
            url: request.website_url.clone(),
            pages: pages_scraped,
        });
    }
    tracing::info!(
        %tenant_id,
        pages_scraped,
        pages_kept = cleaned.len(),
        backend = report.backend,
        "knowledge: pages cleaned"
    );

    let plan = packer.plan(&cleaned);
    let count = i32::try_from(plan.len()).map_err(|_| KnowledgeError::TooManyFiles(plan.len()))?;
    let first_sequence = callpilot_db::reserve_knowledge_sequences(
        pool,
        tenant_id,
        &request.business_name,
        count,
    )
    .await?;
    let packed = plan.into_files(&request.business_name, first_sequence);

    // Rows are written only after every upload has been attempted.
    let mut uploaded = Vec::with_capacity(packed.len());
    for file in packed {
        let byte_size = i32::try_from(file.byte_size).map_err(|_| KnowledgeError::FileTooLarge {
            file_name: file.file_name.clone(),
            bytes: file.byte_size,
        })?;
        let external_file_id = uploader.upload_or_none(&file.file_name, &file.content).await;
        uploaded.push((file, byte_size, external_file_id));
    }

    let rows: Vec<NewKnowledgeFile<'_>> = uploaded
        .iter()
        .map(|(file, byte_size, external_file_id)| NewKnowledgeFile {
            tenant_id,
            business_name: &request.business_name,
            sequence_number: file.sequence_number,
            external_file_id: external_file_id.as_deref(),
            file_name: &file.file_name,
            byte_size: *byte_size,
            content_sha256: &file.content_sha256,
            source_urls: &file.source_urls,
        })
        .collect();
    callpilot_db::record_knowledge_build(
        pool,
        tenant_id,
        &rows,
        i32::try_from(pages_scraped).unwrap_or(i32::MAX),
    )
    .await?;

    let files: Vec<KnowledgeFileSummary> = uploaded
        .into_iter()
        .map(|(file, _, external_file_id)| KnowledgeFileSummary {
            sequence_number: file.sequence_number,
            file_name: file.file_name,
            byte_size: file.byte_size,
            external_file_id,
            source_urls: file.source_urls,
        })
        .collect();
    let total_content_size: usize = files.iter().map(|f| f.byte_size).sum();

    let file_ids: Vec<String> = files
        .iter()
        .filter_map(|f| f.external_file_id.clone())
        .collect();
    if file_ids.len() < files.len() {
        tracing::warn!(
            %tenant_id,
            uploaded = file_ids.len(),
            total = files.len(),
            "knowledge: some files failed to upload"
        );
    }
    tracing::info!(
        %tenant_id,
        files = files.len(),
        first_sequence,
        total_content_size,
        "knowledge: build finished"
    );

    Ok(KnowledgeOutcome::Success {
        file_ids,
        files,
        pages_scraped,
        total_content_size,
        crawl_backend: report.backend,
        used_fallback: report.used_fallback,
    })
}
