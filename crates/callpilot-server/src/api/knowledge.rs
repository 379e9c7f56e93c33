use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use callpilot_knowledge::{
    build_knowledge_base, KnowledgeBuildRequest, KnowledgeOutcome, VoiceClient,
};
use callpilot_scraper::{ContentPacker, ScrapeOrchestrator};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Everything a knowledge build needs, shared by all requests.
///
/// At most one build per tenant runs at a time.
pub struct KnowledgeService {
    orchestrator: ScrapeOrchestrator,
    packer: ContentPacker,
    uploader: VoiceClient,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl KnowledgeService {
    #[must_use]
    pub fn new(
        orchestrator: ScrapeOrchestrator,
        packer: ContentPacker,
        uploader: VoiceClient,
    ) -> Self {
        Self {
            orchestrator,
            packer,
            uploader,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Returns `Ok(None)` when `VOICE_API_KEY` is unset.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_app_config(config: &callpilot_core::AppConfig) -> anyhow::Result<Option<Self>> {
        let Some(uploader) = VoiceClient::from_app_config(config)? else {
            tracing::warn!("VOICE_API_KEY not set; knowledge builds disabled");
            return Ok(None);
        };
        let orchestrator = ScrapeOrchestrator::from_app_config(config)?;
        Ok(Some(Self::new(
            orchestrator,
            ContentPacker::from_app_config(config),
            uploader,
        )))
    }

    /// Marks a build for `tenant_id` as running. `None` if one already is.
    ///
    /// The tenant is released when the returned slot is dropped, including
    /// when the build task unwinds.
    fn try_begin(self: &Arc<Self>, tenant_id: Uuid) -> Option<BuildSlot> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant_id);
        inserted.then(|| BuildSlot {
            service: Arc::clone(self),
            tenant_id,
        })
    }

    fn check_seed(&self, website_url: &str) -> Result<(), callpilot_scraper::ScraperError> {
        self.orchestrator.check_seed(website_url)
    }

    async fn build(&self, pool: &PgPool, request: &KnowledgeBuildRequest) -> KnowledgeOutcome {
        build_knowledge_base(pool, &self.orchestrator, &self.packer, &self.uploader, request).await
    }
}

/// A running build's claim on its tenant.
struct BuildSlot {
    service: Arc<KnowledgeService>,
    tenant_id: Uuid,
}

impl Drop for BuildSlot {
    fn drop(&mut self) {
        self.service
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.tenant_id);
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct BuildKnowledgeBody {
    /// Overrides the tenant's stored website.
    pub website_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct KnowledgeStatus {
    meta: Option<KnowledgeMetaItem>,
    files: Vec<KnowledgeFileItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct KnowledgeMetaItem {
    total_files: i32,
    total_content_size: i64,
    pages_scraped: i32,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct KnowledgeFileItem {
    sequence_number: i32,
    file_name: String,
    external_file_id: Option<String>,
    byte_size: i32,
    source_urls: Vec<String>,
    created_at: DateTime<Utc>,
}

/// `POST /api/v1/tenants/{tenant_id}/knowledge`
///
/// Runs the build to completion even if the client disconnects. A failed
/// build is reported with `502` and an error outcome.
pub(super) async fn build_knowledge(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<BuildKnowledgeBody>,
) -> Result<(StatusCode, Json<ApiResponse<KnowledgeOutcome>>), ApiError> {
    let Some(service) = state.knowledge.clone() else {
        return Err(ApiError::new(
            req_id.0,
            "service_unavailable",
            "knowledge builds are not configured",
        ));
    };

    let tenant = callpilot_db::get_tenant(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "tenant not found"))?;

    let website_url = non_blank(body.website_url)
        .or_else(|| non_blank(tenant.website_url))
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                "website_url is required when the tenant has none on file",
            )
        })?;
    if !(website_url.starts_with("http://") || website_url.starts_with("https://")) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "website_url must be an http(s) URL",
        ));
    }
    if let Err(e) = service.check_seed(&website_url) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("website_url is not allowed: {e}"),
        ));
    }

    let Some(slot) = service.try_begin(tenant_id) else {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "a knowledge build is already running for this tenant",
        ));
    };

    let request = KnowledgeBuildRequest {
        tenant_id,
        business_name: tenant.business_name,
        website_url,
    };
    let pool = state.pool.clone();
    let handle = tokio::spawn(async move {
        let outcome = slot.service.build(&pool, &request).await;
        drop(slot);
        outcome
    });

    let outcome = handle.await.map_err(|e| {
        tracing::error!(%tenant_id, error = %e, "knowledge build task panicked");
        ApiError::new(req_id.0.clone(), "internal_error", "knowledge build failed")
    })?;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((
        status,
        Json(ApiResponse {
            data: outcome,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

fn non_blank(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_owned()).filter(|u| !u.is_empty())
}

/// `GET /api/v1/tenants/{tenant_id}/knowledge`
pub(super) async fn get_knowledge(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<KnowledgeStatus>>, ApiError> {
    callpilot_db::get_tenant(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "tenant not found"))?;

    let meta = callpilot_db::get_knowledge_meta(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let files = callpilot_db::list_knowledge_files(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = KnowledgeStatus {
        meta: meta.map(|m| KnowledgeMetaItem {
            total_files: m.total_files,
            total_content_size: m.total_content_size,
            pages_scraped: m.pages_scraped,
            updated_at: m.updated_at,
        }),
        files: files
            .into_iter()
            .map(|f| KnowledgeFileItem {
                sequence_number: f.sequence_number,
                file_name: f.file_name,
                external_file_id: f.external_file_id,
                byte_size: f.byte_size,
                source_urls: f.source_urls.0,
                created_at: f.created_at,
            })
            .collect(),
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
