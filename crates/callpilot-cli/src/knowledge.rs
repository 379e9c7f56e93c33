//! Knowledge-base commands.
//!
//! `build` runs the same pipeline as the API endpoint, in-process, and prints
//! the outcome as JSON. `status` is read-only.

use clap::Subcommand;
use uuid::Uuid;

use callpilot_knowledge::{build_knowledge_base, KnowledgeBuildRequest, VoiceClient};
use callpilot_scraper::{ContentPacker, ScrapeOrchestrator};

/// Sub-commands available under `knowledge`.
#[derive(Debug, Subcommand)]
pub enum KnowledgeCommands {
    /// Crawl a tenant's website and upload a fresh knowledge base
    Build {
        /// Tenant id
        #[arg(long)]
        tenant: Uuid,
        /// Website to crawl (defaults to the tenant's website on file)
        #[arg(long)]
        url: Option<String>,
    },
    /// Show the stored knowledge summary and files for a tenant
    Status {
        /// Tenant id
        #[arg(long)]
        tenant: Uuid,
    },
}

/// # Errors
///
/// Returns an error if the tenant is unknown, no website URL is available,
/// `VOICE_API_KEY` is unset, or the build itself fails.
pub(crate) async fn run_knowledge_build(
    pool: &sqlx::PgPool,
    config: &callpilot_core::AppConfig,
    tenant_id: Uuid,
    url: Option<String>,
) -> anyhow::Result<()> {
    let tenant = callpilot_db::get_tenant(pool, tenant_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant {tenant_id} not found"))?;
    let website_url = url
        .or(tenant.website_url)
        .map(|u| u.trim().to_owned())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| anyhow::anyhow!("tenant {tenant_id} has no website; pass --url"))?;
    if !(website_url.starts_with("http://") || website_url.starts_with("https://")) {
        anyhow::bail!("--url must be an http(s) URL, got '{website_url}'");
    }

    let uploader = VoiceClient::from_app_config(config)?
        .ok_or_else(|| anyhow::anyhow!("VOICE_API_KEY must be set to build a knowledge base"))?;
    let orchestrator = ScrapeOrchestrator::from_app_config(config)?;
    let packer = ContentPacker::from_app_config(config);

    let request = KnowledgeBuildRequest {
        tenant_id,
        business_name: tenant.business_name,
        website_url,
    };
    let outcome = build_knowledge_base(pool, &orchestrator, &packer, &uploader, &request).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        anyhow::bail!("knowledge build failed for tenant {tenant_id}");
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if a database query fails.
pub(crate) async fn run_knowledge_status(
    pool: &sqlx::PgPool,
    tenant_id: Uuid,
) -> anyhow::Result<()> {
    let Some(meta) = callpilot_db::get_knowledge_meta(pool, tenant_id).await? else {
        println!(
            "no knowledge base for tenant {tenant_id}; run `knowledge build --tenant {tenant_id}`"
        );
        return Ok(());
    };

    println!(
        "files: {}  content: {} bytes  pages scraped: {}  updated: {}",
        meta.total_files,
        meta.total_content_size,
        meta.pages_scraped,
        meta.updated_at.format("%Y-%m-%d %H:%M")
    );

    let files = callpilot_db::list_knowledge_files(pool, tenant_id).await?;
    println!("{:<6}{:<45}{:<10}{:<30}SOURCES", "SEQ", "FILE", "BYTES", "FILE ID");
    for file in &files {
        println!(
            "{:<6}{:<45}{:<10}{:<30}{}",
            file.sequence_number,
            file.file_name,
            file.byte_size,
            file.external_file_id.as_deref().unwrap_or("(upload failed)"),
            file.source_urls.0.len()
        );
    }

    Ok(())
}
