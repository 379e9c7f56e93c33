//! Sentiment scoring command.

use clap::Subcommand;

/// Sub-commands available under `sentiment`.
#[derive(Debug, Subcommand)]
pub enum SentimentCommands {
    /// Score calls that have a transcript but no sentiment row yet
    Run {
        /// Maximum number of calls to score (defaults to `CALLPILOT_SENTIMENT_BATCH_SIZE`)
        #[arg(long)]
        limit: Option<i64>,
    },
}

/// # Errors
///
/// Returns an error if `OPENAI_API_KEY` is unset, the limit is not positive,
/// or the pending-call query fails. Per-call failures only show up in the
/// report.
pub(crate) async fn run_sentiment(
    pool: &sqlx::PgPool,
    config: &callpilot_core::AppConfig,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let limit = limit.unwrap_or(config.sentiment_batch_size);
    if limit <= 0 {
        anyhow::bail!("--limit must be positive, got {limit}");
    }
    let analyzer = callpilot_sentiment::SentimentAnalyzer::from_app_config(config)?
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY must be set to score calls"))?;

    let report = callpilot_sentiment::run_sentiment_batch(pool, &analyzer, limit).await?;
    println!(
        "pending: {}  analyzed: {}  already scored: {}  failed: {}  abandoned: {}",
        report.pending,
        report.analyzed,
        report.already_scored,
        report.failed,
        report.abandoned
    );
    Ok(())
}
