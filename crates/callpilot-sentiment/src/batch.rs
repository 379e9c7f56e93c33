//! One pass over calls still waiting for a sentiment row.

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use callpilot_db::NewCallSentiment;

use crate::analyzer::SentimentAnalyzer;
use crate::error::SentimentError;

/// A call whose analysis failed this many times is no longer picked up.
pub const MAX_SENTIMENT_ATTEMPTS: i32 = 5;

/// Counts from one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentBatchReport {
    /// Calls picked up by this run.
    pub pending: usize,
    /// Sentiment rows written.
    pub analyzed: usize,
    /// Calls that already had a row by the time we wrote ours.
    pub already_scored: usize,
    /// Calls left for a later run (provider or parse failure).
    pub failed: usize,
    /// Failed calls that just reached [`MAX_SENTIMENT_ATTEMPTS`].
    pub abandoned: usize,
}

/// Score up to `limit` pending calls.
///
/// Untried calls come first (oldest first), then calls with fewer failed
/// attempts. Calls are processed one at a time. A failed analysis (HTTP
/// error, malformed model output) is counted against the call and logged;
/// the call is retried by later runs until it reaches
/// [`MAX_SENTIMENT_ATTEMPTS`]. A row that cannot be written is logged and
/// left pending without counting an attempt.
///
/// # Errors
///
/// Returns [`SentimentError::Db`] only if the pending-call query itself fails.
pub async fn run_sentiment_batch(
    pool: &PgPool,
    analyzer: &SentimentAnalyzer,
    limit: i64,
) -> Result<SentimentBatchReport, SentimentError> {
    let pending =
        callpilot_db::list_calls_pending_sentiment(pool, limit, MAX_SENTIMENT_ATTEMPTS).await?;
    let mut report = SentimentBatchReport {
        pending: pending.len(),
        ..SentimentBatchReport::default()
    };

    for call in pending {
        let analysis = match analyzer.analyze(&call.transcript).await {
            Ok(analysis) => analysis,
            Err(e) => {
                report.failed += 1;
                let attempts =
                    match callpilot_db::record_sentiment_failure(pool, call.id, Utc::now()).await {
                        Ok(attempts) => attempts,
                        Err(db_err) => {
                            tracing::error!(
                                call_id = %call.id,
                                error = %db_err,
                                "sentiment: failed to record attempt"
                            );
                            call.sentiment_attempts + 1
                        }
                    };
                if attempts >= MAX_SENTIMENT_ATTEMPTS {
                    report.abandoned += 1;
                    tracing::error!(
                        call_id = %call.id,
                        tenant_id = %call.tenant_id,
                        attempts,
                        error = %e,
                        "sentiment: analysis failed, giving up on call"
                    );
                } else {
                    tracing::warn!(
                        call_id = %call.id,
                        tenant_id = %call.tenant_id,
                        attempts,
                        error = %e,
                        "sentiment: analysis failed, leaving call for a later run"
                    );
                }
                continue;
            }
        };

        let written = callpilot_db::insert_call_sentiment(
            pool,
            &NewCallSentiment {
                call_id: call.id,
                tenant_id: call.tenant_id,
                sentiment_score: analysis.score,
                sentiment_label: analysis.label,
                key_topics: &analysis.key_topics,
                model: analyzer.model(),
            },
        )
        .await;

        match written {
            Ok(true) => report.analyzed += 1,
            Ok(false) => report.already_scored += 1,
            Err(e) => {
                tracing::error!(
                    call_id = %call.id,
                    error = %e,
                    "sentiment: failed to store result"
                );
                report.failed += 1;
            }
        }
    }

    if report.pending > 0 {
        tracing::info!(
            pending = report.pending,
            analyzed = report.analyzed,
            already_scored = report.already_scored,
            failed = report.failed,
            abandoned = report.abandoned,
            "sentiment: batch finished"
        );
    }
    Ok(report)
}
