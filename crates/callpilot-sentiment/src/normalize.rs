//! Normalization of raw LLM sentiment output into a bounded score, one of
//! three labels, and a short topic list.

use serde::Serialize;
use serde_json::Value;

use callpilot_core::SentimentLabel;

use crate::error::SentimentError;

const MAX_KEY_TOPICS: usize = 10;
const MAX_TOPIC_CHARS: usize = 80;

/// A validated sentiment result ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentAnalysis {
    /// Always within `0..=100`.
    pub score: i32,
    pub label: SentimentLabel,
    pub key_topics: Vec<String>,
}

/// Parse the model's message content into a [`SentimentAnalysis`].
///
/// - `sentiment_score` may be a number or a numeric string; it is rounded and
///   clamped into `0..=100`.
/// - `sentiment_label` is kept when it is one of `positive`, `neutral`,
///   `negative` (any case); otherwise it is derived from the score.
/// - `key_topics` is optional; non-string entries and blanks are dropped,
///   duplicates removed, and the list capped at ten.
///
/// A surrounding Markdown code fence is tolerated.
///
/// # Errors
///
/// Returns [`SentimentError::MalformedResponse`] if the content is not a JSON
/// object or carries no usable score.
pub fn normalize_response(content: &str) -> Result<SentimentAnalysis, SentimentError> {
    let value: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| SentimentError::MalformedResponse(format!("invalid JSON: {e}")))?;
    let Value::Object(fields) = value else {
        return Err(SentimentError::MalformedResponse(
            "expected a JSON object".to_owned(),
        ));
    };

    let raw_score = fields
        .get("sentiment_score")
        .and_then(score_from_value)
        .ok_or_else(|| {
            SentimentError::MalformedResponse("missing or non-numeric sentiment_score".to_owned())
        })?;
    let score = clamp_score(raw_score);

    let label = fields
        .get("sentiment_label")
        .and_then(Value::as_str)
        .and_then(SentimentLabel::parse)
        .unwrap_or_else(|| SentimentLabel::from_score(score));

    let key_topics = fields
        .get("key_topics")
        .and_then(Value::as_array)
        .map(|items| normalize_topics(items.as_slice()))
        .unwrap_or_default();

    Ok(SentimentAnalysis {
        score,
        label,
        key_topics,
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn score_from_value(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    score.is_finite().then_some(score)
}

/// Round to the nearest integer and clamp into `0..=100`.
#[allow(clippy::cast_possible_truncation)]
fn clamp_score(raw: f64) -> i32 {
    raw.round().clamp(0.0, 100.0) as i32
}

fn normalize_topics(items: &[Value]) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for topic in items.iter().filter_map(Value::as_str) {
        let topic: String = topic
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(MAX_TOPIC_CHARS)
            .collect();
        if topic.is_empty() || topics.iter().any(|t| t.eq_ignore_ascii_case(&topic)) {
            continue;
        }
        topics.push(topic);
        if topics.len() == MAX_KEY_TOPICS {
            break;
        }
    }
    topics
}
