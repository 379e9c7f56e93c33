//! Chat-completions client that scores one call transcript.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use callpilot_core::{retry_with_backoff, RetryPolicy};

use crate::error::SentimentError;
use crate::normalize::{normalize_response, SentimentAnalysis};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 4000;
const MAX_ERROR_BODY_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You analyze phone calls between a business's AI receptionist \
and a caller. Read the transcript and respond with a single JSON object with exactly these \
keys: \"sentiment_score\" (integer 0-100, where 0 is very negative and 100 is very positive \
for the caller's experience), \"sentiment_label\" (one of \"positive\", \"neutral\", \
\"negative\"), and \"key_topics\" (array of up to five short strings naming what the call was \
about). Respond with JSON only.";

pub struct SentimentAnalyzer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_transcript_chars: usize,
    retry: RetryPolicy,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl SentimentAnalyzer {
    /// Creates an analyzer pointed at the public `OpenAI` API.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, SentimentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
            retry,
        })
    }

    /// Point the analyzer at another OpenAI-compatible endpoint (tests use a
    /// wiremock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_max_transcript_chars(mut self, max_chars: usize) -> Self {
        self.max_transcript_chars = max_chars;
        self
    }

    /// Build from config. Returns `Ok(None)` when `OPENAI_API_KEY` is unset.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_app_config(
        config: &callpilot_core::AppConfig,
    ) -> Result<Option<Self>, SentimentError> {
        let Some(api_key) = config.openai_api_key.as_deref() else {
            return Ok(None);
        };
        let analyzer = Self::new(
            api_key,
            &config.sentiment_model,
            config.http_timeout_secs,
            RetryPolicy::from_app_config(config),
        )?
        .with_base_url(&config.openai_base_url)
        .with_max_transcript_chars(config.sentiment_max_transcript_chars);
        Ok(Some(analyzer))
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Score one transcript.
    ///
    /// The transcript is cut to the configured character budget before it is
    /// sent. HTTP failures are retried per the client's [`RetryPolicy`]; a
    /// response that does not parse is not.
    ///
    /// # Errors
    ///
    /// - [`SentimentError::Http`] / [`SentimentError::UnexpectedStatus`] when
    ///   the request fails.
    /// - [`SentimentError::Deserialize`] if the completion envelope is invalid.
    /// - [`SentimentError::MalformedResponse`] if the message content is not
    ///   the expected sentiment object.
    pub async fn analyze(&self, transcript: &str) -> Result<SentimentAnalysis, SentimentError> {
        let transcript = truncate_chars(transcript.trim(), self.max_transcript_chars);
        let user_prompt = format!("Transcript:\n{transcript}");
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.0,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let content = retry_with_backoff(self.retry, "sentiment llm", || {
            let url = url.clone();
            let request = &request;
            async move { self.complete(&url, request).await }
        })
        .await?;

        normalize_response(&content)
    }

    async fn complete(
        &self,
        url: &str,
        request: &ChatRequest<'_>,
    ) -> Result<String, SentimentError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SentimentError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|source| SentimentError::Deserialize {
                context: "chat completion response".to_owned(),
                source,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                SentimentError::MalformedResponse("completion had no content".to_owned())
            })
    }
}

/// The first `max_chars` chars of `text`, never splitting a UTF-8 char.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
