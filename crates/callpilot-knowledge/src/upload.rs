//! Upload client for the voice platform's file store.
//!
//! One call only: `POST {base}/file` with a multipart `file` part. The
//! response body carries an opaque `id` that assistants reference.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use callpilot_core::{retry_with_backoff, RetryPolicy};

use crate::error::KnowledgeError;

/// Error bodies are cut to this many chars before they reach logs.
const MAX_ERROR_BODY_CHARS: usize = 500;

pub struct VoiceClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: Option<String>,
}

impl VoiceClient {
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, KnowledgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            retry,
        })
    }

    /// Build from config. Returns `Ok(None)` when `VOICE_API_KEY` is unset.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_app_config(
        config: &callpilot_core::AppConfig,
    ) -> Result<Option<Self>, KnowledgeError> {
        let Some(api_key) = config.voice_api_key.as_deref() else {
            return Ok(None);
        };
        Self::new(
            &config.voice_api_base_url,
            api_key,
            config.http_timeout_secs,
            RetryPolicy::from_app_config(config),
        )
        .map(Some)
    }

    /// Upload one text file and return the platform's file id.
    ///
    /// Transient failures (timeouts, 429, 5xx) are retried per the client's
    /// [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// - [`KnowledgeError::Http`] on network failure.
    /// - [`KnowledgeError::UnexpectedStatus`] on a non-2xx response.
    /// - [`KnowledgeError::Deserialize`] / [`KnowledgeError::MissingFileId`]
    ///   if the response has no usable id.
    pub async fn upload_file(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<String, KnowledgeError> {
        let url = format!("{}/file", self.base_url);

        retry_with_backoff(self.retry, "voice upload", || {
            let url = url.clone();
            async move {
                let part = Part::text(content.to_owned())
                    .file_name(file_name.to_owned())
                    .mime_str("text/plain")?;
                let form = Form::new().part("file", part);

                let response = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .multipart(form)
                    .send()
                    .await?;

                let status = response.status();
                let body = response.text().await?;
                if !status.is_success() {
                    return Err(KnowledgeError::UnexpectedStatus {
                        status: status.as_u16(),
                        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                    });
                }

                let parsed: UploadResponse =
                    serde_json::from_str(&body).map_err(|source| KnowledgeError::Deserialize {
                        context: format!("upload response for {file_name}"),
                        source,
                    })?;
                parsed
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or(KnowledgeError::MissingFileId)
            }
        })
        .await
    }

    /// Like [`upload_file`](Self::upload_file), but a failure is logged and
    /// reported as `None` so the caller can keep going.
    pub async fn upload_or_none(&self, file_name: &str, content: &str) -> Option<String> {
        match self.upload_file(file_name, content).await {
            Ok(id) => {
                tracing::debug!(file_name, file_id = %id, "knowledge: file uploaded");
                Some(id)
            }
            Err(e) => {
                tracing::warn!(file_name, error = %e, "knowledge: file upload failed");
                None
            }
        }
    }
}
