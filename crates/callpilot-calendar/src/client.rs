//! HTTP client for the Google Calendar v3 events API and the OAuth token
//! endpoint.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode, Url};

use callpilot_core::{retry_with_backoff, RetryPolicy};

use crate::error::CalendarError;
use crate::types::{CalendarEvent, EventsPage, TokenResponse};

const PAGE_SIZE: &str = "250";
/// Upper bound on pages followed in one listing.
const MAX_PAGES: usize = 40;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const MAX_ERROR_BODY_CHARS: usize = 500;

pub struct CalendarClient {
    client: Client,
    base_url: Url,
    token_url: String,
    oauth_client: Option<(String, String)>,
    retry: RetryPolicy,
}

/// A new access token from the refresh grant.
#[derive(Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("access_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CalendarClient {
    /// # Errors
    ///
    /// Returns [`CalendarError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`CalendarError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        token_url: &str,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, CalendarError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| CalendarError::InvalidBaseUrl(base_url.to_owned()))?;
        Ok(Self {
            client,
            base_url,
            token_url: token_url.to_owned(),
            oauth_client: None,
            retry,
        })
    }

    /// Enable access-token refresh with the given OAuth client credentials.
    #[must_use]
    pub fn with_oauth_client(mut self, client_id: &str, client_secret: &str) -> Self {
        self.oauth_client = Some((client_id.to_owned(), client_secret.to_owned()));
        self
    }

    /// # Errors
    ///
    /// See [`CalendarClient::new`].
    pub fn from_app_config(config: &callpilot_core::AppConfig) -> Result<Self, CalendarError> {
        let client = Self::new(
            &config.google_calendar_base_url,
            &config.google_oauth_token_url,
            config.http_timeout_secs,
            RetryPolicy::from_app_config(config),
        )?;
        Ok(match config.google_oauth_client() {
            Some((id, secret)) => client.with_oauth_client(id, secret),
            None => client,
        })
    }

    /// `true` when OAuth client credentials are configured.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.oauth_client.is_some()
    }

    /// List timed and all-day events in `[time_min, time_max)`, with recurring
    /// events expanded into single instances, following `nextPageToken`.
    ///
    /// # Errors
    ///
    /// - [`CalendarError::UnexpectedStatus`] with status 401 when the access
    ///   token is rejected; other non-2xx statuses likewise.
    /// - [`CalendarError::Http`] on network failure.
    /// - [`CalendarError::Deserialize`] if a page does not parse.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let url = self.events_url(calendar_id, time_min, time_max, page_token.as_deref())?;
            let page: EventsPage = retry_with_backoff(self.retry, "calendar", || {
                let url = url.clone();
                async move {
                    let response = self.client.get(url).bearer_auth(access_token).send().await?;
                    read_json(response, "events page").await
                }
            })
            .await?;

            events.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(events),
            }
        }

        tracing::warn!(
            calendar_id,
            events = events.len(),
            "calendar: page limit reached, listing truncated"
        );
        Ok(events)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Returns `Ok(None)` when no OAuth client credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::UnexpectedStatus`] if the token endpoint
    /// rejects the grant, or [`CalendarError::Http`] on network failure.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshedToken>, CalendarError> {
        let Some((client_id, client_secret)) = &self.oauth_client else {
            return Ok(None);
        };
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];

        let token: TokenResponse = retry_with_backoff(self.retry, "oauth token", || async {
            let response = self.client.post(&self.token_url).form(&form).send().await?;
            read_json(response, "token response").await
        })
        .await?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Ok(Some(RefreshedToken {
            access_token: token.access_token,
            expires_at: now + chrono::Duration::seconds(lifetime),
        }))
    }

    fn events_url(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<Url, CalendarError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CalendarError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("timeMin", &time_min.to_rfc3339_opts(SecondsFormat::Secs, true))
                .append_pair("timeMax", &time_max.to_rfc3339_opts(SecondsFormat::Secs, true))
                .append_pair("singleEvents", "true")
                .append_pair("orderBy", "startTime")
                .append_pair("maxResults", PAGE_SIZE);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, CalendarError> {
    let status = response.status();
    let body = response.text().await?;
    if status != StatusCode::OK {
        return Err(CalendarError::UnexpectedStatus {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }
    serde_json::from_str(&body).map_err(|source| CalendarError::Deserialize {
        context: context.to_owned(),
        source,
    })
}
