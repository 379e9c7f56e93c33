use callpilot_core::Transient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar API returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The access token was rejected and could not be refreshed.
    #[error("calendar access token rejected for tenant {tenant_id}")]
    Unauthorized { tenant_id: uuid::Uuid },

    #[error("calendar access token for tenant {tenant_id} expired and cannot be refreshed")]
    TokenExpired { tenant_id: uuid::Uuid },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid calendar base URL \"{0}\"")]
    InvalidBaseUrl(String),

    #[error(transparent)]
    Db(#[from] callpilot_db::DbError),
}

impl Transient for CalendarError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
