use callpilot_core::Transient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("voice API returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("voice API response did not include a file id")]
    MissingFileId,

    #[error(transparent)]
    Scraper(#[from] callpilot_scraper::ScraperError),

    #[error("no usable content left after cleaning {pages} scraped pages from {url}")]
    NoContent { url: String, pages: usize },

    #[error("knowledge build produced {0} files, more than can be numbered")]
    TooManyFiles(usize),

    #[error("{file_name} is {bytes} bytes, too large to record")]
    FileTooLarge { file_name: String, bytes: usize },

    #[error(transparent)]
    Db(#[from] callpilot_db::DbError),
}

impl Transient for KnowledgeError {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_transient() {
        let throttled = KnowledgeError::UnexpectedStatus {
            status: 429,
            body: String::new(),
        };
        let unavailable = KnowledgeError::UnexpectedStatus {
            status: 503,
            body: String::new(),
        };
        let rejected = KnowledgeError::UnexpectedStatus {
            status: 400,
            body: "file too large".to_owned(),
        };
        assert!(throttled.is_transient());
        assert!(unavailable.is_transient());
        assert!(!rejected.is_transient());
        assert!(!KnowledgeError::MissingFileId.is_transient());
    }
}
