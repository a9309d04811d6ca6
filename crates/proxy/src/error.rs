// ABOUTME: Request-level error type for the feed proxy with its HTTP status mapping.
// ABOUTME: Per-item extraction failures never surface here; they are logged and dropped.

use fulltext_feed::FeedError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("missing 'url' parameter")]
    MissingUrl,

    #[error("invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to fetch feed: {0}")]
    Upstream(#[source] FeedError),

    #[error("failed to parse feed: {0}")]
    FeedParse(#[source] FeedError),

    #[error("failed to serialize response: {0}")]
    Serialize(String),
}

impl ProcessError {
    /// HTTP status a router should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            ProcessError::MissingUrl | ProcessError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            ProcessError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProcessError::FeedParse(_) | ProcessError::Serialize(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<FeedError> for ProcessError {
    fn from(err: FeedError) -> Self {
        if err.is_upstream() {
            ProcessError::Upstream(err)
        } else {
            ProcessError::FeedParse(err)
        }
    }
}
