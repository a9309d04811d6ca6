// ABOUTME: Error types for feed fetching and parsing.
// ABOUTME: Separates upstream failures (Fetch, Status) from document failures (Parse, Invalid).

use std::fmt;
use thiserror::Error;

/// Errors produced while obtaining a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The request to the feed URL failed before a response arrived.
    #[error("failed to fetch feed {url}: {message}")]
    Fetch { url: String, message: String },

    /// The feed URL answered with a non-success status.
    #[error("feed {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Failed to parse the feed data (malformed XML/JSON).
    #[error("failed to parse feed: {0}")]
    Parse(String),

    /// The data was parsed but is not usable as a feed.
    #[error("invalid feed: {0}")]
    Invalid(String),
}

impl FeedError {
    /// Creates a Parse error from an underlying feed-rs error.
    pub fn parse(err: impl fmt::Display) -> Self {
        FeedError::Parse(err.to_string())
    }

    /// Creates an Invalid error with a custom message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        FeedError::Invalid(msg.into())
    }

    /// Creates a Fetch error for `url`.
    pub fn fetch(url: impl Into<String>, err: impl fmt::Display) -> Self {
        FeedError::Fetch {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Returns true when the failure happened talking to the upstream server.
    pub fn is_upstream(&self) -> bool {
        matches!(self, FeedError::Fetch { .. } | FeedError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_classification() {
        assert!(FeedError::fetch("https://a.test/rss", "connection refused").is_upstream());
        assert!(FeedError::Status {
            url: "https://a.test/rss".into(),
            status: 503
        }
        .is_upstream());
        assert!(!FeedError::parse("bad xml").is_upstream());
        assert!(!FeedError::invalid("too large").is_upstream());
    }

    #[test]
    fn display_includes_url_and_status() {
        let err = FeedError::Status {
            url: "https://a.test/rss".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "feed https://a.test/rss returned HTTP 404");
    }
}
