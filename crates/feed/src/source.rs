// ABOUTME: The FeedSource contract and its HTTP implementation.
// ABOUTME: HttpFeedSource retries 429/5xx/network failures with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::FeedError;
use crate::models::RawFeed;
use crate::parser::parse_feed_bytes;

/// Largest feed body accepted (5 MB).
pub const MAX_FEED_SIZE: usize = 5 * 1024 * 1024;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; RSSFullTextBot/1.0)";

/// Fetches and parses a feed by URL.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<RawFeed, FeedError>;
}

/// Feed source backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpFeedSource {
    pub fn builder() -> HttpFeedSourceBuilder {
        HttpFeedSourceBuilder::default()
    }

    /// Wraps an existing client with default retry settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs(1),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let mut retry_count = 0;
        loop {
            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) if retry_count < self.max_retries => {
                    let delay = self.delay_for(retry_count);
                    tracing::warn!(feed = %url, error = %e, retry = retry_count, ?delay, "Feed request failed, retrying");
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(FeedError::fetch(url, e)),
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(FeedError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                let delay = self.delay_for(retry_count);
                tracing::warn!(feed = %url, status = %status, retry = retry_count, ?delay, "Feed server unavailable, backing off");
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FeedError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            return read_limited_bytes(url, response, MAX_FEED_SIZE).await;
        }
    }

    fn delay_for(&self, retry_count: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry_count))
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed(&self, url: &str) -> Result<RawFeed, FeedError> {
        let bytes = self.fetch_bytes(url).await?;
        let feed = parse_feed_bytes(&bytes, url)?;
        tracing::debug!(feed = %url, items = feed.items.len(), bytes = bytes.len(), "Parsed feed");
        Ok(feed)
    }
}

async fn read_limited_bytes(
    url: &str,
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FeedError::invalid(format!("feed larger than {limit} bytes")));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FeedError::fetch(url, e))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::invalid(format!("feed larger than {limit} bytes")));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Builder for [`HttpFeedSource`].
#[derive(Debug, Clone)]
pub struct HttpFeedSourceBuilder {
    timeout: Duration,
    user_agent: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl Default for HttpFeedSourceBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl HttpFeedSourceBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// First retry delay; each further retry doubles it.
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn build(self) -> Result<HttpFeedSource, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FeedError::invalid(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpFeedSource {
            client,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Example</title><link>https://example.com</link>
<item><title>One</title><link>https://example.com/1</link></item>
</channel></rss>"#;

    fn source(retries: u32) -> HttpFeedSource {
        HttpFeedSource::builder()
            .max_retries(retries)
            .backoff_base(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_feed_ok() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rss");
            then.status(200)
                .header("content-type", "application/rss+xml")
                .body(RSS);
        });

        let feed = source(0).fetch_feed(&server.url("/rss")).await.unwrap();
        mock.assert();
        assert_eq!(feed.title, "Example");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].link, "https://example.com/1");
    }

    #[tokio::test]
    async fn test_server_error_retried_then_reported() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rss");
            then.status(503);
        });

        let err = source(2).fetch_feed(&server.url("/rss")).await.unwrap_err();
        assert_eq!(mock.calls(), 3);
        assert!(err.is_upstream());
        assert!(matches!(err, FeedError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rss");
            then.status(404);
        });

        let err = source(3).fetch_feed(&server.url("/rss")).await.unwrap_err();
        assert_eq!(mock.calls(), 1);
        assert!(matches!(err, FeedError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rss");
            then.status(200).body("this is not a feed");
        });

        let err = source(0).fetch_feed(&server.url("/rss")).await.unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
        assert!(!err.is_upstream());
    }
}
