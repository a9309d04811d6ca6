// ABOUTME: Configuration options for the HTTP transport used by extractors.
// ABOUTME: HttpTransportBuilder provides a fluent API for constructing HttpTransport instances.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ExtractError;
use crate::transport::HttpTransport;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; RSSFullTextBot/1.0)";

/// Configuration options for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub backoff_base: Duration,
    pub allow_private_networks: bool,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 2,
            backoff_base: Duration::from_secs(1),
            allow_private_networks: false,
            http_client: None,
            headers: HashMap::new(),
        }
    }
}

/// Builder for constructing HttpTransport instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct HttpTransportBuilder {
    opts: ExtractOptions,
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Set how many times a failed request is retried.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.opts.max_retries = retries;
        self
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.opts.backoff_base = base;
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.opts
    }

    pub fn build(self) -> Result<HttpTransport, ExtractError> {
        HttpTransport::new(self.opts)
    }
}
