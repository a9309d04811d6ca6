// ABOUTME: The Transport contract used by extractors to fetch article pages.
// ABOUTME: HttpTransport wraps reqwest with SSRF-safe redirects and exponential-backoff retries.

use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::options::{ExtractOptions, HttpTransportBuilder};
use crate::resource::{fetch_once, is_private_ip, FetchResult};

/// Fetches a URL on behalf of an extractor.
///
/// Implementations own their retry policy; callers treat an error as final.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResult, ExtractError>;
}

/// Transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    opts: ExtractOptions,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    pub fn new(opts: ExtractOptions) -> Result<Self, ExtractError> {
        let client = match opts.http_client.clone() {
            Some(client) => client,
            None => build_client(&opts)?,
        };
        Ok(Self { opts, client })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.opts
    }

    fn delay_for(&self, retry_count: u32) -> Duration {
        self.opts
            .backoff_base
            .saturating_mul(2u32.saturating_pow(retry_count))
    }
}

fn build_client(opts: &ExtractOptions) -> Result<reqwest::Client, ExtractError> {
    let allow_private = opts.allow_private_networks;
    let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= 10 {
            return attempt.error("too many redirects");
        }
        if allow_private {
            return attempt.follow();
        }
        let next = attempt.url().clone();
        let Some(host) = next.host_str() else {
            return attempt.follow();
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            if is_private_ip(&ip) {
                return attempt.error("redirect to private IP blocked");
            }
            return attempt.follow();
        }
        // synchronous DNS resolution to avoid async in redirect policy
        let port = next.port_or_known_default().unwrap_or(80);
        match (host, port).to_socket_addrs() {
            Ok(mut addrs) => {
                if addrs.any(|sa| is_private_ip(&sa.ip())) {
                    attempt.error("redirect to private IP blocked")
                } else {
                    attempt.follow()
                }
            }
            Err(_) => attempt.error("DNS lookup failed during redirect"),
        }
    });

    reqwest::Client::builder()
        .redirect(redirect_policy)
        .user_agent(&opts.user_agent)
        .timeout(opts.timeout)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| {
            ExtractError::transport(
                "",
                "BuildClient",
                Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
            )
        })
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResult, ExtractError> {
        let mut merged = self.opts.headers.clone();
        merged.extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut retry_count = 0;
        loop {
            let outcome = fetch_once(
                &self.client,
                url,
                &merged,
                self.opts.allow_private_networks,
            )
            .await;

            let reason = match outcome {
                Ok(result) if result.is_success() => return Ok(result),
                Ok(result) if !is_retryable_status(result.status) => {
                    return Err(ExtractError::transport(
                        url,
                        "Fetch",
                        Some(anyhow::anyhow!("HTTP status {}", result.status)),
                    ));
                }
                Ok(result) if retry_count >= self.opts.max_retries => {
                    return Err(ExtractError::transport(
                        url,
                        "Fetch",
                        Some(anyhow::anyhow!(
                            "HTTP status {} after {} retries",
                            result.status,
                            retry_count
                        )),
                    ));
                }
                Ok(result) => format!("HTTP status {}", result.status),
                Err(err) if !err.is_retryable() || retry_count >= self.opts.max_retries => {
                    return Err(err);
                }
                Err(err) => err.to_string(),
            };

            let delay = self.delay_for(retry_count);
            tracing::warn!(url = %url, reason = %reason, retry = retry_count, ?delay, "Article fetch failed, retrying");
            tokio::time::sleep(delay).await;
            retry_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn transport(retries: u32) -> HttpTransport {
        HttpTransport::builder()
            .allow_private_networks(true)
            .max_retries(retries)
            .backoff_base(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let t = HttpTransport::builder().build().unwrap();
        assert_eq!(t.options().timeout, Duration::from_secs(15));
        assert_eq!(t.options().max_retries, 2);
        assert_eq!(
            t.options().user_agent,
            "Mozilla/5.0 (compatible; RSSFullTextBot/1.0)"
        );
        assert!(!t.options().allow_private_networks);
    }

    #[tokio::test]
    async fn test_sends_user_agent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/a")
                .header("user-agent", "Mozilla/5.0 (compatible; RSSFullTextBot/1.0)");
            then.status(200).body("<p>ok</p>");
        });

        let result = transport(0)
            .fetch(&server.url("/a"), &HashMap::new())
            .await
            .unwrap();
        mock.assert();
        assert_eq!(result.text(), "<p>ok</p>");
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(502);
        });

        let err = transport(2)
            .fetch(&server.url("/flaky"), &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(mock.calls(), 3);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(410);
        });

        let err = transport(2)
            .fetch(&server.url("/gone"), &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(mock.calls(), 1);
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_ssrf_not_retried() {
        let server = MockServer::start();
        let t = HttpTransport::builder()
            .max_retries(3)
            .backoff_base(Duration::from_millis(1))
            .build()
            .unwrap();
        let url = format!("http://127.0.0.1:{}/x", server.port());
        let err = t.fetch(&url, &HashMap::new()).await.unwrap_err();
        assert!(err.is_excluded());
    }
}
