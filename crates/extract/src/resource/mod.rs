// ABOUTME: Low-level resource fetching for article pages.
// ABOUTME: Single HTTP attempt with SSRF protection, content-length limits, and charset decoding.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use ipnet::{Ipv4Net, Ipv6Net};
use url::Url;

use crate::error::ExtractError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// A fetched page.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body to text using the content-type charset or detection.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

fn in_net4(ip: &Ipv4Addr, addr: Ipv4Addr, prefix: u8) -> bool {
    Ipv4Net::new(addr, prefix).is_ok_and(|net| net.contains(ip))
}

fn in_net6(ip: &Ipv6Addr, addr: Ipv6Addr, prefix: u8) -> bool {
    Ipv6Net::new(addr, prefix).is_ok_and(|net| net.contains(ip))
}

/// Check if an IP address is loopback, private, link-local or otherwise not publicly routable.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(ip) => {
            ip.is_private()
                || ip.is_loopback()
                || ip.is_link_local()
                || ip.is_unspecified()
                || in_net4(ip, Ipv4Addr::new(100, 64, 0, 0), 10)
        }
        IpAddr::V6(ip) => {
            if let Some(mapped) = ip.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            ip.is_loopback()
                || ip.is_unspecified()
                || in_net6(ip, Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7)
                || in_net6(ip, Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10)
        }
    }
}

/// Decode body bytes to a String using charset from content-type header or detection.
pub(crate) fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(encoding) = content_type
        .and_then(extract_charset)
        .and_then(|charset| encoding_rs::Encoding::for_label(charset.as_bytes()))
    {
        let (decoded, _, _) = encoding.decode(body);
        return decoded.into_owned();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .to_lowercase()
        .split(';')
        .find_map(|part| part.trim().strip_prefix("charset=").map(str::to_string))
        .map(|charset| charset.trim_matches(['"', '\'']).to_string())
}

/// Parse `url` and require an http(s) scheme with a host.
pub(crate) fn parse_http_url(url: &str, op: &str) -> Result<Url, ExtractError> {
    let parsed = Url::parse(url).map_err(|e| {
        ExtractError::parse(url, op, Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ExtractError::parse(
            url,
            op,
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }
    Ok(parsed)
}

/// Reject hosts that are, or resolve to, private addresses.
pub(crate) async fn ensure_public_host(target: &Url, url: &str) -> Result<(), ExtractError> {
    let Some(host) = target.host_str() else {
        return Ok(());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(ExtractError::excluded(
                url,
                "Fetch",
                Some(anyhow::anyhow!("private IP addresses are not allowed")),
            ));
        }
        return Ok(());
    }

    let port = target.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        ExtractError::transport(
            url,
            "Fetch",
            Some(anyhow::anyhow!("DNS lookup failed: {}", e)),
        )
    })?;
    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(ExtractError::excluded(
                url,
                "Fetch",
                Some(anyhow::anyhow!("host resolves to a private address")),
            ));
        }
    }
    Ok(())
}

/// Perform one GET. Non-success statuses are returned, not raised.
pub(crate) async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    headers: &HashMap<String, String>,
    allow_private_networks: bool,
) -> Result<FetchResult, ExtractError> {
    let parsed_url = parse_http_url(url, "Fetch")?;
    if !allow_private_networks {
        ensure_public_host(&parsed_url, url).await?;
    }

    let mut request = client.get(parsed_url.as_str());
    for (key, value) in headers {
        request = request.header(key, value);
    }

    let response = request.send().await.map_err(|e| {
        ExtractError::transport(url, "Fetch", Some(anyhow::anyhow!("request failed: {}", e)))
    })?;

    if !allow_private_networks {
        ensure_public_host(response.url(), url).await?;
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_CONTENT_LENGTH {
            return Err(ExtractError::transport(
                url,
                "Fetch",
                Some(anyhow::anyhow!("content too large")),
            ));
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response.bytes().await.map_err(|e| {
        ExtractError::transport(
            url,
            "Fetch",
            Some(anyhow::anyhow!("failed to read body: {}", e)),
        )
    })?;

    if body.len() > MAX_CONTENT_LENGTH {
        return Err(ExtractError::transport(
            url,
            "Fetch",
            Some(anyhow::anyhow!("content too large")),
        ));
    }

    Ok(FetchResult {
        status,
        url: url.to_string(),
        final_url,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn create_test_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent("test-agent")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_ok_utf8() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/test");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("hello");
        });

        let result = fetch_once(&create_test_client(), &server.url("/test"), &HashMap::new(), true)
            .await
            .expect("fetch should succeed");
        mock.assert();
        assert_eq!(result.status, 200);
        assert!(result.is_success());
        assert_eq!(result.text(), "hello");
    }

    #[tokio::test]
    async fn test_non_success_status_is_returned() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not found");
        });

        let result = fetch_once(&create_test_client(), &server.url("/missing"), &HashMap::new(), true)
            .await
            .expect("status is data at this layer");
        assert_eq!(result.status, 404);
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_headers_forwarded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/h").header("accept-language", "tr");
            then.status(200).body("ok");
        });

        let headers = HashMap::from([("accept-language".to_string(), "tr".to_string())]);
        fetch_once(&create_test_client(), &server.url("/h"), &headers, true)
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_private_ip_block() {
        let server = MockServer::start();
        let url = format!("http://127.0.0.1:{}/test", server.port());
        let err = fetch_once(&create_test_client(), &url, &HashMap::new(), false)
            .await
            .expect_err("should fail on private IP");
        assert!(err.is_excluded());
    }

    #[tokio::test]
    async fn test_bad_scheme_is_parse_error() {
        let err = fetch_once(&create_test_client(), "ftp://example.com/x", &HashMap::new(), true)
            .await
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_decode_iso_8859_1_with_chardetng() {
        let iso_bytes: &[u8] = &[0x63, 0x61, 0x66, 0xe9];
        assert_eq!(decode_body(iso_bytes, None), "café");
    }

    #[test]
    fn test_decode_windows_1254_from_header() {
        // "ş" is 0xFE in windows-1254
        let body: &[u8] = &[0x6b, 0x61, 0xfe];
        assert_eq!(
            decode_body(body, Some("text/html; charset=windows-1254")),
            "kaş"
        );
    }

    #[test]
    fn test_is_private_ip() {
        for ip in [
            "10.0.0.1",
            "172.16.0.1",
            "192.168.1.1",
            "127.0.0.1",
            "169.254.0.1",
            "100.64.0.1",
            "0.0.0.0",
            "::1",
            "fc00::1",
            "fe80::1",
            "::ffff:127.0.0.1",
        ] {
            assert!(is_private_ip(&ip.parse().unwrap()), "{ip}");
        }
        for ip in ["8.8.8.8", "172.32.0.1", "2001:4860:4860::8888"] {
            assert!(!is_private_ip(&ip.parse().unwrap()), "{ip}");
        }
    }

    #[test]
    fn test_extract_charset() {
        assert_eq!(
            extract_charset("text/html; charset=\"UTF-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}
