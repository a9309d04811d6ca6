// ABOUTME: Feed request parsing from query strings, including limit and format policy.
// ABOUTME: Produces the cache fingerprint that identifies equivalent requests.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::config::ProxyConfig;
use crate::error::ProcessError;

/// Serialization of the assembled feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Rss,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Rss => "rss",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json; charset=utf-8",
            OutputFormat::Rss => "application/rss+xml; charset=utf-8",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "rss" | "xml" => Ok(OutputFormat::Rss),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// One feed conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub source_url: String,
    pub limit: usize,
    pub format: OutputFormat,
}

impl FeedRequest {
    /// Builds a request, validating the URL and clamping the limit.
    pub fn new(
        source_url: &str,
        limit: Option<usize>,
        format: OutputFormat,
        config: &ProxyConfig,
    ) -> Result<Self, ProcessError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(ProcessError::MissingUrl);
        }
        let parsed = Url::parse(source_url).map_err(|e| ProcessError::InvalidUrl {
            url: source_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProcessError::InvalidUrl {
                url: source_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        Ok(Self {
            source_url: source_url.to_string(),
            limit: clamp_limit(limit, config),
            format,
        })
    }

    /// Parses `url`, `limit` and `format` from a URL query string.
    ///
    /// An unparsable or zero limit falls back to the default; an unknown
    /// format falls back to JSON.
    pub fn from_query(query: &str, config: &ProxyConfig) -> Result<Self, ProcessError> {
        let mut url = None;
        let mut limit = None;
        let mut format = OutputFormat::default();

        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "url" => url = Some(value.into_owned()),
                "limit" => limit = value.trim().parse::<usize>().ok(),
                "format" => format = value.parse().unwrap_or_default(),
                _ => {}
            }
        }

        let url = url.ok_or(ProcessError::MissingUrl)?;
        Self::new(&url, limit, format, config)
    }

    /// Cache key of the request.
    pub fn fingerprint(&self) -> String {
        format!("{}|{}|{}", self.format, self.source_url, self.limit)
    }
}

fn clamp_limit(limit: Option<usize>, config: &ProxyConfig) -> usize {
    match limit {
        Some(n) if n > 0 => n.min(config.max_limit),
        _ => config.default_limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(query: &str) -> Result<FeedRequest, ProcessError> {
        FeedRequest::from_query(query, &ProxyConfig::default())
    }

    #[test]
    fn test_defaults_and_decoding() {
        let req = parse("url=https%3A%2F%2Fexample.com%2Frss%3Fa%3D1").unwrap();
        assert_eq!(req.source_url, "https://example.com/rss?a=1");
        assert_eq!(req.limit, 10);
        assert_eq!(req.format, OutputFormat::Json);
    }

    #[test]
    fn test_limit_policy() {
        let limit = |q: &str| parse(&format!("url=https://a.test/rss&{}", q)).unwrap().limit;
        assert_eq!(limit("limit=3"), 3);
        assert_eq!(limit("limit=0"), 10);
        assert_eq!(limit("limit=abc"), 10);
        assert_eq!(limit("limit=-4"), 10);
        assert_eq!(limit("limit=500"), 50);
    }

    #[test]
    fn test_missing_and_invalid_url() {
        assert!(matches!(parse("limit=3"), Err(ProcessError::MissingUrl)));
        assert!(matches!(parse("url=%20%20"), Err(ProcessError::MissingUrl)));
        assert!(matches!(
            parse("url=ftp://a.test/rss"),
            Err(ProcessError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_fingerprint_includes_format() {
        let json = parse("url=https://a.test/rss&limit=5").unwrap();
        let rss = parse("?url=https://a.test/rss&limit=5&format=rss").unwrap();
        assert_eq!(json.fingerprint(), "json|https://a.test/rss|5");
        assert_eq!(rss.fingerprint(), "rss|https://a.test/rss|5");
    }
}
