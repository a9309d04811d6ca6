// ABOUTME: Site profile data model describing one site's extraction strategy.
// ABOUTME: Holds candidate selectors, cleanup rules, image rules and URL prefix gates.

//! Site profiles.
//!
//! A profile is data: ordered content selectors, extra cleanup selectors,
//! image selectors and deny-list, plus allowed/blocked URL prefixes. Profiles
//! deserialize from JSON and drive the generic [`ProfileExtractor`].
//!
//! [`ProfileExtractor`]: crate::extractors::engine::ProfileExtractor

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ExtractError;

/// Specifies how to select a value from the DOM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    /// A simple CSS selector string, e.g., "img.lead"
    Css(String),
    /// A CSS selector with attribute extraction, e.g., ["img", "data-src"]
    CssAttr(Vec<String>),
}

impl SelectorSpec {
    /// Splits the spec into a CSS selector and an optional attribute name.
    pub fn parts(&self) -> (&str, Option<&str>) {
        match self {
            SelectorSpec::Css(css) => (css.as_str(), None),
            SelectorSpec::CssAttr(parts) => (
                parts.first().map(String::as_str).unwrap_or_default(),
                parts.get(1).map(String::as_str),
            ),
        }
    }
}

/// Extraction strategy for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SiteProfile {
    /// Human-readable name used in logs.
    pub name: String,
    /// Primary domain this profile applies to.
    pub domain: String,
    /// Additional domains served by the same markup.
    #[serde(default)]
    pub supported_domains: Vec<String>,
    /// Content container candidates, tried in order.
    #[serde(default)]
    pub content_selectors: Vec<String>,
    /// Selectors removed from the container before serialization.
    #[serde(default)]
    pub clean: Vec<String>,
    /// Site-specific image sources, tried before page metadata.
    #[serde(default)]
    pub image_selectors: Vec<SelectorSpec>,
    /// Substrings that disqualify an image URL.
    #[serde(default)]
    pub image_denylist: Vec<String>,
    /// When non-empty, URLs must start with one of these (`host/path`, `www.` ignored).
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,
    /// URLs starting with one of these are rejected.
    #[serde(default)]
    pub blocked_prefixes: Vec<String>,
}

/// Content candidates for pages without a dedicated profile.
const GENERIC_CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[itemprop=\"articleBody\"]",
    "[property=\"articleBody\"]",
    ".article-body",
    ".content",
    ".news-detail__content",
    ".story-body",
    ".entry-content",
    ".post-content",
    "main",
];

impl SiteProfile {
    /// The fallback profile used for domains without a dedicated entry.
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            content_selectors: GENERIC_CONTENT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Self::default()
        }
    }

    /// Primary and supported domains.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.domain.as_str())
            .chain(self.supported_domains.iter().map(String::as_str))
            .filter(|d| !d.trim().is_empty())
    }

    /// Every CSS selector this profile references.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.content_selectors
            .iter()
            .chain(self.clean.iter())
            .map(String::as_str)
            .chain(self.image_selectors.iter().map(|s| s.parts().0))
    }

    /// Rejects URLs outside the allowed prefixes or inside a blocked one.
    pub fn check_url(&self, url: &str) -> Result<(), ExtractError> {
        if self.allowed_prefixes.is_empty() && self.blocked_prefixes.is_empty() {
            return Ok(());
        }
        let key = url_key(url).ok_or_else(|| {
            ExtractError::parse(url, "CheckUrl", Some(anyhow::anyhow!("URL has no host")))
        })?;

        if let Some(prefix) = self
            .blocked_prefixes
            .iter()
            .find(|p| key.starts_with(&normalize_prefix(p)))
        {
            return Err(ExtractError::excluded(
                url,
                "CheckUrl",
                Some(anyhow::anyhow!("matches blocked prefix {}", prefix)),
            ));
        }

        if !self.allowed_prefixes.is_empty()
            && !self
                .allowed_prefixes
                .iter()
                .any(|p| key.starts_with(&normalize_prefix(p)))
        {
            return Err(ExtractError::excluded(
                url,
                "CheckUrl",
                Some(anyhow::anyhow!("outside allowed prefixes of {}", self.name)),
            ));
        }
        Ok(())
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Lowercased `host + path` with `www.` removed, e.g. `example.com/news/a`.
pub fn url_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(format!("{}{}", strip_www(&host), parsed.path().to_lowercase()))
}

/// Brings a configured prefix into `url_key` form; a scheme is optional.
fn normalize_prefix(prefix: &str) -> String {
    let lower = prefix.trim().to_lowercase();
    let without_scheme = lower
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&lower)
        .trim_start_matches('/');
    strip_www(without_scheme).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gated() -> SiteProfile {
        SiteProfile {
            name: "ilketv".into(),
            domain: "ilketv.com.tr".into(),
            allowed_prefixes: vec!["ilketv.com.tr/".into()],
            blocked_prefixes: vec![
                "https://www.ilketv.com.tr/video/".into(),
                "ilketv.com.tr/galeri/".into(),
            ],
            ..SiteProfile::default()
        }
    }

    #[test]
    fn test_serde_defaults_and_selector_specs() {
        let json = r#"{
            "name": "example",
            "domain": "example.com",
            "content_selectors": ["div.body"],
            "image_selectors": ["img.lead", ["meta[itemprop='image']", "content"]]
        }"#;
        let profile: SiteProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.supported_domains, Vec::<String>::new());
        assert_eq!(profile.image_selectors[0].parts(), ("img.lead", None));
        assert_eq!(
            profile.image_selectors[1].parts(),
            ("meta[itemprop='image']", Some("content"))
        );
    }

    #[test]
    fn test_blocked_prefix_ignores_scheme_and_www() {
        let p = gated();
        assert!(p.check_url("https://ilketv.com.tr/video/abc").unwrap_err().is_excluded());
        assert!(p.check_url("http://www.ilketv.com.tr/Galeri/x").unwrap_err().is_excluded());
        assert!(p.check_url("https://www.ilketv.com.tr/gundem/haber-1").is_ok());
    }

    #[test]
    fn test_allowed_prefixes_gate() {
        let p = gated();
        let err = p.check_url("https://other.com/ilketv.com.tr/").unwrap_err();
        assert!(err.is_excluded());
    }

    #[test]
    fn test_no_prefixes_allows_everything() {
        assert!(SiteProfile::generic().check_url("not a url").is_ok());
    }

    #[test]
    fn test_url_key() {
        assert_eq!(
            url_key("https://WWW.Example.com:8443/A/b?q=1").as_deref(),
            Some("example.com/a/b")
        );
        assert_eq!(url_key("mailto:x@example.com"), None);
    }
}
