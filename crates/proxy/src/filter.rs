// ABOUTME: Per-domain URL allow/block rules deciding which feed items get extracted.
// ABOUTME: Rules load from JSON; a built-in table is embedded at compile time.

use std::path::Path;

use fulltext_extract::normalize_domain;
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_RULES_JSON: &str = include_str!("../data/filter_rules.json");

/// Path rules for one domain. Blocked paths outrank allowed paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub domain: String,
    /// Substrings of which one must appear in the path. Empty allows all.
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    /// Substrings that reject the URL outright.
    #[serde(default)]
    pub blocked_paths: Vec<String>,
}

impl FilterRule {
    fn matches_host(&self, host: &str) -> bool {
        let domain = normalize_domain(&self.domain);
        !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.')))
    }

    fn accepts(&self, path: &str) -> bool {
        let contains = |needle: &String| !needle.is_empty() && path.contains(&needle.to_lowercase());
        if self.blocked_paths.iter().any(contains) {
            return false;
        }
        self.allowed_paths.is_empty() || self.allowed_paths.iter().any(contains)
    }
}

/// Ordered rule table. The first rule whose domain matches decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlFilter {
    rules: Vec<FilterRule>,
}

impl UrlFilter {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// The embedded rule table.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_json(DEFAULT_RULES_JSON)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let rules: Vec<FilterRule> = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("invalid filter rules: {}", e))?;
        Ok(Self::new(rules))
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        Self::from_json(&json)
    }

    pub fn register(&mut self, rule: FilterRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Whether an item at `url` should be extracted.
    ///
    /// URLs without a matching rule are accepted; URLs that do not parse are rejected.
    pub fn should_process(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return false;
        };
        let Some(host) = parsed.host_str().map(normalize_domain) else {
            return false;
        };
        let path = parsed.path().to_lowercase();
        match self.rules.iter().find(|rule| rule.matches_host(&host)) {
            Some(rule) => rule.accepts(&path),
            None => true,
        }
    }
}
