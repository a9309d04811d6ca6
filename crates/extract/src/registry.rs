// ABOUTME: Domain to extractor dispatch with a default fallback.
// ABOUTME: Normalizes domains and walks parent domains when resolving a URL.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::extractors::compiled::precompile_selectors;
use crate::extractors::engine::ProfileExtractor;
use crate::extractors::profile::SiteProfile;
use crate::extractors::{Extractor, UnavailableExtractor};
use crate::transport::Transport;

/// Picks the extractor responsible for a URL.
///
/// Bindings are keyed by normalized domain. Resolution never mutates, so a
/// registry can be shared behind an `Arc` once populated.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    default: Option<Arc<dyn Extractor>>,
    domains: HashMap<String, Arc<dyn Extractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("default", &self.default.as_ref().map(|e| e.name().to_string()))
            .field("domains", &self.domains.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback extractor. Last write wins.
    pub fn register_default(&mut self, extractor: Arc<dyn Extractor>) {
        self.default = Some(extractor);
    }

    /// Binds `extractor` to `domain`, replacing any previous binding.
    pub fn register_domain(&mut self, domain: &str, extractor: Arc<dyn Extractor>) {
        let key = normalize_domain(domain);
        if key.is_empty() {
            tracing::warn!(domain = %domain, "Ignoring extractor binding for empty domain");
            return;
        }
        self.domains.insert(key, extractor);
    }

    /// Builds a profile extractor and binds it for every domain the profile lists.
    pub fn register_profile(&mut self, profile: SiteProfile, transport: Arc<dyn Transport>) {
        precompile_selectors(profile.selectors());
        let domains: Vec<String> = profile.domains().map(str::to_string).collect();
        let extractor: Arc<dyn Extractor> = Arc::new(ProfileExtractor::new(profile, transport));
        for domain in domains {
            self.register_domain(&domain, Arc::clone(&extractor));
        }
    }

    /// Extractor bound to exactly this domain, after normalization.
    pub fn get(&self, domain: &str) -> Option<Arc<dyn Extractor>> {
        self.domains.get(&normalize_domain(domain)).cloned()
    }

    /// Resolves the extractor for `url`.
    ///
    /// Tries the host, then each parent domain down to two labels. Keys are
    /// stored without `www.`, so one lookup covers both spellings. Falls back
    /// to the default, then to an extractor that always fails.
    pub fn resolve(&self, url: &str) -> Arc<dyn Extractor> {
        let host = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(normalize_domain))
            .filter(|h| !h.is_empty());

        if let Some(host) = host {
            if let Some(found) = candidate_domains(&host).find_map(|d| self.domains.get(d)) {
                tracing::trace!(url = %url, extractor = found.name(), "Extractor resolved");
                return Arc::clone(found);
            }
        }
        self.fallback()
    }

    fn fallback(&self) -> Arc<dyn Extractor> {
        match &self.default {
            Some(default) => Arc::clone(default),
            None => Arc::new(UnavailableExtractor),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Number of domain bindings.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// The host followed by its parent domains, never a bare TLD.
fn candidate_domains(host: &str) -> impl Iterator<Item = &str> {
    let label_count = host.split('.').count();
    let starts = std::iter::once(0).chain(
        host.match_indices('.')
            .map(|(i, _)| i + 1)
            .take(label_count.saturating_sub(2)),
    );
    starts.map(move |start| &host[start..])
}

/// Lowercases and strips scheme, path, port, trailing dot and `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let mut d = domain.trim().to_lowercase();
    if let Some((_, rest)) = d.split_once("://") {
        d = rest.to_string();
    }
    if let Some(end) = d.find(['/', '?', '#']) {
        d.truncate(end);
    }
    if !d.starts_with('[') {
        if let Some(colon) = d.rfind(':') {
            d.truncate(colon);
        }
    }
    let d = d.trim_end_matches('.');
    d.strip_prefix("www.").unwrap_or(d).to_string()
}
