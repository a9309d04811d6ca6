// ABOUTME: Generic profile-driven extractor that fetches, selects and cleans article content.
// ABOUTME: One engine serves every site; per-site behavior comes from SiteProfile data.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node};

use crate::dom::cleaners::mark_disallowed;
use crate::dom::serialize::{inner_html_skipping, is_skipped};
use crate::error::ExtractError;
use crate::extractors::compiled::get_or_compile;
use crate::extractors::images::{collect_images, document_base};
use crate::extractors::profile::SiteProfile;
use crate::extractors::{ExtractInput, Extraction, Extractor};
use crate::transport::Transport;

/// Extractor parameterized by a [`SiteProfile`].
#[derive(Clone)]
pub struct ProfileExtractor {
    profile: SiteProfile,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ProfileExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileExtractor")
            .field("profile", &self.profile.name)
            .finish_non_exhaustive()
    }
}

impl ProfileExtractor {
    pub fn new(profile: SiteProfile, transport: Arc<dyn Transport>) -> Self {
        Self { profile, transport }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Checks URL prefixes, fetches the page and extracts it.
    pub async fn extract_url(&self, url: &str) -> Result<Extraction, ExtractError> {
        self.profile.check_url(url)?;

        let fetched = self.transport.fetch(url, &HashMap::new()).await?;
        if !fetched.is_success() {
            return Err(ExtractError::transport(
                url,
                "Fetch",
                Some(anyhow::anyhow!("HTTP status {}", fetched.status)),
            ));
        }

        let base = if fetched.final_url.is_empty() {
            url
        } else {
            fetched.final_url.as_str()
        };
        self.extract_document(&fetched.text(), Some(base))
    }

    /// Selects, cleans and serializes the content container of `html`.
    pub fn extract_document(
        &self,
        html: &str,
        base_url: Option<&str>,
    ) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(html);
        let url = base_url.unwrap_or_default();

        let Some((selector, container, skip)) = self.select_container(&doc) else {
            return Err(ExtractError::not_found(
                url,
                "SelectContent",
                Some(anyhow::anyhow!(
                    "no content selector of {} matched",
                    self.profile.name
                )),
            ));
        };
        tracing::debug!(extractor = %self.profile.name, selector = %selector, url = %url, "Content container selected");

        let base = document_base(&doc, base_url);
        Ok(Extraction {
            content: inner_html_skipping(container, &skip),
            images: collect_images(&doc, container, &skip, &self.profile, base),
        })
    }

    fn select_container<'a>(
        &'a self,
        doc: &'a Html,
    ) -> Option<(&'a str, ElementRef<'a>, HashSet<NodeId>)> {
        for css in &self.profile.content_selectors {
            let Some(selector) = get_or_compile(css) else {
                continue;
            };
            for candidate in doc.select(&selector) {
                let skip = self.removals(candidate);
                if has_content(candidate, &skip) {
                    return Some((css.as_str(), candidate, skip));
                }
            }
        }
        None
    }

    /// Nodes under `container` dropped by the profile's cleanup rules and the default deny-list.
    fn removals(&self, container: ElementRef<'_>) -> HashSet<NodeId> {
        let mut skip = HashSet::new();
        for css in &self.profile.clean {
            if let Some(selector) = get_or_compile(css) {
                skip.extend(container.select(&selector).map(|el| el.id()));
            }
        }
        mark_disallowed(container, &mut skip);
        skip
    }
}

fn has_content(container: ElementRef<'_>, skip: &HashSet<NodeId>) -> bool {
    container.descendants().skip(1).any(|node| {
        let visible = match node.value() {
            Node::Text(text) => !text.trim().is_empty(),
            Node::Element(el) => el.name() == "img",
            _ => false,
        };
        visible && !is_skipped(node, skip)
    })
}

#[async_trait]
impl Extractor for ProfileExtractor {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn extract(&self, input: ExtractInput) -> Result<Extraction, ExtractError> {
        match input {
            ExtractInput::Url(url) => self.extract_url(&url).await,
            ExtractInput::Html { html, base_url } => {
                self.extract_document(&html, base_url.as_deref())
            }
            ExtractInput::Item(meta) => {
                let Some(link) = meta.link.filter(|l| !l.trim().is_empty()) else {
                    return Err(ExtractError::unsupported_input(
                        "",
                        "Extract",
                        Some(anyhow::anyhow!("feed item has no link")),
                    ));
                };
                let mut extraction = self.extract_url(&link).await?;
                if let Some(image) = meta.image {
                    extraction.push_image(image);
                }
                Ok(extraction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::ItemMetadata;
    use crate::resource::FetchResult;
    use pretty_assertions::assert_eq;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn fetch(
            &self,
            url: &str,
            _headers: &HashMap<String, String>,
        ) -> Result<FetchResult, ExtractError> {
            Err(ExtractError::transport(url, "Fetch", None))
        }
    }

    fn engine(profile: SiteProfile) -> ProfileExtractor {
        ProfileExtractor::new(profile, Arc::new(NoTransport))
    }

    #[test]
    fn test_first_non_empty_candidate_wins() {
        let profile = SiteProfile {
            name: "t".into(),
            content_selectors: vec!["div.missing".into(), "div.body".into(), "article".into()],
            clean: vec![".author".into()],
            ..SiteProfile::default()
        };
        let html = r#"<article><p>article</p></article>
            <div class="body"><div class="share">share</div></div>
            <div class="body"><p>Text</p><span class="author">me</span><script>x()</script></div>"#;
        let out = engine(profile).extract_document(html, None).unwrap();
        assert_eq!(out.content.trim(), "<p>Text</p>");
    }

    #[test]
    fn test_not_found_when_nothing_matches() {
        let err = engine(SiteProfile::generic())
            .extract_document("<div><p>x</p></div>", Some("https://example.com/a"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.url, "https://example.com/a");
    }

    #[tokio::test]
    async fn test_item_without_link_is_unsupported() {
        let err = engine(SiteProfile::generic())
            .extract(ExtractInput::Item(ItemMetadata::default()))
            .await
            .unwrap_err();
        assert!(err.is_unsupported_input());
    }

    #[tokio::test]
    async fn test_excluded_before_fetch() {
        let profile = SiteProfile {
            blocked_prefixes: vec!["example.com/video/".into()],
            ..SiteProfile::generic()
        };
        let err = engine(profile)
            .extract(ExtractInput::from("https://www.example.com/video/1"))
            .await
            .unwrap_err();
        assert!(err.is_excluded());
    }
}
