// ABOUTME: Representative image collection for extracted articles.
// ABOUTME: Walks profile selectors, page metadata and container images in priority order.

use std::collections::HashSet;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use crate::dom::serialize::is_skipped;
use crate::extractors::compiled::get_or_compile;
use crate::extractors::profile::SiteProfile;

/// Page metadata consulted after profile selectors, in priority order.
const META_IMAGE_SOURCES: &[(&str, &str)] = &[
    ("meta[property='og:image']", "content"),
    ("meta[name='og:image']", "content"),
    ("meta[property='og:image:url']", "content"),
    ("meta[property='og:image:secure_url']", "content"),
    ("meta[name='twitter:image']", "content"),
    ("meta[property='twitter:image']", "content"),
    ("meta[name='twitter:image:src']", "content"),
    ("link[rel='image_src']", "href"),
    ("meta[itemprop='image']", "content"),
];

/// Attributes holding the real source of lazily loaded images.
const IMG_SOURCE_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-original", "src"];

/// Icons, logos, vector art and tracking pixels, matched as whole tokens of a file name.
static NON_CONTENT_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)((^|[-_.])(favicon|sprite|icons?|logos?|avatar|pixel|spacer|beacon|1x1)([-_.]|$)|\.svg$|^blank\.gif$)",
    )
    .unwrap()
});

/// Ordered, de-duplicated image URLs.
#[derive(Debug)]
pub struct ImageCollector<'p> {
    base: Option<Url>,
    denylist: &'p [String],
    images: Vec<String>,
}

impl<'p> ImageCollector<'p> {
    pub fn new(base: Option<Url>, profile: &'p SiteProfile) -> Self {
        Self {
            base,
            denylist: &profile.image_denylist,
            images: Vec::new(),
        }
    }

    /// Resolves and qualifies `raw`, then appends it unless already present.
    pub fn push(&mut self, raw: &str) {
        let Some(resolved) = resolve_url(raw, self.base.as_ref()) else {
            return;
        };
        if !self.qualifies(&resolved) || self.images.contains(&resolved) {
            return;
        }
        self.images.push(resolved);
    }

    fn qualifies(&self, url: &str) -> bool {
        if is_non_content(url) {
            return false;
        }
        let lower = url.to_lowercase();
        !self
            .denylist
            .iter()
            .any(|needle| !needle.is_empty() && lower.contains(&needle.to_lowercase()))
    }

    pub fn into_images(self) -> Vec<String> {
        self.images
    }
}

fn is_non_content(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|name| NON_CONTENT_IMAGE.is_match(name))
}

/// Document URL used to absolutize relative references.
pub fn document_base(doc: &Html, base_url: Option<&str>) -> Option<Url> {
    if let Some(url) = base_url.and_then(|u| Url::parse(u.trim()).ok()) {
        return Some(url);
    }
    [
        ("link[rel='canonical']", "href"),
        ("meta[property='og:url']", "content"),
    ]
    .iter()
    .filter_map(|(css, attr)| first_attr(doc, css, attr))
    .find_map(|value| Url::parse(&value).ok())
}

/// Collects images for `container` in priority order. Images under `skip` are ignored.
pub fn collect_images(
    doc: &Html,
    container: ElementRef<'_>,
    skip: &HashSet<NodeId>,
    profile: &SiteProfile,
    base: Option<Url>,
) -> Vec<String> {
    let mut collector = ImageCollector::new(base, profile);

    for spec in &profile.image_selectors {
        let (css, attr) = spec.parts();
        let Some(selector) = get_or_compile(css) else {
            continue;
        };
        for el in doc.select(&selector) {
            let value = match attr {
                Some(attr) => el.value().attr(attr),
                None => img_source(el),
            };
            if let Some(value) = value {
                collector.push(value);
            }
        }
    }

    for (css, attr) in META_IMAGE_SOURCES {
        if let Some(value) = first_attr(doc, css, attr) {
            collector.push(&value);
        }
    }

    if let Some(img) = get_or_compile("img") {
        for el in container.select(&img) {
            if is_skipped(*el, skip) {
                continue;
            }
            if let Some(src) = img_source(el) {
                collector.push(src);
            }
        }
    }

    collector.into_images()
}

fn img_source<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    IMG_SOURCE_ATTRS
        .iter()
        .filter_map(|attr| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty() && !v.starts_with("data:"))
}

fn first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = get_or_compile(css)?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Makes `raw` absolute. Protocol-relative URLs without a base default to https.
pub fn resolve_url(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    let resolved = match (Url::parse(raw), base) {
        (Ok(url), _) => url,
        (Err(_), Some(base)) => base.join(raw).ok()?,
        (Err(_), None) if raw.starts_with("//") => Url::parse(&format!("https:{}", raw)).ok()?,
        (Err(_), None) => return None,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::profile::SelectorSpec;

    fn container<'a>(doc: &'a Html) -> ElementRef<'a> {
        let sel = get_or_compile("article").unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn test_priority_and_dedup() {
        let html = r#"<html><head>
            <meta property="og:image" content="/img/og.jpg">
            <meta name="twitter:image" content="https://cdn.example.com/tw.jpg">
            </head><body>
            <img class="lead" src="/img/lead.jpg">
            <article><img src="/img/og.jpg"><img data-src="body.jpg" src="data:image/gif;base64,AAA"></article>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let profile = SiteProfile {
            image_selectors: vec![SelectorSpec::Css("img.lead".into())],
            ..SiteProfile::default()
        };
        let base = Url::parse("https://example.com/news/a").ok();
        let images = collect_images(&doc, container(&doc), &HashSet::new(), &profile, base);
        assert_eq!(
            images,
            vec![
                "https://example.com/img/lead.jpg",
                "https://example.com/img/og.jpg",
                "https://cdn.example.com/tw.jpg",
                "https://example.com/news/body.jpg",
            ]
        );
    }

    #[test]
    fn test_skips_icons_and_denylist() {
        let html = r#"<article>
            <img src="/static/logo.png"><img src="/i/icon-share.svg">
            <img src="https://px.example.com/pixel.gif"><img src="https://banner.example.com/a.jpg">
            <img src="/photo.jpg"></article>"#;
        let doc = Html::parse_document(html);
        let profile = SiteProfile {
            image_denylist: vec!["banner".into()],
            ..SiteProfile::default()
        };
        let base = Url::parse("https://example.com/").ok();
        let images = collect_images(&doc, container(&doc), &HashSet::new(), &profile, base);
        assert_eq!(images, vec!["https://example.com/photo.jpg"]);
    }

    #[test]
    fn test_markers_only_match_whole_file_name_tokens() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://pixelcdn.example.com/news/silicon-valley-ceo.jpg">
            </head><body><article>
            <img src="/uploads/tracking-the-storm.jpg"><img src="/uploads/lexicon.jpg">
            <img src="/icons/site_logo.png"><img src="/uploads/favicon.ico?v=2">
            </article></body></html>"#;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://example.com/").ok();
        let images = collect_images(
            &doc,
            container(&doc),
            &HashSet::new(),
            &SiteProfile::default(),
            base,
        );
        assert_eq!(
            images,
            vec![
                "https://pixelcdn.example.com/news/silicon-valley-ceo.jpg",
                "https://example.com/uploads/tracking-the-storm.jpg",
                "https://example.com/uploads/lexicon.jpg",
            ]
        );
    }

    #[test]
    fn test_document_base_prefers_argument_then_canonical() {
        let doc = Html::parse_document(
            r#"<head><meta property="og:url" content="https://og.example.com/a">
               <link rel="canonical" href="https://canon.example.com/a"></head>"#,
        );
        assert_eq!(
            document_base(&doc, Some("https://given.example.com/")).unwrap().as_str(),
            "https://given.example.com/"
        );
        assert_eq!(
            document_base(&doc, None).unwrap().as_str(),
            "https://canon.example.com/a"
        );
    }

    #[test]
    fn test_resolve_protocol_relative_without_base() {
        assert_eq!(
            resolve_url("//cdn.example.com/a.jpg", None).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert_eq!(resolve_url("relative.jpg", None), None);
        assert_eq!(resolve_url("javascript:alert(1)", None), None);
    }
}
