// ABOUTME: Deny-list predicates for page chrome, ads and widgets inside article markup.
// ABOUTME: Matches by tag name, ARIA role, inline visibility, and class/id markers.

use std::collections::HashSet;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use ego_tree::NodeId;
use once_cell::sync::Lazy;
use scraper::node::Element;
use scraper::ElementRef;

/// Tags whose whole subtree is dropped.
pub const STRIP_TAGS: &[&str] = &[
    "script",
    "style",
    "iframe",
    "noscript",
    "object",
    "embed",
    "applet",
    "frame",
    "frameset",
    "video",
    "audio",
    "canvas",
    "svg",
    "math",
    "template",
    "form",
    "input",
    "button",
    "select",
    "textarea",
    "label",
    "fieldset",
    "nav",
    "header",
    "footer",
    "aside",
    "menu",
    "dialog",
    "figcaption",
    "link",
    "meta",
    "title",
    "head",
];

const STRIP_ROLES: &[&str] = &[
    "banner",
    "complementary",
    "contentinfo",
    "navigation",
    "dialog",
    "alertdialog",
];

/// Short markers only match a whole `-`/`_` separated segment of a class or id.
const SEGMENT_MARKERS: &[&str] = &["ad", "ads", "adv", "reklam", "share", "social", "tags"];

/// Long markers match anywhere inside a class or id.
const SUBSTRING_MARKERS: &[&str] = &[
    "advert",
    "adsbygoogle",
    "banner",
    "sponsor",
    "related",
    "comment",
    "newsletter",
    "subscribe",
    "signup",
    "popup",
    "modal",
    "cookie",
    "consent",
    "promo",
    "sidebar",
    "widget",
    "breadcrumb",
    "pagination",
    "outbrain",
    "taboola",
    "most-read",
    "mostread",
    "most-viewed",
    "trending",
    "sharing",
    "share-",
    "social-",
    "fb-post",
    "fb-like",
    "twitter-tweet",
    "instagram-media",
    "tiktok-embed",
    "read-more",
    "more-news",
];

static SUBSTRING_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(SUBSTRING_MARKERS)
        .unwrap()
});

fn token_matches(token: &str) -> bool {
    if SUBSTRING_MATCHER.is_match(token) {
        return true;
    }
    token
        .split(['-', '_'])
        .any(|seg| SEGMENT_MARKERS.iter().any(|m| seg.eq_ignore_ascii_case(m)))
}

/// True when a class or id value carries a deny-listed marker.
pub fn has_denied_marker(el: &Element) -> bool {
    let classes = el.attr("class").unwrap_or_default();
    let id = el.attr("id").unwrap_or_default();
    classes
        .split_whitespace()
        .chain(std::iter::once(id).filter(|s| !s.is_empty()))
        .any(token_matches)
}

/// True when the element is hidden with inline markup.
pub fn is_hidden(el: &Element) -> bool {
    if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
        return true;
    }
    el.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

/// True when the element and everything below it should be dropped.
pub fn is_disallowed(el: &Element) -> bool {
    let tag = el.name();
    if STRIP_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t)) {
        return true;
    }
    if el
        .attr("role")
        .is_some_and(|role| STRIP_ROLES.iter().any(|r| role.trim().eq_ignore_ascii_case(r)))
    {
        return true;
    }
    has_denied_marker(el)
}

/// Marks every disallowed descendant of `root` (not `root` itself) in `skip`.
///
/// Descendants of a marked node are not visited.
pub fn mark_disallowed(root: ElementRef, skip: &mut HashSet<NodeId>) {
    let mut stack: Vec<_> = root.children().collect();
    while let Some(node) = stack.pop() {
        if skip.contains(&node.id()) {
            continue;
        }
        if let Some(el) = node.value().as_element() {
            if is_disallowed(el) || is_hidden(el) {
                skip.insert(node.id());
                continue;
            }
        }
        stack.extend(node.children());
    }
}
