// ABOUTME: Image URL helpers for feed items without media thumbnails.
// ABOUTME: Picks the first usable <img> from item HTML and resolves it against the item link.

use scraper::{Html, Selector};
use url::Url;

/// File name tokens marking tracking pixels and spacers.
const PIXEL_MARKERS: &[&str] = &["pixel", "beacon", "spacer", "blank", "clear", "1x1"];

/// Returns the first `<img src>` in `html` that resolves to an http(s) URL and is not a pixel.
pub fn extract_first_image(html: &str, base_url: Option<&str>) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img[src]").ok()?;
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| resolve_image_url(src, base_url))
        .find(|url| !is_pixel(url))
}

/// True when a `-`, `_` or `.` separated token of the file name is a pixel marker.
fn is_pixel(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(name) = parsed.path_segments().and_then(|mut s| s.next_back()) else {
        return false;
    };
    name.split(['-', '_', '.'])
        .any(|token| PIXEL_MARKERS.iter().any(|m| token.eq_ignore_ascii_case(m)))
}

/// Resolves `src` against `base_url`. Only http(s) results are returned.
pub fn resolve_image_url(src: &str, base_url: Option<&str>) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    let resolved = match Url::parse(src) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base_url.and_then(|b| Url::parse(b).ok());
            match base {
                Some(base) => base.join(src).ok()?,
                None if src.starts_with("//") => Url::parse(&format!("https:{src}")).ok()?,
                None => return None,
            }
        }
        Err(_) => return None,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
