// ABOUTME: Feed parsing implementation using feed-rs.
// ABOUTME: Maps RSS, Atom and JSON Feed documents onto RawFeed/RawFeedItem.

use std::collections::HashSet;

use feed_rs::model::{Entry, Feed as FeedRsFeed, Link, Person};
use url::Url;

use crate::error::FeedError;
use crate::html_utils::clean_title;
use crate::image_utils::{extract_first_image, resolve_image_url};
use crate::models::{Enclosure, RawFeed, RawFeedItem};

/// Parses feed bytes into a RawFeed.
///
/// `feed_url` is the URL the bytes were fetched from; it is stored as-is and
/// used to resolve a relative channel link.
pub fn parse_feed_bytes(data: &[u8], feed_url: &str) -> Result<RawFeed, FeedError> {
    let parsed = feed_rs::parser::parse(data).map_err(FeedError::parse)?;

    let items = parsed.entries.iter().map(map_entry).collect();

    Ok(RawFeed {
        title: parsed
            .title
            .as_ref()
            .map(|t| clean_title(&t.content))
            .unwrap_or_default(),
        link: extract_home_url(&parsed.links, feed_url),
        feed_url: feed_url.to_string(),
        description: parsed
            .description
            .as_ref()
            .map(|d| d.content.trim().to_string())
            .unwrap_or_default(),
        language: parsed.language.clone(),
        image_url: extract_feed_image(&parsed),
        items,
    })
}

fn is_enclosure_link(link: &Link) -> bool {
    link.rel.as_deref() == Some("enclosure")
}

/// Prefers rel="alternate", then the first link; relative links resolve against the feed URL.
fn extract_home_url(links: &[Link], feed_url: &str) -> String {
    let href = links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();
    if href.is_empty() || Url::parse(&href).is_ok() {
        return href;
    }
    Url::parse(feed_url)
        .and_then(|base| base.join(&href))
        .map(|u| u.to_string())
        .unwrap_or(href)
}

/// Prefers rel="alternate", then the first non-enclosure link, then a permalink guid.
fn extract_item_url(entry: &Entry) -> String {
    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.iter().find(|l| !is_enclosure_link(l)))
        .map(|l| l.href.trim().to_string());
    if let Some(link) = link.filter(|l| !l.is_empty()) {
        return link;
    }
    let id = entry.id.trim();
    match Url::parse(id) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => id.to_string(),
        _ => String::new(),
    }
}

fn extract_feed_image(feed: &FeedRsFeed) -> Option<String> {
    feed.logo
        .as_ref()
        .or(feed.icon.as_ref())
        .map(|img| img.uri.clone())
}

fn map_entry(entry: &Entry) -> RawFeedItem {
    let link = extract_item_url(entry);

    let summary = entry
        .summary
        .as_ref()
        .map(|t| t.content.clone())
        .filter(|s| !s.trim().is_empty());
    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .filter(|s| !s.trim().is_empty());

    let enclosures = extract_enclosures(entry);
    let base = (!link.is_empty()).then_some(link.as_str());
    let image_url = select_item_image(entry, content.as_deref(), summary.as_deref(), base);

    RawFeedItem {
        title: entry
            .title
            .as_ref()
            .map(|t| clean_title(&t.content))
            .unwrap_or_default(),
        link,
        guid: entry.id.clone(),
        content,
        summary,
        image_url,
        published_at: entry.published.or(entry.updated),
        updated_at: entry.updated.or(entry.published),
        author: entry.authors.first().and_then(person_name),
        categories: entry.categories.iter().map(|c| c.term.clone()).collect(),
        enclosures,
    }
}

/// Collects enclosures from rel="enclosure" links and media content, deduplicated by URL and type.
fn extract_enclosures(entry: &Entry) -> Vec<Enclosure> {
    let mut enclosures = Vec::new();
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();

    for link in entry.links.iter().filter(|l| is_enclosure_link(l)) {
        let mime_type = link.media_type.clone();
        if seen.insert((link.href.clone(), mime_type.clone())) {
            enclosures.push(Enclosure {
                url: link.href.clone(),
                mime_type,
                length: link.length.unwrap_or(0),
            });
        }
    }

    for content in entry.media.iter().flat_map(|m| m.content.iter()) {
        if let Some(ref url) = content.url {
            let mime_type = content.content_type.as_ref().map(|m| m.to_string());
            if seen.insert((url.to_string(), mime_type.clone())) {
                enclosures.push(Enclosure {
                    url: url.to_string(),
                    mime_type,
                    length: content.size.unwrap_or(0),
                });
            }
        }
    }

    enclosures
}

/// Media thumbnails first, then the first usable image in the item HTML.
fn select_item_image(
    entry: &Entry,
    content_html: Option<&str>,
    summary_html: Option<&str>,
    base_url: Option<&str>,
) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .find_map(|t| resolve_image_url(&t.image.uri, base_url));
    if thumbnail.is_some() {
        return thumbnail;
    }
    content_html
        .and_then(|html| extract_first_image(html, base_url))
        .or_else(|| summary_html.and_then(|html| extract_first_image(html, base_url)))
}

fn person_name(person: &Person) -> Option<String> {
    let name = person.name.trim();
    if !name.is_empty() {
        return Some(name.to_string());
    }
    person.email.as_ref().map(|e| e.trim().to_string())
}
