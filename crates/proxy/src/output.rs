// ABOUTME: Assembled feed model and its JSON and RSS 2.0 serializations.
// ABOUTME: ExtractedItem is the per-article record; FeedOutput wraps items with feed metadata.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;

use crate::error::ProcessError;

/// One article with its extracted full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedItem {
    /// Lowercase hex SHA-256 of `link`.
    pub id: String,
    pub title: String,
    pub link: String,
    /// Truncated plain text.
    pub summary: String,
    /// Sanitized HTML.
    pub content: String,
    pub images: Vec<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The assembled response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedOutput {
    pub feed_title: String,
    pub feed_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_description: Option<String>,
    pub items_returned: usize,
    pub items_skipped: usize,
    pub items: Vec<ExtractedItem>,
}

impl FeedOutput {
    pub fn to_json(&self) -> Result<String, ProcessError> {
        serde_json::to_string_pretty(self).map_err(|e| ProcessError::Serialize(e.to_string()))
    }

    pub fn to_rss(&self) -> Result<String, ProcessError> {
        write_rss(self).map_err(|e| ProcessError::Serialize(e.to_string()))
    }
}

const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

fn write_rss(feed: &FeedOutput) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:content", CONTENT_NS));
    rss.push_attribute(("xmlns:dc", DC_NS));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &format!("{} - Full Text", feed.feed_title))?;
    text_element(&mut writer, "link", &feed.feed_link)?;
    let description = feed
        .feed_description
        .clone()
        .unwrap_or_else(|| format!("Full text feed of {}", feed.feed_title));
    text_element(&mut writer, "description", &description)?;
    text_element(&mut writer, "lastBuildDate", &Utc::now().to_rfc2822())?;

    for item in &feed.items {
        write_item(&mut writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_item(writer: &mut Writer<Cursor<Vec<u8>>>, item: &ExtractedItem) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    text_element(writer, "title", &item.title)?;
    text_element(writer, "link", &item.link)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&item.id)))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    text_element(writer, "description", &item.summary)?;
    text_element(writer, "content:encoded", &item.content)?;
    text_element(writer, "category", &item.category)?;
    if let Some(author) = &item.author {
        text_element(writer, "dc:creator", author)?;
    }
    if let Some(date) = item.created_at.or(item.updated_at) {
        text_element(writer, "pubDate", &date.to_rfc2822())?;
    }
    if let Some(image) = item.images.first() {
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", image.as_str()));
        enclosure.push_attribute(("type", image_mime_type(image)));
        enclosure.push_attribute(("length", "0"));
        writer.write_event(Event::Empty(enclosure))?;
    }

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn image_mime_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default().to_lowercase();
    match path.rsplit('.').next() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> FeedOutput {
        FeedOutput {
            feed_title: "News & Views".into(),
            feed_link: "https://example.com/".into(),
            feed_description: None,
            items_returned: 1,
            items_skipped: 2,
            items: vec![ExtractedItem {
                id: "abc".into(),
                title: "A <b>bold</b> claim".into(),
                link: "https://example.com/a".into(),
                summary: "Short".into(),
                content: "<p>Body &amp; more</p>".into(),
                images: vec!["https://example.com/a.png?w=1".into()],
                category: "world".into(),
                author: Some("Ayşe".into()),
                created_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).single(),
                updated_at: None,
            }],
        }
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["feed_title"], "News & Views");
        assert_eq!(json["items_returned"], 1);
        assert_eq!(json["items_skipped"], 2);
        assert!(json.get("feed_description").is_none());
        assert_eq!(json["items"][0]["created_at"], "2025-01-02T03:04:05Z");
        assert_eq!(json["items"][0]["images"][0], "https://example.com/a.png?w=1");
    }

    #[test]
    fn test_rss_escapes_and_titles() {
        let rss = sample().to_rss().unwrap();
        assert!(rss.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(rss.contains("<title>News &amp; Views - Full Text</title>"));
        assert!(rss.contains("<title>A &lt;b&gt;bold&lt;/b&gt; claim</title>"));
        assert!(rss.contains("&lt;p&gt;Body &amp;amp; more&lt;/p&gt;"));
        assert!(rss.contains("<guid isPermaLink=\"false\">abc</guid>"));
        assert!(rss.contains("Jan 2025 03:04:05 +0000</pubDate>"));
        assert!(rss.contains("type=\"image/png\""));
    }
}
