// ABOUTME: Request-scoped models for a parsed syndication feed.
// ABOUTME: RawFeed and RawFeedItem are read-only inputs to the assembler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A media enclosure (audio, video, or image attachment).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: Option<String>,
    pub length: u64,
}

impl Enclosure {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().starts_with("image/"))
    }
}

/// One entry of a feed as published upstream.
///
/// `link` may be empty or unparsable; such items are skipped by the assembler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeedItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    /// Full HTML body when the feed carries one (`content:encoded`, Atom content).
    pub content: Option<String>,
    /// HTML description/summary.
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub enclosures: Vec<Enclosure>,
}

impl RawFeedItem {
    /// First enclosure whose MIME type is `image/*`.
    pub fn first_image_enclosure(&self) -> Option<&str> {
        self.enclosures
            .iter()
            .find(|e| e.is_image())
            .map(|e| e.url.as_str())
    }

    /// Body HTML, falling back to the summary.
    pub fn body_html(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(self.summary.as_deref())
    }
}

/// A parsed feed with channel metadata and items in feed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeed {
    pub title: String,
    pub link: String,
    pub feed_url: String,
    pub description: String,
    pub language: Option<String>,
    pub image_url: Option<String>,
    pub items: Vec<RawFeedItem>,
}
