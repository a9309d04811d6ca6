// ABOUTME: Extractor capability: tagged input, extraction result and the Extractor trait.
// ABOUTME: Hosts the profile-driven engine, image collection, selector cache and profile loader.

//! Content extraction.
//!
//! An [`Extractor`] turns a URL, a raw HTML document or feed item metadata
//! into cleaned article content plus an ordered list of image URLs.
//!
//! Submodules:
//! - `profile`: site profile data model.
//! - `engine`: the generic extractor driven by a profile.
//! - `images`: representative image collection.
//! - `compiled`: process-wide CSS selector cache.
//! - `loader`: embedded profile corpus.

pub mod compiled;
pub mod engine;
pub mod images;
pub mod loader;
pub mod profile;

use async_trait::async_trait;

use crate::error::ExtractError;

/// Metadata of a feed item handed to an extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMetadata {
    pub link: Option<String>,
    pub image: Option<String>,
    pub title: Option<String>,
}

/// What an extractor is asked to work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractInput {
    /// An article URL to fetch.
    Url(String),
    /// An already fetched document.
    Html {
        html: String,
        base_url: Option<String>,
    },
    /// A feed item; its link is fetched and its image appended.
    Item(ItemMetadata),
}

impl ExtractInput {
    /// URL associated with the input, used in errors and logs.
    pub fn url(&self) -> &str {
        match self {
            ExtractInput::Url(url) => url,
            ExtractInput::Html { base_url, .. } => base_url.as_deref().unwrap_or_default(),
            ExtractInput::Item(meta) => meta.link.as_deref().unwrap_or_default(),
        }
    }
}

impl From<&str> for ExtractInput {
    fn from(url: &str) -> Self {
        ExtractInput::Url(url.to_string())
    }
}

/// Cleaned content and ordered, unique image URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub content: String,
    pub images: Vec<String>,
}

impl Extraction {
    /// Appends `url` unless it is empty or already present.
    pub fn push_image(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !url.trim().is_empty() && !self.images.contains(&url) {
            self.images.push(url);
        }
    }

    pub fn first_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Produces article content for one family of pages.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn extract(&self, input: ExtractInput) -> Result<Extraction, ExtractError>;
}

/// Stand-in returned when a registry has neither a match nor a default.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableExtractor;

#[async_trait]
impl Extractor for UnavailableExtractor {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn extract(&self, input: ExtractInput) -> Result<Extraction, ExtractError> {
        Err(ExtractError::unsupported_input(
            input.url(),
            "Resolve",
            Some(anyhow::anyhow!("no extractor available")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_image_dedupes() {
        let mut ex = Extraction::default();
        ex.push_image("https://a/1.jpg");
        ex.push_image("https://a/1.jpg");
        ex.push_image("");
        ex.push_image("https://a/2.jpg");
        assert_eq!(ex.images, vec!["https://a/1.jpg", "https://a/2.jpg"]);
        assert_eq!(ex.first_image(), Some("https://a/1.jpg"));
    }

    #[tokio::test]
    async fn test_unavailable_extractor_always_fails() {
        let err = UnavailableExtractor
            .extract(ExtractInput::from("https://example.com/a"))
            .await
            .unwrap_err();
        assert!(err.is_unsupported_input());
        assert!(err.to_string().contains("no extractor available"));
    }
}
