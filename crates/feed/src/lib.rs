// ABOUTME: Feed parsing and fetching library for the full-text proxy.
// ABOUTME: Provides the RawFeed model, the feed-rs based parser and the FeedSource contract.

pub mod error;
pub mod html_utils;
pub mod image_utils;
pub mod models;
pub mod parser;
pub mod source;

pub use error::FeedError;
pub use html_utils::{clean_title, collapse_whitespace, decode_entities, strip_html};
pub use image_utils::{extract_first_image, resolve_image_url};
pub use models::{Enclosure, RawFeed, RawFeedItem};
pub use parser::parse_feed_bytes;
pub use source::{FeedSource, HttpFeedSource, HttpFeedSourceBuilder};
