// ABOUTME: Full-text feed proxy core: URL filtering, result caching and feed assembly.
// ABOUTME: Re-exports FeedAssembler, FeedRequest, ProxyConfig and the output model.

//! Converts syndication feeds into full-text feeds.
//!
//! [`FeedAssembler::process_feed`] fetches a feed through a
//! [`FeedSource`](fulltext_feed::FeedSource), drops items rejected by the
//! [`UrlFilter`], extracts the remaining items concurrently through an
//! [`ExtractorRegistry`](fulltext_extract::ExtractorRegistry) and returns the
//! result serialized as JSON or RSS 2.0. Payloads are cached per request
//! fingerprint.

pub mod assembler;
pub mod cache;
pub mod category;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod request;

pub use assembler::{item_id, FeedAssembler, HealthReport, Payload};
pub use cache::{ResultCache, MIN_SWEEP_INTERVAL};
pub use category::{category_for_url, DEFAULT_CATEGORY};
pub use config::{ProxyConfig, ProxyConfigBuilder};
pub use error::ProcessError;
pub use filter::{FilterRule, UrlFilter};
pub use output::{ExtractedItem, FeedOutput};
pub use request::{FeedRequest, OutputFormat};
