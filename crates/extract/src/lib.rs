// ABOUTME: Library entry point for full-text article extraction.
// ABOUTME: Re-exports the extractor capability, registry, sanitizer and HTTP transport.

//! Article content extraction.
//!
//! Given an article URL (or an already fetched document), an [`Extractor`]
//! returns the cleaned article body and an ordered list of representative
//! images. The [`ExtractorRegistry`] picks an extractor per domain; most
//! extractors are a [`ProfileExtractor`] driven by [`SiteProfile`] data.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fulltext_extract::{builtin_registry, ExtractError, ExtractInput, HttpTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExtractError> {
//!     let transport = Arc::new(HttpTransport::builder().build()?);
//!     let registry = builtin_registry(transport)?;
//!     let url = "https://example.com/article";
//!     let extraction = registry.resolve(url).extract(ExtractInput::from(url)).await?;
//!     println!("{}", fulltext_extract::sanitize_html(&extraction.content));
//!     Ok(())
//! }
//! ```

pub mod dom;
pub mod error;
pub mod extractors;
pub mod options;
pub mod registry;
pub mod resource;
pub mod sanitize;
pub mod transport;

pub use crate::error::{ErrorKind, ExtractError};
pub use crate::extractors::engine::ProfileExtractor;
pub use crate::extractors::loader::{
    builtin_registry, load_builtin_profiles, load_profiles_from_str,
};
pub use crate::extractors::profile::{SelectorSpec, SiteProfile};
pub use crate::extractors::{
    ExtractInput, Extraction, Extractor, ItemMetadata, UnavailableExtractor,
};
pub use crate::options::{ExtractOptions, HttpTransportBuilder, DEFAULT_USER_AGENT};
pub use crate::registry::{normalize_domain, ExtractorRegistry};
pub use crate::resource::FetchResult;
pub use crate::sanitize::{sanitize_html, summarize, to_plain_text, truncate_text};
pub use crate::transport::{HttpTransport, Transport};
