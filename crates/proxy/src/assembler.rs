// ABOUTME: Feed assembly pipeline: fetch, filter, concurrent per-item extraction, serialize, cache.
// ABOUTME: Per-item failures drop the item; feed-level failures fail the request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fulltext_extract::{sanitize_html, summarize, ExtractInput, ExtractorRegistry};
use fulltext_feed::{clean_title, FeedError, FeedSource, RawFeed, RawFeedItem};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::Instrument;
use url::Url;

use crate::cache::ResultCache;
use crate::category::category_for_url;
use crate::config::ProxyConfig;
use crate::error::ProcessError;
use crate::filter::UrlFilter;
use crate::output::{ExtractedItem, FeedOutput};
use crate::request::{FeedRequest, OutputFormat};

/// A serialized response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: String,
    pub content_type: &'static str,
}

/// Liveness information for a health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: String,
    pub cache_size: usize,
    pub timestamp: DateTime<Utc>,
}

/// What every item task needs, shared behind one `Arc`.
struct ItemContext {
    registry: Arc<ExtractorRegistry>,
    item_deadline: Duration,
    summary_length: usize,
}

/// Turns feed URLs into full-text feeds.
pub struct FeedAssembler {
    config: ProxyConfig,
    source: Arc<dyn FeedSource>,
    registry: Arc<ExtractorRegistry>,
    filter: Arc<UrlFilter>,
    cache: Arc<ResultCache<Payload>>,
    in_flight: Mutex<InFlightMap>,
}

type InFlightMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// A claim on the per-fingerprint lock. Dropping the last claim removes the map entry.
struct InFlight<'a> {
    map: &'a Mutex<InFlightMap>,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn claim(map: &'a Mutex<InFlightMap>, key: &str) -> Self {
        let lock = {
            let mut in_flight = map.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(in_flight.entry(key.to_string()).or_default())
        };
        Self {
            map,
            key: key.to_string(),
            lock,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.map.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one held by this claim.
        if Arc::strong_count(&self.lock) <= 2 {
            in_flight.remove(&self.key);
        }
    }
}

impl FeedAssembler {
    pub fn new(
        config: ProxyConfig,
        source: Arc<dyn FeedSource>,
        registry: Arc<ExtractorRegistry>,
        filter: Arc<UrlFilter>,
    ) -> Self {
        let cache = Arc::new(ResultCache::new(config.cache_ttl));
        Self {
            config,
            source,
            registry,
            filter,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            service: self.config.service_name.clone(),
            cache_size: self.cache_size(),
            timestamp: Utc::now(),
        }
    }

    /// Starts the periodic cache sweep on the current runtime.
    pub fn spawn_cache_sweeper(&self) -> JoinHandle<()> {
        ResultCache::spawn_sweeper(Arc::clone(&self.cache), self.config.sweep_interval)
    }

    /// Serves `request` from cache or builds, caches and returns its payload.
    ///
    /// Concurrent misses for one fingerprint are serialized so the feed is
    /// processed once; later callers read the cached payload.
    pub async fn process_feed(&self, request: &FeedRequest) -> Result<Payload, ProcessError> {
        let key = request.fingerprint();
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(hit);
        }

        let claim = InFlight::claim(&self.in_flight, &key);
        let _guard = claim.lock.lock().await;
        match self.cache.get(&key) {
            Some(hit) => {
                tracing::debug!(key = %key, "Cache filled by concurrent request");
                Ok(hit)
            }
            None => {
                let span = tracing::info_span!(
                    "process_feed",
                    url = %request.source_url,
                    limit = request.limit,
                    format = %request.format
                );
                self.build_payload(request, &key).instrument(span).await
            }
        }
    }

    async fn build_payload(
        &self,
        request: &FeedRequest,
        key: &str,
    ) -> Result<Payload, ProcessError> {
        let deadline = Instant::now() + self.config.request_deadline;
        let feed = tokio::time::timeout_at(deadline, self.source.fetch_feed(&request.source_url))
            .await
            .map_err(|_| {
                ProcessError::Upstream(FeedError::fetch(
                    &request.source_url,
                    format!("no feed within {:?}", self.config.request_deadline),
                ))
            })??;
        let output = self.assemble_until(feed, request, deadline).await;

        let body = match request.format {
            OutputFormat::Json => output.to_json()?,
            OutputFormat::Rss => output.to_rss()?,
        };
        let payload = Payload {
            body,
            content_type: request.format.content_type(),
        };
        self.cache.set(key, payload.clone());

        tracing::info!(
            items_returned = output.items_returned,
            items_skipped = output.items_skipped,
            "Feed processed"
        );
        Ok(payload)
    }

    /// Filters, extracts and orders the items of `feed`.
    pub async fn assemble(&self, feed: RawFeed, request: &FeedRequest) -> FeedOutput {
        let deadline = Instant::now() + self.config.request_deadline;
        self.assemble_until(feed, request, deadline).await
    }

    async fn assemble_until(
        &self,
        feed: RawFeed,
        request: &FeedRequest,
        deadline: Instant,
    ) -> FeedOutput {
        let RawFeed {
            title,
            link,
            description,
            items,
            ..
        } = feed;
        let (accepted, items_skipped) = self.select_items(items, request.limit);
        let items = self.extract_all(accepted, deadline).await;

        FeedOutput {
            feed_title: title,
            feed_link: if link.is_empty() {
                request.source_url.clone()
            } else {
                link
            },
            feed_description: Some(description).filter(|d| !d.trim().is_empty()),
            items_returned: items.len(),
            items_skipped,
            items,
        }
    }

    /// Filter first, cap while scanning: items after the `limit`-th accepted
    /// item are neither counted nor processed.
    fn select_items(&self, items: Vec<RawFeedItem>, limit: usize) -> (Vec<RawFeedItem>, usize) {
        let mut accepted = Vec::new();
        let mut skipped = 0;
        for item in items {
            if accepted.len() >= limit {
                break;
            }
            let link = item.link.trim();
            if !is_http_url(link) {
                tracing::debug!(title = %item.title, "Skipping item without a usable link");
                skipped += 1;
                continue;
            }
            if !self.filter.should_process(link) {
                tracing::info!(link = %link, "Skipping filtered URL");
                skipped += 1;
                continue;
            }
            accepted.push(item);
        }
        (accepted, skipped)
    }

    async fn extract_all(&self, items: Vec<RawFeedItem>, deadline: Instant) -> Vec<ExtractedItem> {
        let ctx = Arc::new(ItemContext {
            registry: Arc::clone(&self.registry),
            item_deadline: self.config.item_deadline,
            summary_length: self.config.summary_length,
        });
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (position, item) in items.into_iter().enumerate() {
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            let span = tracing::debug_span!("item", link = %item.link);
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    extract_item(&ctx, item).await.map(|done| (position, done))
                }
                .instrument(span),
            );
        }

        let mut finished = Vec::new();
        let collect = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Some(done)) => finished.push(done),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(error = %err, "Item task failed"),
                }
            }
        };
        if tokio::time::timeout_at(deadline, collect).await.is_err() {
            tracing::warn!(
                pending = tasks.len(),
                deadline = ?self.config.request_deadline,
                "Request deadline reached, abandoning unfinished items"
            );
            tasks.abort_all();
        }

        finished.sort_by_key(|(position, _)| *position);
        finished.into_iter().map(|(_, item)| item).collect()
    }
}

/// Extracts one item. `None` means the item is dropped.
async fn extract_item(ctx: &ItemContext, item: RawFeedItem) -> Option<ExtractedItem> {
    let link = item.link.trim().to_string();
    let extractor = ctx.registry.resolve(&link);
    tracing::debug!(extractor = extractor.name(), "Extracting");

    let extraction = match tokio::time::timeout(
        ctx.item_deadline,
        extractor.extract(ExtractInput::Url(link.clone())),
    )
    .await
    {
        Ok(Ok(extraction)) => extraction,
        Ok(Err(err)) => {
            tracing::warn!(extractor = extractor.name(), error = %err, "Extraction failed, dropping item");
            return None;
        }
        Err(_) => {
            tracing::warn!(extractor = extractor.name(), deadline = ?ctx.item_deadline, "Extraction timed out, dropping item");
            return None;
        }
    };

    let mut content = sanitize_html(&extraction.content);
    if content.trim().is_empty() {
        content = item.body_html().map(sanitize_html).unwrap_or_default();
    }
    let mut summary = summarize(&content, ctx.summary_length);
    if summary.is_empty() {
        summary = item
            .summary
            .as_deref()
            .map(|s| summarize(s, ctx.summary_length))
            .unwrap_or_default();
    }

    let mut images = extraction.images;
    let fallbacks = [item.first_image_enclosure(), item.image_url.as_deref()];
    for image in fallbacks.into_iter().flatten() {
        let image = image.trim();
        if !image.is_empty() && !images.iter().any(|i| i == image) {
            images.push(image.to_string());
        }
    }

    Some(ExtractedItem {
        id: item_id(&link),
        title: clean_title(&item.title),
        category: category_for_url(&link).to_string(),
        link,
        summary,
        content,
        images,
        author: item.author,
        created_at: item.published_at.or(item.updated_at),
        updated_at: item.updated_at,
    })
}

/// Lowercase hex SHA-256 of the item link.
pub fn item_id(link: &str) -> String {
    format!("{:x}", Sha256::digest(link.as_bytes()))
}

fn is_http_url(link: &str) -> bool {
    Url::parse(link).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}
