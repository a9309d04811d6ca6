// ABOUTME: TTL-keyed in-memory cache of serialized feed payloads.
// ABOUTME: Lazy eviction on read plus an optional periodic sweeper task.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Shortest period the sweeper runs at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Map from key to value with a fixed time-to-live.
///
/// An entry is stale once its age exceeds the TTL. Stale entries are evicted
/// when read or by [`ResultCache::cleanup`].
#[derive(Debug)]
pub struct ResultCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn is_stale(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) > self.ttl
    }

    /// Fresh value for `key`, evicting it if stale.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !self.is_stale(entry, now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.write();
        match entries.get(key) {
            Some(entry) if self.is_stale(entry, now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Stores `value`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.write().insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Removes every stale entry and returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_stale(entry, now));
        before - entries.len()
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<V: Clone + Send + Sync + 'static> ResultCache<V> {
    /// Runs [`cleanup`](Self::cleanup) every `every`, at least [`MIN_SWEEP_INTERVAL`],
    /// on a background task.
    pub fn spawn_sweeper(cache: Arc<Self>, every: Duration) -> JoinHandle<()> {
        let every = every.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                ticker.tick().await;
                let removed = cache.cleanup();
                tracing::info!(removed, size = cache.len(), "Cache sweep finished");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_set_get_and_replace() {
        let cache = ResultCache::new(TTL);
        assert!(cache.is_empty());
        cache.set("k", "v1".to_string());
        cache.set("k", "v2".to_string());
        assert_eq!(cache.get("k").as_deref(), Some("v2"));
        assert_eq!(cache.get("missing"), None);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_at_ttl_is_fresh_and_evicted_after() {
        let cache = ResultCache::new(TTL);
        cache.set("k", 1u32);

        tokio::time::advance(TTL).await;
        assert_eq!(cache.get("k"), Some(1));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_counts_only_stale_entries() {
        let cache = ResultCache::new(TTL);
        cache.set("old-1", 1u32);
        cache.set("old-2", 2u32);
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.set("new", 3u32);
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(cache.cleanup(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cleanup(), 0);
        assert_eq!(cache.get("new"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_stale_entries() {
        let cache = Arc::new(ResultCache::new(TTL));
        cache.set("k", 1u32);
        let sweeper = ResultCache::spawn_sweeper(Arc::clone(&cache), TTL * 2);

        tokio::time::sleep(TTL * 2 + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.len(), 0);
        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_sweep_interval_runs_at_floor() {
        let cache = Arc::new(ResultCache::new(Duration::ZERO));
        cache.set("k", 1u32);
        let sweeper = ResultCache::spawn_sweeper(Arc::clone(&cache), Duration::ZERO);

        tokio::time::sleep(MIN_SWEEP_INTERVAL + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert!(!sweeper.is_finished());
        assert_eq!(cache.len(), 0);
        sweeper.abort();
    }
}
