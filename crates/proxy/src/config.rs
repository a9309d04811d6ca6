// ABOUTME: Runtime settings for the feed proxy: cache lifetime, deadlines, fan-out and limits.
// ABOUTME: ProxyConfig carries defaults; ProxyConfigBuilder offers fluent overrides.

use std::time::Duration;

/// Settings shared by every request an assembler serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Age after which a cached payload is stale.
    pub cache_ttl: Duration,
    /// Interval of the background cache sweep.
    pub sweep_interval: Duration,
    /// Upper bound on processing one feed request.
    pub request_deadline: Duration,
    /// Upper bound on extracting one item.
    pub item_deadline: Duration,
    /// Items extracted at the same time within one request.
    pub max_concurrency: usize,
    /// Items returned when the request gives no usable limit.
    pub default_limit: usize,
    /// Largest limit a request may ask for.
    pub max_limit: usize,
    /// Character budget of item summaries.
    pub summary_length: usize,
    /// Service name reported by health checks.
    pub service_name: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(2 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            request_deadline: Duration::from_secs(45),
            item_deadline: Duration::from_secs(20),
            max_concurrency: 8,
            default_limit: 10,
            max_limit: 50,
            summary_length: 300,
            service_name: "fulltext".to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::new()
    }
}

/// Builder for [`ProxyConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn sweep_interval(mut self, every: Duration) -> Self {
        self.config.sweep_interval = every.max(crate::cache::MIN_SWEEP_INTERVAL);
        self
    }

    pub fn request_deadline(mut self, deadline: Duration) -> Self {
        self.config.request_deadline = deadline;
        self
    }

    pub fn item_deadline(mut self, deadline: Duration) -> Self {
        self.config.item_deadline = deadline;
        self
    }

    /// Clamped to at least one.
    pub fn max_concurrency(mut self, permits: usize) -> Self {
        self.config.max_concurrency = permits.max(1);
        self
    }

    pub fn default_limit(mut self, limit: usize) -> Self {
        self.config.default_limit = limit.max(1);
        self
    }

    pub fn max_limit(mut self, limit: usize) -> Self {
        self.config.max_limit = limit.max(1);
        self
    }

    pub fn summary_length(mut self, chars: usize) -> Self {
        self.config.summary_length = chars;
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Finishes the builder. The default limit never exceeds the maximum.
    pub fn build(self) -> ProxyConfig {
        let mut config = self.config;
        config.default_limit = config.default_limit.min(config.max_limit);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(7200));
        assert_eq!(config.request_deadline, Duration::from_secs(45));
        assert_eq!(config.item_deadline, Duration::from_secs(20));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!((config.default_limit, config.max_limit), (10, 50));
    }

    #[test]
    fn test_builder_overrides_and_clamps() {
        let config = ProxyConfig::builder()
            .max_concurrency(0)
            .max_limit(5)
            .item_deadline(Duration::from_secs(3))
            .build();
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.default_limit, 5);
        assert_eq!(config.item_deadline, Duration::from_secs(3));
    }
}
