// ── Runtime configuration ──
//
// These types describe *how* the data layer batches, caches and throttles.
// They never touch disk: newsdeck-config (or any embedder) constructs a
// `CoreConfig` and hands it in.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::scope;

/// Provider key of the Algolia search API.
pub const ALGOLIA_PROVIDER: &str = "algolia";

/// Provider key of the HN item API.
pub const HN_PROVIDER: &str = "hn";

/// Sliding-window quota for one external provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: usize,
    pub window: Duration,
}

impl RateLimit {
    /// Applied to provider keys that have no configured limit.
    pub const CONSERVATIVE: Self = Self::new(10, Duration::from_secs(60));

    pub const fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Admission control for the batched loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Queue length that forces an immediate flush.
    pub size: usize,
    /// How long the first queued request waits for company.
    pub delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 20,
            delay: Duration::from_millis(50),
        }
    }
}

/// TTL policy for the SWR cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for scopes without an explicit entry.
    pub default_ttl: Duration,
    /// Per-scope TTL overrides.
    pub scope_ttls: HashMap<String, Duration>,
}

impl CacheConfig {
    /// TTL applied by `set` when the caller passes none.
    pub fn ttl_for(&self, scope: &str) -> Duration {
        self.scope_ttls
            .get(scope)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let scope_ttls = HashMap::from([
            (scope::STORY.to_owned(), Duration::from_secs(5 * 60)),
            (scope::USER.to_owned(), Duration::from_secs(10 * 60)),
            (scope::FEED.to_owned(), Duration::from_secs(2 * 60)),
            (scope::SEARCH.to_owned(), Duration::from_secs(5 * 60)),
        ]);
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            scope_ttls,
        }
    }
}

/// Complete configuration for a [`NewsClient`](crate::NewsClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub batch: BatchConfig,
    pub cache: CacheConfig,
    /// Provider quotas, read once when the rate limiter is built.
    pub rate_limits: HashMap<String, RateLimit>,
    /// Provider whose quota applies to per-item fetches. `None` = unthrottled.
    pub item_provider: Option<String>,
    /// Provider whose quota applies to search and thread fetches.
    pub search_provider: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            cache: CacheConfig::default(),
            rate_limits: HashMap::from([(
                ALGOLIA_PROVIDER.to_owned(),
                RateLimit::new(10_000, Duration::from_secs(60 * 60)),
            )]),
            item_provider: None,
            search_provider: ALGOLIA_PROVIDER.to_owned(),
        }
    }
}
