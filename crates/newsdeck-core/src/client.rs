// ── NewsClient facade ──
//
// Owns the rate limiter, cache, batched loader, live registry and thread
// loader, wires them together from one `CoreConfig`, and is the single
// entry point consumers talk to. Cloning is cheap; all clones share state.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::cache::{PersistentStore, SwrCache, scope};
use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::live::{LiveItem, LiveItemList, LiveItemRegistry};
use crate::loader::BatchedLoader;
use crate::model::{Feed, Item, ItemId, SearchQuery, SearchResults, ThreadSnapshot, User};
use crate::rate_limit::RateLimiter;
use crate::thread::ThreadLoader;
use crate::upstream::Upstream;

const SERVICE: &str = "news client";

struct ClientInner {
    config: CoreConfig,
    upstream: Arc<dyn Upstream>,
    cache: Arc<SwrCache>,
    limiter: Arc<RateLimiter>,
    loader: BatchedLoader,
    registry: LiveItemRegistry,
    threads: ThreadLoader,
    destroyed: AtomicBool,
}

#[derive(Clone)]
pub struct NewsClient {
    inner: Arc<ClientInner>,
}

impl NewsClient {
    /// Build a client with an in-memory cache.
    pub fn new(config: CoreConfig, upstream: Arc<dyn Upstream>) -> Self {
        let cache = SwrCache::new(config.cache.clone());
        Self::assemble(config, upstream, cache)
    }

    /// Build a client whose cache writes through to `store`.
    pub fn with_store(
        config: CoreConfig,
        upstream: Arc<dyn Upstream>,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        let cache = SwrCache::new(config.cache.clone()).with_store(store);
        Self::assemble(config, upstream, cache)
    }

    fn assemble(config: CoreConfig, upstream: Arc<dyn Upstream>, cache: SwrCache) -> Self {
        let cache = Arc::new(cache);
        let limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));
        let loader = BatchedLoader::new(
            Arc::clone(&upstream),
            Arc::clone(&cache),
            Arc::clone(&limiter),
            config.batch,
            config.item_provider.clone(),
        );
        let registry = LiveItemRegistry::new(Arc::clone(&cache), loader.clone());
        let threads = ThreadLoader::new(
            Arc::clone(&upstream),
            Arc::clone(&cache),
            Arc::clone(&limiter),
            config.search_provider.clone(),
        );
        debug!(
            batch_size = config.batch.size,
            batch_delay_ms = config.batch.delay.as_millis(),
            item_provider = config.item_provider.as_deref().unwrap_or("<none>"),
            "news client ready"
        );
        Self {
            inner: Arc::new(ClientInner {
                config,
                upstream,
                cache,
                limiter,
                loader,
                registry,
                threads,
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    // ── Items ────────────────────────────────────────────────────────

    pub async fn item(&self, id: ItemId) -> Result<Option<Arc<Item>>, CoreError> {
        self.inner.loader.get_item(id, false).await
    }

    /// Items in the order requested; missing ids come back as `None`.
    pub async fn items(&self, ids: &[ItemId]) -> Result<Vec<Option<Arc<Item>>>, CoreError> {
        self.inner.loader.get_items(ids, false).await
    }

    /// Refetch `id` now, bypassing the cache. Live observers get the result.
    pub async fn refresh(&self, id: ItemId) -> Result<Option<Arc<Item>>, CoreError> {
        self.inner.loader.get_item(id, true).await
    }

    pub fn observe(&self, id: ItemId) -> LiveItem {
        self.inner.registry.observe(id)
    }

    pub fn observe_many(&self, ids: &[ItemId]) -> LiveItemList {
        self.inner.registry.observe_many(ids)
    }

    /// Load a whole thread in one request and seed the item cache with it.
    pub async fn thread(&self, root: ItemId) -> Result<Option<ThreadSnapshot>, CoreError> {
        self.ensure_alive()?;
        self.inner.threads.load_thread(root).await
    }

    // ── Feeds, users, search ─────────────────────────────────────────

    /// Ranked ids of `feed`.
    pub async fn feed(&self, feed: Feed, force_refresh: bool) -> Result<Vec<ItemId>, CoreError> {
        self.ensure_alive()?;
        let key = feed.to_string();
        if force_refresh {
            self.inner.cache.clear(scope::FEED, &key).await;
        }
        let ids = self
            .inner
            .cache
            .get_with_swr(scope::FEED, &key, || async {
                self.with_item_quota(|| self.inner.upstream.fetch_feed(feed))
                    .await
                    .map(Some)
            })
            .await?;
        Ok(ids.unwrap_or_default())
    }

    /// One page of a feed's items. Pages start at zero; a page past the
    /// end is empty.
    pub async fn feed_page(
        &self,
        feed: Feed,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Option<Arc<Item>>>, CoreError> {
        let ids = self.feed(feed, false).await?;
        let page_ids: Vec<ItemId> = ids
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect();
        self.items(&page_ids).await
    }

    pub async fn user(&self, name: &str) -> Result<Option<User>, CoreError> {
        self.ensure_alive()?;
        self.inner
            .cache
            .get_with_swr(scope::USER, name, || {
                self.with_item_quota(|| self.inner.upstream.fetch_user(name))
            })
            .await
    }

    /// Search, cached per distinct query and throttled under the search
    /// provider's quota.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, CoreError> {
        self.ensure_alive()?;
        let provider = &self.inner.config.search_provider;
        self.inner
            .cache
            .get_with_swr(scope::SEARCH, &query.cache_key(), || async {
                self.inner
                    .limiter
                    .throttle(provider, || self.inner.upstream.search(query))
                    .await
                    .map(Some)
            })
            .await?
            .ok_or_else(|| CoreError::Internal("search produced no results page".into()))
    }

    /// Feed and user lookups share the item provider's quota when one is set.
    async fn with_item_quota<F, Fut, T>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        match &self.inner.config.item_provider {
            Some(provider) => self.inner.limiter.throttle(provider, f).await,
            None => f().await,
        }
    }

    // ── Services ─────────────────────────────────────────────────────

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &Arc<SwrCache> {
        &self.inner.cache
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.inner.limiter
    }

    pub fn loader(&self) -> &BatchedLoader {
        &self.inner.loader
    }

    pub fn registry(&self) -> &LiveItemRegistry {
        &self.inner.registry
    }

    /// Stop accepting work. Queued item requests fail with
    /// `ServiceDestroyed`, as does every later call.
    pub fn shutdown(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.loader.shutdown();
        info!("news client shut down");
    }

    fn ensure_alive(&self) -> Result<(), CoreError> {
        if self.inner.destroyed.load(Ordering::Acquire) {
            return Err(CoreError::ServiceDestroyed { service: SERVICE });
        }
        Ok(())
    }
}
