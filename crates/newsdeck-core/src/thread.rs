// ── Bulk thread loader ──
//
// Loads a whole discussion with one upstream call instead of one fetch per
// comment, then writes every node into the cache so per-item observers see
// the same values.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{SwrCache, scope};
use crate::error::CoreError;
use crate::model::{ItemId, ThreadSnapshot};
use crate::rate_limit::RateLimiter;
use crate::upstream::Upstream;

pub struct ThreadLoader {
    upstream: Arc<dyn Upstream>,
    cache: Arc<SwrCache>,
    limiter: Arc<RateLimiter>,
    provider: String,
}

impl ThreadLoader {
    /// Tree fetches run under the `provider` quota.
    pub fn new(
        upstream: Arc<dyn Upstream>,
        cache: Arc<SwrCache>,
        limiter: Arc<RateLimiter>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            upstream,
            cache,
            limiter,
            provider: provider.into(),
        }
    }

    /// `Ok(None)` if the root does not exist.
    pub async fn load_thread(&self, root: ItemId) -> Result<Option<ThreadSnapshot>, CoreError> {
        let tree = self
            .limiter
            .throttle(&self.provider, || self.upstream.fetch_tree(root))
            .await?;
        let Some(tree) = tree else {
            return Ok(None);
        };

        let nodes = tree.flatten();
        debug!(%root, nodes = nodes.len(), "loaded thread");
        let mut items = HashMap::with_capacity(nodes.len());
        for item in nodes {
            let item = Arc::new(item);
            self.cache
                .set(scope::STORY, &item.id.to_string(), &item, None)
                .await;
            items.insert(item.id, item);
        }
        Ok(Some(ThreadSnapshot { root, items }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Item, ItemKind, ItemTree};
    use crate::test_support::{MockUpstream, story};

    fn comment(id: u64, parent: u64, children: Vec<ItemTree>) -> ItemTree {
        let mut item = Item::new(id, ItemKind::Comment);
        item.parent = Some(ItemId(parent));
        item.text = Some(format!("comment {id}"));
        ItemTree { item, children }
    }

    fn setup(mock: MockUpstream) -> (ThreadLoader, Arc<MockUpstream>, Arc<SwrCache>) {
        let mock = Arc::new(mock);
        let cache = Arc::new(SwrCache::default());
        let loader = ThreadLoader::new(
            Arc::clone(&mock) as Arc<dyn Upstream>,
            Arc::clone(&cache),
            Arc::new(RateLimiter::default()),
            "algolia",
        );
        (loader, mock, cache)
    }

    #[tokio::test]
    async fn thread_nodes_land_in_the_cache() {
        let mock = MockUpstream::default();
        mock.put_tree(ItemTree {
            item: story(1, "root"),
            children: vec![comment(2, 1, vec![comment(3, 2, vec![])]), comment(4, 1, vec![])],
        });
        let (loader, mock, cache) = setup(mock);

        let thread = loader.load_thread(ItemId(1)).await.unwrap().unwrap();
        assert_eq!(thread.len(), 4);
        assert_eq!(thread.root_item().unwrap().title.as_deref(), Some("root"));
        assert_eq!(thread.children_of(ItemId(1)).len(), 2);
        assert_eq!(mock.other_calls(), 1);
        assert_eq!(mock.call_count(), 0, "no per-item fetches");

        let reply: Arc<Item> = cache.get(scope::STORY, "3").await.unwrap();
        assert_eq!(reply.parent, Some(ItemId(2)));
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn missing_root_is_none() {
        let (loader, _, cache) = setup(MockUpstream::default());
        assert!(loader.load_thread(ItemId(9)).await.unwrap().is_none());
        assert!(cache.is_empty());
    }
}
