// ── Upstream seam ──
//
// Everything the data layer needs from the outside world. `HttpUpstream`
// talks to the public HN and Algolia APIs; tests plug in their own.

use async_trait::async_trait;
use tracing::debug;

use newsdeck_api::{AlgoliaClient, FeedEndpoint, HnClient, SearchParams, TransportConfig};

use crate::error::CoreError;
use crate::model::{Feed, Item, ItemId, ItemTree, SearchQuery, SearchResults, User};

/// Opaque fetch operations behind the data layer.
///
/// Only `fetch_item` is required. A missing entity resolves to `Ok(None)`;
/// errors are reserved for transport and decode failures.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>, CoreError>;

    async fn fetch_user(&self, _name: &str) -> Result<Option<User>, CoreError> {
        Err(unsupported("fetch_user"))
    }

    async fn fetch_feed(&self, _feed: Feed) -> Result<Vec<ItemId>, CoreError> {
        Err(unsupported("fetch_feed"))
    }

    /// A whole thread in one request.
    async fn fetch_tree(&self, _root: ItemId) -> Result<Option<ItemTree>, CoreError> {
        Err(unsupported("fetch_tree"))
    }

    async fn search(&self, _query: &SearchQuery) -> Result<SearchResults, CoreError> {
        Err(unsupported("search"))
    }
}

fn unsupported(operation: &str) -> CoreError {
    CoreError::Unsupported {
        operation: operation.to_owned(),
    }
}

// ── HTTP implementation ──────────────────────────────────────────────

/// [`Upstream`] over the HN item API (items, users, feeds) and the Algolia
/// API (threads, search).
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    hn: HnClient,
    algolia: AlgoliaClient,
}

impl HttpUpstream {
    pub fn new(hn: HnClient, algolia: AlgoliaClient) -> Self {
        Self { hn, algolia }
    }

    /// Build both clients from base URLs sharing one transport config.
    pub fn from_endpoints(
        hn_url: url::Url,
        algolia_url: url::Url,
        transport: &TransportConfig,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            hn: HnClient::new(hn_url, transport)?,
            algolia: AlgoliaClient::new(algolia_url, transport)?,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>, CoreError> {
        debug!(%id, "fetching item");
        Ok(self.hn.item(id.get()).await?.map(Item::from))
    }

    async fn fetch_user(&self, name: &str) -> Result<Option<User>, CoreError> {
        Ok(self.hn.user(name).await?.map(User::from))
    }

    async fn fetch_feed(&self, feed: Feed) -> Result<Vec<ItemId>, CoreError> {
        let ids = self.hn.feed(FeedEndpoint::from(feed)).await?;
        Ok(ids.into_iter().map(ItemId).collect())
    }

    async fn fetch_tree(&self, root: ItemId) -> Result<Option<ItemTree>, CoreError> {
        Ok(self.algolia.item_tree(root.get()).await?.map(ItemTree::from))
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResults, CoreError> {
        let params = SearchParams::from(query);
        Ok(self.algolia.search(&params).await?.into())
    }
}
