// ── In-memory upstream for unit tests ──

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::CoreError;
use crate::model::{Feed, Item, ItemId, ItemKind, ItemTree, SearchQuery, SearchResults, User};
use crate::upstream::Upstream;

pub(crate) fn story(id: u64, title: &str) -> Item {
    let mut item = Item::new(id, ItemKind::Story);
    item.title = Some(title.to_owned());
    item.by = Some("pg".to_owned());
    item
}

pub(crate) fn boom() -> CoreError {
    CoreError::Upstream {
        message: "boom".into(),
        status: Some(503),
    }
}

#[derive(Default)]
pub(crate) struct MockUpstream {
    items: Mutex<HashMap<ItemId, Item>>,
    trees: Mutex<HashMap<ItemId, ItemTree>>,
    feeds: Mutex<HashMap<Feed, Vec<ItemId>>>,
    users: Mutex<HashMap<String, User>>,
    failing: Mutex<HashSet<ItemId>>,
    /// (id, virtual time) of every `fetch_item` call.
    calls: Mutex<Vec<(ItemId, Instant)>>,
    latency: Mutex<Duration>,
    other_calls: AtomicUsize,
}

impl MockUpstream {
    pub(crate) fn with_stories(ids: impl IntoIterator<Item = u64>) -> Self {
        let mock = Self::default();
        for id in ids {
            mock.put(story(id, &format!("story {id}")));
        }
        mock
    }

    pub(crate) fn put(&self, item: Item) {
        self.items.lock().unwrap().insert(item.id, item);
    }

    pub(crate) fn put_tree(&self, tree: ItemTree) {
        self.trees.lock().unwrap().insert(tree.item.id, tree);
    }

    pub(crate) fn put_feed(&self, feed: Feed, ids: Vec<u64>) {
        self.feeds
            .lock()
            .unwrap()
            .insert(feed, ids.into_iter().map(ItemId).collect());
    }

    pub(crate) fn put_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub(crate) fn fail(&self, id: u64) {
        self.failing.lock().unwrap().insert(ItemId(id));
    }

    pub(crate) fn heal(&self, id: u64) {
        self.failing.lock().unwrap().remove(&ItemId(id));
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn calls(&self) -> Vec<(ItemId, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, id: u64) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called.get() == id)
            .count()
    }

    /// Calls to anything but `fetch_item`.
    pub(crate) fn other_calls(&self) -> usize {
        self.other_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>, CoreError> {
        self.calls.lock().unwrap().push((id, Instant::now()));
        self.pause().await;
        if self.failing.lock().unwrap().contains(&id) {
            return Err(boom());
        }
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn fetch_user(&self, name: &str) -> Result<Option<User>, CoreError> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().get(name).cloned())
    }

    async fn fetch_feed(&self, feed: Feed) -> Result<Vec<ItemId>, CoreError> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .feeds
            .lock()
            .unwrap()
            .get(&feed)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_tree(&self, root: ItemId) -> Result<Option<ItemTree>, CoreError> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trees.lock().unwrap().get(&root).cloned())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResults, CoreError> {
        self.other_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SearchResults {
            hits: Vec::new(),
            total: 0,
            page: query.page,
            pages: 0,
        })
    }
}
