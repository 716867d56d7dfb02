// ── Live item registry ──
//
// One shared stream per observed item id. The first subscriber starts a
// driver that publishes the cached-or-fetched value followed by every cache
// update for that id; later subscribers attach to the same watch channel
// and see the latest value straight away. When the last handle is dropped
// the entry is removed on the spot and the driver is cancelled.

mod stream;

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{SwrCache, UpdateStream, scope};
use crate::loader::BatchedLoader;
use crate::model::{Item, ItemId};

pub use stream::{LiveItem, LiveItemList, LiveItemListStream, LiveItemStream};

/// `None` until the first value arrives, then the item or `Some(None)` if
/// it does not exist or could not be loaded.
pub(crate) type Slot = Option<Option<Arc<Item>>>;

struct SharedItemStream {
    generation: u64,
    ref_count: usize,
    tx: Arc<watch::Sender<Slot>>,
    cancel: CancellationToken,
}

struct RegistryInner {
    cache: Arc<SwrCache>,
    loader: BatchedLoader,
    streams: DashMap<ItemId, SharedItemStream>,
    next_generation: AtomicU64,
}

/// Ref-counted registry of live item streams. Cheap to clone.
#[derive(Clone)]
pub struct LiveItemRegistry {
    inner: Arc<RegistryInner>,
}

impl LiveItemRegistry {
    pub fn new(cache: Arc<SwrCache>, loader: BatchedLoader) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                cache,
                loader,
                streams: DashMap::new(),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to `id`. Every live handle for the same id shares one
    /// stream, one initial load and one cache subscription.
    pub fn observe(&self, id: ItemId) -> LiveItem {
        match self.inner.streams.entry(id) {
            Entry::Occupied(mut entry) => {
                let shared = entry.get_mut();
                shared.ref_count += 1;
                LiveItem::new(
                    id,
                    shared.generation,
                    shared.tx.subscribe(),
                    Arc::clone(&self.inner),
                )
            }
            Entry::Vacant(entry) => {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = watch::channel(None);
                let tx = Arc::new(tx);
                let cancel = CancellationToken::new();

                // Subscribe before the initial load so no update is missed.
                let updates = self.inner.cache.updates::<Item>(scope::STORY, &id.to_string());
                tokio::spawn(drive(
                    id,
                    self.inner.loader.clone(),
                    updates,
                    Arc::clone(&tx),
                    cancel.clone(),
                ));
                debug!(%id, "started live item stream");

                entry.insert(SharedItemStream {
                    generation,
                    ref_count: 1,
                    tx,
                    cancel,
                });
                LiveItem::new(id, generation, rx, Arc::clone(&self.inner))
            }
        }
    }

    /// Subscribe to several ids at once.
    pub fn observe_many(&self, ids: &[ItemId]) -> LiveItemList {
        LiveItemList::new(ids.iter().map(|id| self.observe(*id)).collect())
    }

    /// Ids with at least one live subscriber.
    pub fn active_count(&self) -> usize {
        self.inner.streams.len()
    }

    pub fn ref_count(&self, id: ItemId) -> usize {
        self.inner.streams.get(&id).map_or(0, |s| s.ref_count)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.inner.streams.contains_key(&id)
    }
}

impl RegistryInner {
    /// Called when a handle goes away. The entry is only touched if it is
    /// still the stream that handle was created from.
    fn release(&self, id: ItemId, generation: u64) {
        if let Entry::Occupied(mut entry) = self.streams.entry(id) {
            if entry.get().generation != generation {
                return;
            }
            let shared = entry.get_mut();
            shared.ref_count = shared.ref_count.saturating_sub(1);
            if shared.ref_count == 0 {
                let shared = entry.remove();
                shared.cancel.cancel();
                debug!(%id, "stopped live item stream");
            }
        }
    }
}

/// Publish the initial value and then every cache update until cancelled.
///
/// The loader answers from the cache when it can and writes what it fetches
/// back to it, which also reaches `updates`; `publish` drops that repeat.
async fn drive(
    id: ItemId,
    loader: BatchedLoader,
    mut updates: UpdateStream<Item>,
    tx: Arc<watch::Sender<Slot>>,
    cancel: CancellationToken,
) {
    let mut initial = pin!(async {
        match loader.get_item(id, false).await {
            Ok(item) => item,
            Err(err) => {
                warn!(%id, error = %err, "initial item load failed");
                None
            }
        }
    });
    let mut initial_done = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = &mut initial, if !initial_done => {
                initial_done = true;
                publish(&tx, item);
            }
            update = updates.next() => match update {
                Some(item) => publish(&tx, Some(Arc::new(item))),
                None => break,
            },
        }
    }
}

/// Consecutive identical values are not re-emitted.
fn publish(tx: &watch::Sender<Slot>, item: Option<Arc<Item>>) {
    tx.send_if_modified(|current| {
        if current.as_ref() == Some(&item) {
            return false;
        }
        *current = Some(item);
        true
    });
}
