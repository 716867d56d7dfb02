use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{StreamExt, StreamMap};

use super::{RegistryInner, Slot};
use crate::model::{Item, ItemId};

/// Releases one reference on the shared stream when dropped.
struct Subscription {
    id: ItemId,
    generation: u64,
    registry: Arc<RegistryInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.release(self.id, self.generation);
    }
}

/// A live handle on one item.
///
/// The handle keeps the shared stream alive; dropping it (or the stream
/// made from it) gives up this subscriber's reference.
pub struct LiveItem {
    rx: watch::Receiver<Slot>,
    subscription: Subscription,
}

impl LiveItem {
    pub(super) fn new(
        id: ItemId,
        generation: u64,
        rx: watch::Receiver<Slot>,
        registry: Arc<RegistryInner>,
    ) -> Self {
        Self {
            rx,
            subscription: Subscription {
                id,
                generation,
                registry,
            },
        }
    }

    pub fn id(&self) -> ItemId {
        self.subscription.id
    }

    /// The latest value, `None` if not loaded yet or the item is missing.
    pub fn current(&self) -> Option<Arc<Item>> {
        self.rx.borrow().clone().flatten()
    }

    /// `true` once the initial load (or an update) has produced a value.
    pub fn is_loaded(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the first value.
    pub async fn loaded(&mut self) -> Option<Arc<Item>> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone().flatten(),
            Err(_) => None,
        }
    }

    /// Wait for the next change, returning the new value.
    /// Returns `None` if the stream has been torn down.
    pub async fn changed(&mut self) -> Option<Option<Arc<Item>>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone().flatten())
    }

    /// Whether both handles are attached to the same shared stream.
    pub fn same_stream(&self, other: &LiveItem) -> bool {
        self.subscription.id == other.subscription.id
            && self.subscription.generation == other.subscription.generation
    }

    /// Convert into a `Stream` that yields the latest value on subscribe
    /// (once loaded) and every change after that.
    pub fn into_stream(self) -> LiveItemStream {
        LiveItemStream {
            inner: WatchStream::new(self.rx),
            _subscription: self.subscription,
        }
    }
}

/// `Stream` adapter over a [`LiveItem`].
pub struct LiveItemStream {
    inner: WatchStream<Slot>,
    _subscription: Subscription,
}

impl Stream for LiveItemStream {
    type Item = Option<Arc<Item>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                None => return Poll::Ready(None),
                // Not loaded yet.
                Some(None) => {}
                Some(Some(item)) => return Poll::Ready(Some(item)),
            }
        }
    }
}

/// Combined view over several live items.
pub type LiveItemListStream = Pin<Box<dyn Stream<Item = Vec<Option<Arc<Item>>>> + Send>>;

/// Live handles for several ids, kept in request order.
pub struct LiveItemList {
    items: Vec<LiveItem>,
}

impl LiveItemList {
    pub(super) fn new(items: Vec<LiveItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[LiveItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All current values, or `None` while any item is still loading.
    pub fn current(&self) -> Option<Vec<Option<Arc<Item>>>> {
        if !self.items.iter().all(LiveItem::is_loaded) {
            return None;
        }
        Some(self.items.iter().map(LiveItem::current).collect())
    }

    /// Emits once every item has a value, then again whenever any of them
    /// changes. An empty list emits one empty vector.
    pub fn into_stream(self) -> LiveItemListStream {
        let streams: Vec<LiveItemStream> =
            self.items.into_iter().map(LiveItem::into_stream).collect();
        Box::pin(async_stream::stream! {
            let len = streams.len();
            if len == 0 {
                let empty: Vec<Option<Arc<Item>>> = Vec::new();
                yield empty;
            } else {
                let mut merged = StreamMap::new();
                for (index, stream) in streams.into_iter().enumerate() {
                    merged.insert(index, stream);
                }
                let mut latest: Vec<Slot> = vec![None; len];
                while let Some((index, item)) = merged.next().await {
                    latest[index] = Some(item);
                    if latest.iter().all(Option::is_some) {
                        let snapshot: Vec<Option<Arc<Item>>> =
                            latest.iter().map(|slot| slot.clone().flatten()).collect();
                        yield snapshot;
                    }
                }
            }
        })
    }
}
