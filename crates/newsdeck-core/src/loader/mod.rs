// ── Batched item loader ──
//
// Coalesces per-id item requests into bounded batches. Requests for an id
// that is already being fetched join that fetch instead of queueing again.
// A batch flushes as soon as `batch.size` requests are queued, or
// `batch.delay` after the first request of a quiet period.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{SwrCache, scope};
use crate::config::BatchConfig;
use crate::error::CoreError;
use crate::model::{Item, ItemId};
use crate::rate_limit::RateLimiter;
use crate::upstream::Upstream;

const SERVICE: &str = "batched loader";

type ItemResult = Result<Option<Arc<Item>>, CoreError>;
type SharedFetch = Shared<BoxFuture<'static, ItemResult>>;

/// A queued request waiting for its batch.
struct PendingRequest {
    id: ItemId,
    token: u64,
    responder: oneshot::Sender<ItemResult>,
}

/// The fetch every concurrent caller for one id awaits.
struct InFlight {
    token: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct Queue {
    pending: VecDeque<PendingRequest>,
    /// Armed flush timer and its generation.
    timer: Option<(u64, JoinHandle<()>)>,
    timer_generation: u64,
}

struct LoaderInner {
    upstream: Arc<dyn Upstream>,
    cache: Arc<SwrCache>,
    limiter: Arc<RateLimiter>,
    config: BatchConfig,
    item_provider: Option<String>,
    queue: Mutex<Queue>,
    in_flight: DashMap<ItemId, InFlight>,
    next_token: AtomicU64,
    destroyed: AtomicBool,
}

/// Batching, deduplicating item fetcher. Cheap to clone.
#[derive(Clone)]
pub struct BatchedLoader {
    inner: Arc<LoaderInner>,
}

impl BatchedLoader {
    /// `item_provider` names the rate-limit quota item fetches run under;
    /// `None` leaves them unthrottled.
    pub fn new(
        upstream: Arc<dyn Upstream>,
        cache: Arc<SwrCache>,
        limiter: Arc<RateLimiter>,
        config: BatchConfig,
        item_provider: Option<String>,
    ) -> Self {
        let config = BatchConfig {
            size: config.size.max(1),
            ..config
        };
        Self {
            inner: Arc::new(LoaderInner {
                upstream,
                cache,
                limiter,
                config,
                item_provider,
                queue: Mutex::new(Queue::default()),
                in_flight: DashMap::new(),
                next_token: AtomicU64::new(0),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Load one item. `Ok(None)` means the upstream has no such item.
    ///
    /// Unless `force_refresh` is set, a fresh cached copy is returned
    /// immediately and a fetch already in flight for `id` is shared.
    pub async fn get_item(&self, id: ItemId, force_refresh: bool) -> ItemResult {
        self.inner.ensure_alive()?;
        if !force_refresh {
            if let Some(item) = self.inner.cache.get(scope::STORY, &id.to_string()).await {
                return Ok(Some(item));
            }
        }
        let fetch = self.inner.join_or_enqueue(id, force_refresh)?;
        fetch.await
    }

    /// Load many items, preserving order. Fails if any batch involved fails.
    pub async fn get_items(
        &self,
        ids: &[ItemId],
        force_refresh: bool,
    ) -> Result<Vec<Option<Arc<Item>>>, CoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        future::try_join_all(ids.iter().map(|id| self.get_item(*id, force_refresh))).await
    }

    /// Stop the loader. Queued requests fail with `ServiceDestroyed` and so
    /// does every later call. Batches already fetching still complete.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Requests waiting for a flush.
    pub fn queued_len(&self) -> usize {
        self.inner.lock_queue().pending.len()
    }

    /// Ids with a fetch in progress.
    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.len()
    }
}

impl LoaderInner {
    fn ensure_alive(&self) -> Result<(), CoreError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(CoreError::ServiceDestroyed { service: SERVICE });
        }
        Ok(())
    }

    fn lock_queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the in-flight fetch for `id`, or queue a new one. A forced
    /// request always queues and takes over the in-flight slot.
    fn join_or_enqueue(self: &Arc<Self>, id: ItemId, force: bool) -> Result<SharedFetch, CoreError> {
        match self.in_flight.entry(id) {
            Entry::Occupied(entry) if !force => Ok(entry.get().fetch.clone()),
            entry => {
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                let fetch = self.enqueue(id, token)?;
                entry.insert(InFlight {
                    token,
                    fetch: fetch.clone(),
                });
                Ok(fetch)
            }
        }
    }

    fn enqueue(self: &Arc<Self>, id: ItemId, token: u64) -> Result<SharedFetch, CoreError> {
        let (responder, rx) = oneshot::channel();
        {
            let mut queue = self.lock_queue();
            // Checked under the queue lock so shutdown cannot miss a request.
            self.ensure_alive()?;
            queue.pending.push_back(PendingRequest {
                id,
                token,
                responder,
            });
            self.schedule(&mut queue);
        }
        let fetch = async move {
            rx.await
                .unwrap_or(Err(CoreError::ServiceDestroyed { service: SERVICE }))
        };
        Ok(fetch.boxed().shared())
    }

    /// Flush full batches right away; otherwise make sure a timer is armed.
    fn schedule(self: &Arc<Self>, queue: &mut Queue) {
        if queue.pending.len() >= self.config.size {
            if let Some((_, timer)) = queue.timer.take() {
                timer.abort();
            }
            while queue.pending.len() >= self.config.size {
                self.dispatch(queue);
            }
        }
        if !queue.pending.is_empty() && queue.timer.is_none() {
            self.arm_timer(queue);
        }
    }

    fn arm_timer(self: &Arc<Self>, queue: &mut Queue) {
        queue.timer_generation += 1;
        let generation = queue.timer_generation;
        let inner = Arc::clone(self);
        let delay = self.config.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.on_timer(generation);
        });
        queue.timer = Some((generation, handle));
    }

    fn on_timer(self: &Arc<Self>, generation: u64) {
        let mut queue = self.lock_queue();
        // A newer timer replaced this one while it was waking up.
        if !matches!(queue.timer, Some((armed, _)) if armed == generation) {
            return;
        }
        queue.timer = None;
        self.dispatch(&mut queue);
        self.schedule(&mut queue);
    }

    /// Take up to `batch.size` requests off the queue and fetch them.
    fn dispatch(self: &Arc<Self>, queue: &mut Queue) {
        let take = queue.pending.len().min(self.config.size);
        if take == 0 {
            return;
        }
        let batch: Vec<PendingRequest> = queue.pending.drain(..take).collect();
        tokio::spawn(Arc::clone(self).run_batch(batch));
    }

    async fn run_batch(self: Arc<Self>, requests: Vec<PendingRequest>) {
        let mut ids: Vec<ItemId> = Vec::with_capacity(requests.len());
        for request in &requests {
            if !ids.contains(&request.id) {
                ids.push(request.id);
            }
        }
        debug!(ids = ids.len(), requests = requests.len(), "flushing item batch");

        // Every fetch finishes before any request settles.
        let fetched = future::join_all(ids.iter().map(|id| self.fetch_one(*id))).await;
        let outcome: Result<HashMap<ItemId, Option<Arc<Item>>>, CoreError> = ids
            .iter()
            .zip(fetched)
            .map(|(id, result)| result.map(|item| (*id, item.map(Arc::new))))
            .collect();

        match outcome {
            Ok(items) => {
                for (id, item) in &items {
                    if let Some(item) = item {
                        self.cache.set(scope::STORY, &id.to_string(), item, None).await;
                    }
                }
                for request in requests {
                    let item = items.get(&request.id).cloned().flatten();
                    self.settle(request, Ok(item));
                }
            }
            Err(err) => {
                warn!(ids = ids.len(), error = %err, "item batch failed");
                for request in requests {
                    self.settle(request, Err(err.clone()));
                }
            }
        }
    }

    async fn fetch_one(&self, id: ItemId) -> Result<Option<Item>, CoreError> {
        match &self.item_provider {
            Some(provider) => {
                self.limiter
                    .throttle(provider, || self.upstream.fetch_item(id))
                    .await
            }
            None => self.upstream.fetch_item(id).await,
        }
    }

    /// Deliver a result, then release the in-flight slot if it still
    /// belongs to this request.
    fn settle(&self, request: PendingRequest, result: ItemResult) {
        let PendingRequest {
            id,
            token,
            responder,
        } = request;
        // The receiver may be gone if every caller dropped their future.
        let _ = responder.send(result);
        self.in_flight
            .remove_if(&id, |_, in_flight| in_flight.token == token);
    }

    fn shutdown(&self) {
        let (pending, timer) = {
            let mut queue = self.lock_queue();
            self.destroyed.store(true, Ordering::Release);
            (std::mem::take(&mut queue.pending), queue.timer.take())
        };
        if let Some((_, timer)) = timer {
            timer.abort();
        }
        let rejected = pending.len();
        for request in pending {
            self.settle(
                request,
                Err(CoreError::ServiceDestroyed { service: SERVICE }),
            );
        }
        info!(rejected, "batched loader shut down");
    }
}

#[cfg(test)]
mod tests;
