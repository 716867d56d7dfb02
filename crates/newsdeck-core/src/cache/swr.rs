// ── SwrCache ──
//
// Entries are stored as `serde_json::Value` so one cache can hold items,
// users, feeds and search pages, and so the same value can be handed to
// the durable store unchanged. Callers always get an owned, decoded copy.
//
// Memory is the source of truth. Every write gets a sequence number and is
// inserted and published in one step with no await in between; the durable
// write-through follows, serialized per key, and is skipped once a newer
// write has landed in memory.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::persist::{PersistentStore, StoredEntry};
use super::updates::{UpdateChannels, UpdateStream};
use crate::config::CacheConfig;
use crate::error::CoreError;

/// Buffered values per update channel before slow subscribers lag.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

type EntryKey = (String, String);

fn entry_key(scope: &str, key: &str) -> EntryKey {
    (scope.to_owned(), key.to_owned())
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
    seq: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

pub struct SwrCache {
    config: CacheConfig,
    entries: DashMap<EntryKey, CacheEntry>,
    channels: Arc<UpdateChannels>,
    store: Option<Arc<dyn PersistentStore>>,
    /// Held across a key's store write so writes reach disk in order.
    write_locks: DashMap<EntryKey, Arc<Mutex<()>>>,
    next_seq: AtomicU64,
}

impl SwrCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            channels: Arc::new(DashMap::new()),
            store: None,
            write_locks: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Back the in-memory entries with a durable store.
    pub fn with_store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The fresh value for (scope, key), if any. Never fetches.
    ///
    /// On an in-memory miss the durable store is consulted and a fresh
    /// entry found there is loaded into memory.
    pub async fn get<T: DeserializeOwned>(&self, scope: &str, key: &str) -> Option<T> {
        let now = Instant::now();
        let cached = self
            .entries
            .get(&entry_key(scope, key))
            .map(|entry| entry.is_fresh(now).then(|| entry.value.clone()));
        let value = match cached {
            Some(fresh) => fresh?,
            None => self.hydrate(scope, key).await?,
        };
        decode(scope, key, value)
    }

    async fn hydrate(&self, scope: &str, key: &str) -> Option<Value> {
        let store = self.store.as_ref()?;
        let stored = match store.load(scope, key).await {
            Ok(stored) => stored?,
            Err(err) => {
                warn!(scope, key, error = %err, "failed to read persisted cache entry");
                return None;
            }
        };

        let ttl = Duration::from_millis(stored.ttl_ms);
        let age = (Utc::now() - stored.stored_at).to_std().unwrap_or_default();
        if age >= ttl {
            trace!(scope, key, "persisted cache entry is stale");
            return None;
        }

        let now = Instant::now();
        match self.entries.entry(entry_key(scope, key)) {
            // A write landed while the store was being read; it is newer.
            Entry::Occupied(current) => {
                trace!(scope, key, "discarding persisted entry superseded by a write");
                let current = current.get();
                current.is_fresh(now).then(|| current.value.clone())
            }
            Entry::Vacant(slot) => {
                debug!(scope, key, age_ms = age.as_millis(), "hydrated cache entry from store");
                slot.insert(CacheEntry {
                    value: stored.value.clone(),
                    stored_at: now.checked_sub(age).unwrap_or(now),
                    ttl,
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                });
                Some(stored.value)
            }
        }
    }

    /// Return a fresh hit, or call `fetcher` and store what it returns.
    ///
    /// A `None` from the fetcher is passed through without caching. Fetcher
    /// errors propagate and leave the cache untouched.
    pub async fn get_with_swr<T, F, Fut>(
        &self,
        scope: &str,
        key: &str,
        fetcher: F,
    ) -> Result<Option<T>, CoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, CoreError>>,
    {
        if let Some(hit) = self.get(scope, key).await {
            trace!(scope, key, "cache hit");
            return Ok(Some(hit));
        }
        let fetched = fetcher().await?;
        if let Some(value) = &fetched {
            self.set(scope, key, value, None).await;
        }
        Ok(fetched)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Store and publish `value`. Storage failures are logged, not returned.
    pub async fn set<T: Serialize>(&self, scope: &str, key: &str, value: &T, ttl: Option<Duration>) {
        if let Err(err) = self.try_set(scope, key, value, ttl).await {
            warn!(scope, key, error = %err, "cache write failed");
        }
    }

    /// Like [`set`](Self::set) but reports storage failures.
    ///
    /// A durable-store failure still leaves the value in memory and
    /// published; only a value that cannot be serialized is dropped.
    pub async fn try_set<T: Serialize>(
        &self,
        scope: &str,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CoreError> {
        let value = serde_json::to_value(value).map_err(|err| CoreError::Cache {
            scope: scope.to_owned(),
            key: key.to_owned(),
            message: err.to_string(),
        })?;
        let ttl = ttl.unwrap_or_else(|| self.config.ttl_for(scope));
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        {
            // The entry guard is held while publishing, so subscribers see
            // writes to one key in the order memory took them.
            let _slot = self.entries.entry(entry_key(scope, key)).insert(CacheEntry {
                value: value.clone(),
                stored_at: Instant::now(),
                ttl,
                seq,
            });
            self.publish(scope, key, value.clone());
        }

        let Some(store) = &self.store else {
            return Ok(());
        };
        let entry = StoredEntry {
            value,
            stored_at: Utc::now(),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        };
        self.write_through(store.as_ref(), scope, key, seq, &entry).await
    }

    async fn write_through(
        &self,
        store: &dyn PersistentStore,
        scope: &str,
        key: &str,
        seq: u64,
        entry: &StoredEntry,
    ) -> Result<(), CoreError> {
        let k = entry_key(scope, key);
        let lock = self.write_lock(&k);
        let result = {
            let _guard = lock.lock().await;
            let superseded = self.entries.get(&k).is_none_or(|current| current.seq != seq);
            if superseded {
                trace!(scope, key, seq, "skipping superseded store write");
                Ok(())
            } else {
                store.store(scope, key, entry).await
            }
        };
        self.release_write_lock(&k, lock);
        result
    }

    fn write_lock(&self, k: &EntryKey) -> Arc<Mutex<()>> {
        Arc::clone(&self.write_locks.entry(k.clone()).or_default())
    }

    fn release_write_lock(&self, k: &EntryKey, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.write_locks.remove_if(k, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn publish(&self, scope: &str, key: &str, value: Value) {
        let k = entry_key(scope, key);
        let Some(tx) = self.channels.get(&k).map(|tx| tx.clone()) else {
            return;
        };
        if tx.send(value).is_err() {
            // Every subscriber is gone.
            self.channels.remove_if(&k, |_, tx| tx.receiver_count() == 0);
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Values set for exactly (scope, key) from now on.
    pub fn updates<T: DeserializeOwned>(&self, scope: &str, key: &str) -> UpdateStream<T> {
        let rx = self
            .channels
            .entry(entry_key(scope, key))
            .or_insert_with(|| broadcast::channel(UPDATE_CHANNEL_CAPACITY).0)
            .subscribe();
        UpdateStream::new(rx, Arc::clone(&self.channels), scope, key)
    }

    // ── Invalidation ─────────────────────────────────────────────────

    pub async fn clear(&self, scope: &str, key: &str) {
        let k = entry_key(scope, key);
        self.entries.remove(&k);
        let Some(store) = &self.store else { return };

        // Wait out a write-through already in progress for this key.
        let lock = self.write_lock(&k);
        let deleted = {
            let _guard = lock.lock().await;
            store.delete(scope, key).await
        };
        self.release_write_lock(&k, lock);
        if let Err(err) = deleted {
            warn!(scope, key, error = %err, "failed to delete persisted cache entry");
        }
    }

    pub async fn clear_scope(&self, scope: &str) {
        self.entries.retain(|(s, _), _| s != scope);
        let Some(store) = &self.store else { return };
        if let Err(err) = store.delete_scope(scope).await {
            warn!(scope, error = %err, "failed to delete persisted cache scope");
        }
    }

    pub async fn clear_all(&self) {
        self.entries.clear();
        let Some(store) = &self.store else { return };
        if let Err(err) = store.delete_all().await {
            warn!(error = %err, "failed to delete persisted cache");
        }
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Entries held in memory, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live update channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for SwrCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn decode<T: DeserializeOwned>(scope: &str, key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(scope, key, error = %err, "cached value has unexpected shape");
            None
        }
    }
}
