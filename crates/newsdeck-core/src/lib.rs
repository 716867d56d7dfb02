//! Batched, cached, live-updating data layer for news-reading clients.
//!
//! Many near-simultaneous per-item lookups from UI consumers are turned into
//! a few deduplicated, rate-limited upstream requests, and every consumer
//! watching an item sees the same always-fresh value:
//!
//! - **[`NewsClient`]**: facade owning every service below. Start here.
//!
//! - **[`BatchedLoader`]**: coalesces per-id fetches into batches of up to
//!   20 (or whatever arrived within 50 ms), shares fetches already in
//!   flight, and writes results into the cache.
//!
//! - **[`SwrCache`]**: scoped entries with a TTL and one update channel
//!   per key, optionally backed by a [`PersistentStore`].
//!
//! - **[`LiveItemRegistry`]**: one shared [`LiveItem`] stream per observed
//!   id, replaying the latest value to late subscribers and torn down as
//!   soon as the last handle is dropped.
//!
//! - **[`RateLimiter`]**: per-provider sliding windows that delay rather
//!   than reject.
//!
//! - **[`Upstream`]**: the fetch seam. [`HttpUpstream`] implements it over
//!   `newsdeck-api`.

pub mod cache;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod live;
pub mod loader;
pub mod model;
pub mod rate_limit;
pub mod thread;
pub mod upstream;

#[cfg(test)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{FileStore, PersistentStore, StoredEntry, SwrCache, UpdateStream};
pub use client::NewsClient;
pub use config::{BatchConfig, CacheConfig, CoreConfig, RateLimit};
pub use error::CoreError;
pub use live::{LiveItem, LiveItemList, LiveItemRegistry, LiveItemStream};
pub use loader::BatchedLoader;
pub use model::{
    Feed, Item, ItemId, ItemKind, ItemTree, SearchHit, SearchQuery, SearchResults, ThreadSnapshot,
    User,
};
pub use rate_limit::RateLimiter;
pub use thread::ThreadLoader;
pub use upstream::{HttpUpstream, Upstream};
