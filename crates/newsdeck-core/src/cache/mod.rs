// ── Stale-while-revalidate cache ──
//
// Scoped key/value entries with a TTL, an optional durable backing store,
// and one lazily created update channel per (scope, key).

pub mod persist;
pub mod swr;
pub mod updates;

pub use persist::{FileStore, PersistentStore, StoredEntry};
pub use swr::SwrCache;
pub use updates::UpdateStream;

/// Well-known cache scopes.
pub mod scope {
    pub const STORY: &str = "story";
    pub const USER: &str = "user";
    pub const FEED: &str = "feed";
    pub const SEARCH: &str = "search";
}
