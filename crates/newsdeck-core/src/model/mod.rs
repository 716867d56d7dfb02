// ── Domain model ──
//
// Canonical types handed to consumers. Upstream wire shapes live in
// newsdeck-api; `crate::convert` maps them onto these.

pub mod feed;
pub mod item;
pub mod search;
pub mod thread;
pub mod user;

pub use feed::Feed;
pub use item::{Item, ItemId, ItemKind};
pub use search::{SearchHit, SearchQuery, SearchResults};
pub use thread::{ItemTree, ThreadSnapshot};
pub use user::User;
