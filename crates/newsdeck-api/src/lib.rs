// newsdeck-api: Async clients for the Hacker News item API and the
// Algolia HN search API.
//
// Both clients return raw wire models; `newsdeck-core` converts them into
// domain types and never exposes HTTP details to its consumers.

pub mod algolia;
pub mod error;
pub mod hn;
pub mod models;
pub mod transport;

pub use algolia::{AlgoliaClient, SearchParams, SearchSort};
pub use error::Error;
pub use hn::{FeedEndpoint, HnClient};
pub use transport::TransportConfig;
