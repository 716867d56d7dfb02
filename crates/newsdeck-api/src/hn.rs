// HN item API client
//
// Wraps `reqwest::Client` with the item/user/feed URL layout of the
// public Hacker News API. The API answers `null` (HTTP 200) for unknown
// ids; both that and a 404 resolve to `Ok(None)`.

use std::time::Duration;

use futures_util::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{RawItem, RawUser};
use crate::transport::{self, TransportConfig};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0/";

/// Story list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedEndpoint {
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

impl FeedEndpoint {
    /// Path segment without the `.json` suffix.
    pub fn path(self) -> &'static str {
        match self {
            Self::Top => "topstories",
            Self::New => "newstories",
            Self::Best => "beststories",
            Self::Ask => "askstories",
            Self::Show => "showstories",
            Self::Job => "jobstories",
        }
    }
}

/// Raw HTTP client for the HN item API.
#[derive(Debug, Clone)]
pub struct HnClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HnClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: transport::ensure_trailing_slash(base_url),
            timeout: transport.timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: transport::ensure_trailing_slash(base_url),
            timeout: TransportConfig::default().timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch a single item. `None` when the id does not exist.
    pub async fn item(&self, id: u64) -> Result<Option<RawItem>, Error> {
        let url = self.base_url.join(&format!("item/{id}.json"))?;
        self.get_optional(url).await
    }

    /// Fetch several items concurrently, preserving input order.
    pub async fn items(&self, ids: &[u64]) -> Result<Vec<Option<RawItem>>, Error> {
        try_join_all(ids.iter().map(|&id| self.item(id))).await
    }

    /// Fetch a user profile. `None` when the user does not exist.
    pub async fn user(&self, username: &str) -> Result<Option<RawUser>, Error> {
        let url = self.base_url.join(&format!("user/{username}.json"))?;
        self.get_optional(url).await
    }

    /// Fetch the ordered story ids of a feed.
    pub async fn feed(&self, feed: FeedEndpoint) -> Result<Vec<u64>, Error> {
        let url = self.base_url.join(&format!("{}.json", feed.path()))?;
        Ok(self.get_optional(url).await?.unwrap_or_default())
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport::map_send_error(e, self.timeout))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(transport::status_error(resp).await);
        }

        // A JSON `null` body decodes into `None`.
        transport::decode_body::<Option<T>>(resp).await
    }
}
