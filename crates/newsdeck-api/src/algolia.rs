// Algolia HN search client
//
// Two endpoints matter: `items/{id}` returns a whole thread as a nested
// tree in one call, and `search` / `search_by_date` return paged hits.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{AlgoliaItem, AlgoliaSearchResponse};
use crate::transport::{self, TransportConfig};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://hn.algolia.com/api/v1/";

/// Result ordering for a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchSort {
    #[default]
    Relevance,
    Date,
}

/// Parameters for a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SearchParams {
    pub query: String,
    /// Algolia tag filter, e.g. `story` or `(story,poll)`.
    pub tags: Option<String>,
    pub page: u32,
    pub hits_per_page: u32,
    pub sort: SearchSort,
}

/// Raw HTTP client for the Algolia HN API.
#[derive(Debug, Clone)]
pub struct AlgoliaClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl AlgoliaClient {
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: transport::ensure_trailing_slash(base_url),
            timeout: transport.timeout,
        })
    }

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

    /// Fetch an item together with all of its descendants.
    pub async fn item_tree(&self, id: u64) -> Result<Option<AlgoliaItem>, Error> {
        let url = self.base_url.join(&format!("items/{id}"))?;
        debug!("GET {}", url);

        let resp = self.send(url).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(transport::status_error(resp).await);
        }
        transport::decode_body(resp).await.map(Some)
    }

    /// Run a search query.
    pub async fn search(&self, params: &SearchParams) -> Result<AlgoliaSearchResponse, Error> {
        let endpoint = match params.sort {
            SearchSort::Relevance => "search",
            SearchSort::Date => "search_by_date",
        };
        let mut url = self.base_url.join(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("query", &params.query);
            if let Some(ref tags) = params.tags {
                query.append_pair("tags", tags);
            }
            query.append_pair("page", &params.page.to_string());
            if params.hits_per_page > 0 {
                query.append_pair("hitsPerPage", &params.hits_per_page.to_string());
            }
        }
        debug!("GET {}", url);

        let resp = self.send(url).await?;
        if !resp.status().is_success() {
            return Err(transport::status_error(resp).await);
        }
        transport::decode_body(resp).await
    }

    async fn send(&self, url: Url) -> Result<reqwest::Response, Error> {
        self.http
            .get(url)
            .send()
            .await
            .map_err(|e| transport::map_send_error(e, self.timeout))
    }
}

