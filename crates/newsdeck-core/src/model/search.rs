use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ItemId;

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Tag filter such as `story`, `comment` or `author_pg`.
    pub tags: Option<String>,
    pub page: u32,
    pub hits_per_page: u32,
    /// Newest first instead of by relevance.
    pub by_date: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tags: None,
            page: 0,
            hits_per_page: 20,
            by_date: false,
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn by_date(mut self) -> Self {
        self.by_date = true;
        self
    }

    /// Stable cache key: equal queries share one cache entry.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.text.trim().to_lowercase(),
            self.tags.as_deref().unwrap_or(""),
            self.page,
            self.hits_per_page,
            if self.by_date { "date" } else { "relevance" },
        )
    }
}

/// One matching story or comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ItemId,
    pub title: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
    pub points: Option<i64>,
    pub num_comments: Option<u64>,
    pub text: Option<String>,
    pub story_id: Option<ItemId>,
    pub created: Option<DateTime<Utc>>,
}

/// A page of search hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_normalizes_text() {
        let a = SearchQuery::new("  Rust ").with_tags("story");
        let b = SearchQuery::new("rust").with_tags("story");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), b.clone().by_date().cache_key());
        assert_ne!(b.cache_key(), b.clone().with_page(1).cache_key());
    }
}
