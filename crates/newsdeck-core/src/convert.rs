// ── API-to-domain type conversions ──
//
// Bridges raw `newsdeck_api` wire types into canonical `crate::model`
// types. Epoch seconds become `DateTime<Utc>`, numeric ids become `ItemId`,
// and unknown item types fall back to `ItemKind::Story`.

use chrono::{DateTime, Utc};

use newsdeck_api::models::{AlgoliaHit, AlgoliaItem, AlgoliaSearchResponse, RawItem, RawUser};
use newsdeck_api::{FeedEndpoint, SearchParams, SearchSort};

use crate::model::{
    Feed, Item, ItemId, ItemKind, ItemTree, SearchHit, SearchQuery, SearchResults, User,
};

// ── Helpers ────────────────────────────────────────────────────────

fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch.and_then(|ts| DateTime::from_timestamp(ts, 0))
}

fn parse_kind(raw: Option<&str>) -> ItemKind {
    raw.and_then(|k| k.parse().ok()).unwrap_or_default()
}

fn ids(raw: Vec<u64>) -> Vec<ItemId> {
    raw.into_iter().map(ItemId).collect()
}

// ── Items ──────────────────────────────────────────────────────────

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        Self {
            id: ItemId(raw.id),
            kind: parse_kind(raw.kind.as_deref()),
            by: raw.by,
            time: epoch_to_datetime(raw.time),
            text: raw.text,
            url: raw.url,
            title: raw.title,
            score: raw.score,
            descendants: raw.descendants,
            parent: raw.parent.map(ItemId),
            kids: ids(raw.kids),
            dead: raw.dead,
            deleted: raw.deleted,
            poll: raw.poll.map(ItemId),
            parts: ids(raw.parts),
        }
    }
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            id: raw.id,
            created: epoch_to_datetime(Some(raw.created)),
            karma: raw.karma,
            about: raw.about,
            submitted: ids(raw.submitted),
        }
    }
}

// ── Threads ────────────────────────────────────────────────────────

/// The thread endpoint carries no scores for comments and no `kids`
/// arrays; `ItemTree::flatten` rebuilds `kids` from the nesting.
impl From<AlgoliaItem> for ItemTree {
    fn from(raw: AlgoliaItem) -> Self {
        let children: Vec<ItemTree> = raw.children.into_iter().map(ItemTree::from).collect();
        let kind = parse_kind(raw.kind.as_deref());
        let item = Item {
            id: ItemId(raw.id),
            kind,
            deleted: raw.author.is_none() && raw.text.is_none() && raw.title.is_none(),
            by: raw.author,
            time: epoch_to_datetime(raw.created_at_i),
            text: raw.text,
            url: raw.url,
            title: raw.title,
            score: raw.points,
            descendants: (kind == ItemKind::Story).then(|| count_descendants(&children)),
            parent: raw.parent_id.map(ItemId),
            kids: children.iter().map(|c| c.item.id).collect(),
            dead: false,
            poll: None,
            parts: Vec::new(),
        };
        Self { item, children }
    }
}

fn count_descendants(children: &[ItemTree]) -> u64 {
    children
        .iter()
        .map(|c| 1 + count_descendants(&c.children))
        .sum()
}

// ── Search ─────────────────────────────────────────────────────────

impl From<&SearchQuery> for SearchParams {
    fn from(query: &SearchQuery) -> Self {
        Self {
            query: query.text.clone(),
            tags: query.tags.clone(),
            page: query.page,
            hits_per_page: query.hits_per_page,
            sort: if query.by_date {
                SearchSort::Date
            } else {
                SearchSort::Relevance
            },
        }
    }
}

/// Hits whose `objectID` is not numeric are dropped.
fn search_hit(raw: AlgoliaHit) -> Option<SearchHit> {
    let id = raw.object_id.parse().ok()?;
    Some(SearchHit {
        id,
        title: raw.title,
        url: raw.url,
        author: raw.author,
        points: raw.points,
        num_comments: raw.num_comments,
        text: raw.story_text.or(raw.comment_text),
        story_id: raw.story_id.map(ItemId),
        created: epoch_to_datetime(raw.created_at_i),
    })
}

impl From<AlgoliaSearchResponse> for SearchResults {
    fn from(raw: AlgoliaSearchResponse) -> Self {
        Self {
            hits: raw
                .hits
                .into_iter()
                .filter_map(search_hit)
                .collect(),
            total: raw.nb_hits,
            page: raw.page,
            pages: raw.nb_pages,
        }
    }
}

// ── Feeds ──────────────────────────────────────────────────────────

impl From<Feed> for FeedEndpoint {
    fn from(feed: Feed) -> Self {
        match feed {
            Feed::Top => Self::Top,
            Feed::New => Self::New,
            Feed::Best => Self::Best,
            Feed::Ask => Self::Ask,
            Feed::Show => Self::Show,
            Feed::Job => Self::Job,
        }
    }
}
