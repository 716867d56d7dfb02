// ── Raw wire models ──
//
// Shapes returned by the HN item API and the Algolia search API, kept
// close to the JSON. Optional everywhere the upstream omits fields on
// deleted or dead items.

use serde::{Deserialize, Serialize};

/// An item as returned by `GET /v0/item/{id}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub descendants: Option<u64>,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub kids: Vec<u64>,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub poll: Option<u64>,
    #[serde(default)]
    pub parts: Vec<u64>,
}

/// A user profile as returned by `GET /v0/user/{id}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUser {
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub karma: i64,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub submitted: Vec<u64>,
}

/// A node of the nested thread returned by Algolia `GET /api/v1/items/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoliaItem {
    pub id: u64,
    #[serde(default)]
    pub created_at_i: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub story_id: Option<u64>,
    #[serde(default)]
    pub children: Vec<AlgoliaItem>,
}

/// Algolia search response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgoliaSearchResponse {
    #[serde(default)]
    pub hits: Vec<AlgoliaHit>,
    #[serde(default)]
    pub nb_hits: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub nb_pages: u32,
    #[serde(default)]
    pub hits_per_page: u32,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoliaHit {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub story_text: Option<String>,
    #[serde(default)]
    pub comment_text: Option<String>,
    #[serde(default)]
    pub num_comments: Option<u64>,
    #[serde(default)]
    pub story_id: Option<u64>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub created_at_i: Option<i64>,
    #[serde(rename = "_tags", default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn raw_item_tolerates_deleted_shape() {
        let item: RawItem =
            serde_json::from_str(r#"{"id": 42, "deleted": true, "time": 1, "type": "comment"}"#)
                .unwrap();
        assert!(item.deleted);
        assert!(item.kids.is_empty());
        assert_eq!(item.kind.as_deref(), Some("comment"));
        assert!(item.by.is_none());
    }

    #[test]
    fn algolia_item_nests_children() {
        let json = serde_json::json!({
            "id": 1,
            "type": "story",
            "author": "pg",
            "title": "Y Combinator",
            "points": 57,
            "parent_id": null,
            "children": [{
                "id": 15,
                "type": "comment",
                "author": "sama",
                "text": "first",
                "parent_id": 1,
                "children": []
            }]
        });
        let item: AlgoliaItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.children.len(), 1);
        assert_eq!(item.children[0].parent_id, Some(1));
    }

    #[test]
    fn search_hit_reads_object_id_and_tags() {
        let json = serde_json::json!({
            "objectID": "8863",
            "title": "My YC app",
            "_tags": ["story", "author_dhouston"],
            "num_comments": 71
        });
        let hit: AlgoliaHit = serde_json::from_value(json).unwrap();
        assert_eq!(hit.object_id, "8863");
        assert_eq!(hit.tags, vec!["story", "author_dhouston"]);
    }
}
