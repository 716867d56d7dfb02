#![allow(clippy::unwrap_used)]
// Integration tests for `HnClient` and `AlgoliaClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newsdeck_api::{AlgoliaClient, Error, FeedEndpoint, HnClient, SearchParams, SearchSort};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup_hn() -> (MockServer, HnClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/v0/", server.uri())).unwrap();
    let client = HnClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

async fn setup_algolia() -> (MockServer, AlgoliaClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
    let client = AlgoliaClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Item tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_item_found() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/item/8863.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "by": "dhouston",
            "descendants": 71,
            "id": 8863,
            "kids": [8952, 9224],
            "score": 111,
            "time": 1_175_714_200,
            "title": "My YC app: Dropbox - Throw away your USB drive",
            "type": "story",
            "url": "http://www.getdropbox.com/u/2/screencast.html"
        })))
        .mount(&server)
        .await;

    let item = client.item(8863).await.unwrap().unwrap();
    assert_eq!(item.id, 8863);
    assert_eq!(item.by.as_deref(), Some("dhouston"));
    assert_eq!(item.kids, vec![8952, 9224]);
    assert_eq!(item.kind.as_deref(), Some("story"));
}

#[tokio::test]
async fn test_item_null_body_is_none() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/item/999999999.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    assert!(client.item(999_999_999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_item_404_is_none() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/item/1.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client.item(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_item_server_error() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/item/2.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = client.item(2).await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }), "got: {err:?}");
    assert_eq!(err.status(), Some(503));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_item_malformed_body() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/item/3.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let result = client.item(3).await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_rate_limited_reads_retry_after() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/item/4.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let result = client.item(4).await;
    assert!(
        matches!(result, Err(Error::RateLimited { retry_after_secs: 7 })),
        "expected RateLimited error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_items_preserve_order() {
    let (server, client) = setup_hn().await;

    for id in [30_u64, 10, 20] {
        Mock::given(method("GET"))
            .and(path(format!("/v0/item/{id}.json")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": id, "type": "comment" })),
            )
            .mount(&server)
            .await;
    }

    let items = client.items(&[30, 10, 20]).await.unwrap();
    let ids: Vec<u64> = items.into_iter().map(|i| i.unwrap().id).collect();
    assert_eq!(ids, vec![30, 10, 20]);
}

// ── User & feed tests ───────────────────────────────────────────────

#[tokio::test]
async fn test_user() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/user/jl.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "about": "This is a test",
            "created": 1_173_923_446,
            "id": "jl",
            "karma": 2937,
            "submitted": [8265435, 8168423]
        })))
        .mount(&server)
        .await;

    let user = client.user("jl").await.unwrap().unwrap();
    assert_eq!(user.karma, 2937);
    assert_eq!(user.submitted.len(), 2);
}

#[tokio::test]
async fn test_feed() {
    let (server, client) = setup_hn().await;

    Mock::given(method("GET"))
        .and(path("/v0/topstories.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([9129911, 9129199, 9127761])))
        .mount(&server)
        .await;

    let ids = client.feed(FeedEndpoint::Top).await.unwrap();
    assert_eq!(ids, vec![9_129_911, 9_129_199, 9_127_761]);
}

// ── Algolia tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_item_tree() {
    let (server, client) = setup_algolia().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/items/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "type": "story",
            "author": "pg",
            "title": "Y Combinator",
            "children": [
                { "id": 15, "type": "comment", "author": "sama", "parent_id": 1,
                  "children": [
                      { "id": 17, "type": "comment", "author": "pg", "parent_id": 15, "children": [] }
                  ] }
            ]
        })))
        .mount(&server)
        .await;

    let tree = client.item_tree(1).await.unwrap().unwrap();
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].children[0].id, 17);
}

#[tokio::test]
async fn test_item_tree_missing() {
    let (server, client) = setup_algolia().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/items/5"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client.item_tree(5).await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_by_date_sends_params() {
    let (server, client) = setup_algolia().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/search_by_date"))
        .and(query_param("query", "rust"))
        .and(query_param("tags", "story"))
        .and(query_param("page", "2"))
        .and(query_param("hitsPerPage", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [{ "objectID": "42", "title": "Rust 2.0", "_tags": ["story"] }],
            "nbHits": 1,
            "page": 2,
            "nbPages": 3,
            "hitsPerPage": 5
        })))
        .mount(&server)
        .await;

    let params = SearchParams {
        query: "rust".into(),
        tags: Some("story".into()),
        page: 2,
        hits_per_page: 5,
        sort: SearchSort::Date,
    };
    let resp = client.search(&params).await.unwrap();
    assert_eq!(resp.nb_hits, 1);
    assert_eq!(resp.nb_pages, 3);
    assert_eq!(resp.hits[0].object_id, "42");
}
