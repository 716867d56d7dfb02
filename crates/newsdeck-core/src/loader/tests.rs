#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::Instant;

use super::*;
use crate::config::RateLimit;
use crate::test_support::{MockUpstream, story};

struct Harness {
    loader: BatchedLoader,
    mock: Arc<MockUpstream>,
    cache: Arc<SwrCache>,
}

fn harness(mock: MockUpstream) -> Harness {
    harness_with(mock, RateLimiter::default(), None)
}

fn harness_with(mock: MockUpstream, limiter: RateLimiter, provider: Option<&str>) -> Harness {
    let mock = Arc::new(mock);
    let cache = Arc::new(SwrCache::default());
    let loader = BatchedLoader::new(
        Arc::clone(&mock) as Arc<dyn Upstream>,
        Arc::clone(&cache),
        Arc::new(limiter),
        BatchConfig::default(),
        provider.map(str::to_owned),
    );
    Harness {
        loader,
        mock,
        cache,
    }
}

fn ids(range: impl IntoIterator<Item = u64>) -> Vec<ItemId> {
    range.into_iter().map(ItemId).collect()
}

// ── Deduplication ──

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_fetch() {
    let h = harness(MockUpstream::with_stories([1]));
    let (a, b) = tokio::join!(
        h.loader.get_item(ItemId(1), false),
        h.loader.get_item(ItemId(1), false)
    );
    let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());
    assert_eq!(a, b);
    assert_eq!(h.mock.calls_for(1), 1);
    assert_eq!(h.loader.in_flight_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_caller_joins_fetch_in_progress() {
    let h = harness(MockUpstream::with_stories([1]));
    h.mock.set_latency(Duration::from_millis(100));

    let first = tokio::spawn({
        let loader = h.loader.clone();
        async move { loader.get_item(ItemId(1), false).await }
    });
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(h.mock.calls_for(1), 1, "batch should be fetching by now");

    let second = h.loader.get_item(ItemId(1), false).await.unwrap();
    assert_eq!(first.await.unwrap().unwrap(), second);
    assert_eq!(h.mock.calls_for(1), 1);
}

#[tokio::test(start_paused = true)]
async fn duplicate_ids_in_one_call_fetch_once() {
    let h = harness(MockUpstream::with_stories([1, 2]));
    let items = h
        .loader
        .get_items(&ids([1, 2, 1]), false)
        .await
        .unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], items[2]);
    assert_eq!(h.mock.call_count(), 2);
}

// ── Batch scheduling ──

#[tokio::test(start_paused = true)]
async fn full_batch_flushes_without_waiting() {
    let h = harness(MockUpstream::with_stories(1..=25));
    let start = Instant::now();
    h.loader.get_items(&ids(1..=25), false).await.unwrap();

    let calls = h.mock.calls();
    assert_eq!(calls.len(), 25);
    let immediate = calls
        .iter()
        .filter(|(_, at)| at.duration_since(start) < Duration::from_millis(50))
        .count();
    assert_eq!(immediate, 20);
    assert!(
        calls
            .iter()
            .filter(|(id, _)| id.get() > 20)
            .all(|(_, at)| at.duration_since(start) >= Duration::from_millis(50))
    );
}

#[tokio::test(start_paused = true)]
async fn single_request_flushes_after_delay() {
    let h = harness(MockUpstream::with_stories([1]));
    let start = Instant::now();

    let task = tokio::spawn({
        let loader = h.loader.clone();
        async move { loader.get_item(ItemId(1), false).await }
    });
    tokio::time::sleep(Duration::from_millis(49)).await;
    assert_eq!(h.mock.call_count(), 0);
    assert_eq!(h.loader.queued_len(), 1);

    let item = task.await.unwrap().unwrap().unwrap();
    assert_eq!(item.id, ItemId(1));
    let calls = h.mock.calls();
    assert_eq!(calls.len(), 1, "one flush holding one id");
    assert_eq!(calls[0].0, ItemId(1));
    assert_eq!(calls[0].1.duration_since(start), Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn exactly_twenty_flush_immediately() {
    let h = harness(MockUpstream::with_stories(1..=20));
    let start = Instant::now();
    h.loader.get_items(&ids(1..=20), false).await.unwrap();

    let calls = h.mock.calls();
    assert_eq!(calls.len(), 20);
    assert!(calls.iter().all(|(_, at)| *at == start));
    assert_eq!(h.loader.queued_len(), 0);
    assert!(h.loader.inner.lock_queue().timer.is_none(), "no timer left armed");
}

#[tokio::test(start_paused = true)]
async fn partial_batch_waits_for_timer() {
    let h = harness(MockUpstream::with_stories(1..=3));
    let start = Instant::now();

    let task = tokio::spawn({
        let loader = h.loader.clone();
        async move { loader.get_items(&ids(1..=3), false).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(h.loader.queued_len(), 3);
    assert_eq!(h.loader.in_flight_len(), 3);
    assert_eq!(h.mock.call_count(), 0);

    task.await.unwrap().unwrap();
    assert!(
        h.mock
            .calls()
            .iter()
            .all(|(_, at)| at.duration_since(start) >= Duration::from_millis(50))
    );
    assert_eq!(h.loader.queued_len(), 0);
    assert_eq!(h.loader.in_flight_len(), 0);
}

// ── Cache interaction ──

#[tokio::test(start_paused = true)]
async fn fresh_cache_hit_skips_fetch() {
    let h = harness(MockUpstream::with_stories([1]));
    h.cache
        .set(scope::STORY, "1", &story(1, "cached"), None)
        .await;

    let item = h.loader.get_item(ItemId(1), false).await.unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("cached"));
    assert_eq!(h.mock.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_bypasses_cache() {
    let h = harness(MockUpstream::default());
    h.mock.put(story(1, "fresh"));
    h.cache
        .set(scope::STORY, "1", &story(1, "cached"), None)
        .await;

    let item = h.loader.get_item(ItemId(1), true).await.unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("fresh"));
    assert_eq!(h.mock.calls_for(1), 1);

    let cached: Arc<Item> = h.cache.get(scope::STORY, "1").await.unwrap();
    assert_eq!(cached.title.as_deref(), Some("fresh"));
}

#[tokio::test(start_paused = true)]
async fn forced_fetch_keeps_its_in_flight_slot() {
    let h = harness(MockUpstream::with_stories([1]));
    h.mock.set_latency(Duration::from_millis(100));

    let first = tokio::spawn({
        let loader = h.loader.clone();
        async move { loader.get_item(ItemId(1), false).await }
    });
    tokio::time::sleep(Duration::from_millis(60)).await;
    let forced = tokio::spawn({
        let loader = h.loader.clone();
        async move { loader.get_item(ItemId(1), true).await }
    });

    // First fetch ends at 150ms; the forced one is still running.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(first.is_finished());
    assert_eq!(h.loader.in_flight_len(), 1);

    forced.await.unwrap().unwrap();
    assert_eq!(h.loader.in_flight_len(), 0);
    assert_eq!(h.mock.calls_for(1), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_items_resolve_to_none_and_are_not_cached() {
    let h = harness(MockUpstream::with_stories([1, 3]));
    let items = h
        .loader
        .get_items(&ids([3, 2, 1]), false)
        .await
        .unwrap();
    let got: Vec<Option<u64>> = items.iter().map(|i| i.as_ref().map(|i| i.id.get())).collect();
    assert_eq!(got, vec![Some(3), None, Some(1)]);
    assert_eq!(h.cache.len(), 2);
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let h = harness(MockUpstream::default());
    assert!(h.loader.get_items(&[], false).await.unwrap().is_empty());
    assert_eq!(h.loader.queued_len(), 0);
}

// ── Failures ──

#[tokio::test(start_paused = true)]
async fn one_failure_rejects_the_whole_batch() {
    let h = harness(MockUpstream::with_stories(1..=3));
    h.mock.fail(2);

    let (a, b, c) = tokio::join!(
        h.loader.get_item(ItemId(1), false),
        h.loader.get_item(ItemId(2), false),
        h.loader.get_item(ItemId(3), false),
    );
    for result in [a, b, c] {
        assert!(matches!(result, Err(CoreError::Upstream { status: Some(503), .. })));
    }
    assert_eq!(h.mock.call_count(), 3, "every fetch ran to completion");
    assert!(h.cache.is_empty());
    assert_eq!(h.loader.in_flight_len(), 0);

    // Nothing about the failure sticks.
    h.mock.heal(2);
    assert!(h.loader.get_item(ItemId(2), false).await.unwrap().is_some());
}

// ── Rate limiting ──

#[tokio::test(start_paused = true)]
async fn item_fetches_respect_provider_quota() {
    let limiter = RateLimiter::new(HashMap::from([(
        "hn".to_owned(),
        RateLimit::new(2, Duration::from_millis(1000)),
    )]));
    let h = harness_with(MockUpstream::with_stories(1..=3), limiter, Some("hn"));
    let start = Instant::now();

    h.loader.get_items(&ids(1..=3), false).await.unwrap();
    let mut offsets: Vec<Duration> = h
        .mock
        .calls()
        .iter()
        .map(|(_, at)| at.duration_since(start))
        .collect();
    offsets.sort();
    assert!(offsets[1] < Duration::from_millis(1000));
    assert!(offsets[2] >= Duration::from_millis(1050));
}

// ── Shutdown ──

#[tokio::test(start_paused = true)]
async fn shutdown_rejects_queued_and_future_requests() {
    let h = harness(MockUpstream::with_stories([1]));
    let pending = tokio::spawn({
        let loader = h.loader.clone();
        async move { loader.get_item(ItemId(1), false).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(h.loader.queued_len(), 1);

    h.loader.shutdown();
    assert!(h.loader.is_shut_down());
    assert_eq!(
        pending.await.unwrap(),
        Err(CoreError::ServiceDestroyed { service: SERVICE })
    );
    assert_eq!(
        h.loader.get_item(ItemId(1), false).await,
        Err(CoreError::ServiceDestroyed { service: SERVICE })
    );
    assert_eq!(h.mock.call_count(), 0);
    assert_eq!(h.loader.in_flight_len(), 0);
}
