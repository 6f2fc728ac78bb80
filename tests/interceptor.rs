//! Request-path behaviour of the interceptor.

mod common;

use async_trait::async_trait;
use common::{seeded_fetcher, FlakyStore, ScriptedFetcher};
use offline_cache::interceptor::{HookPipeline, InterceptHook, Interceptor, Outcome};
use offline_cache::store::{MemoryStore, Store};
use offline_cache::types::{CachedResponse, Request, RequestKey};
use offline_cache::CacheConfig;
use std::sync::{Arc, Mutex};

fn config() -> CacheConfig {
    CacheConfig::new().with_generation("v8")
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .put(
            "v8",
            &RequestKey::get("/my404.html"),
            &CachedResponse::new(200, "<h1>Not here</h1>"),
        )
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn hit_is_served_without_fetching() {
    let store = seeded_store().await;
    let fetcher = Arc::new(seeded_fetcher());
    store
        .put("v8", &RequestKey::get("/cat.jpg"), &CachedResponse::new(200, "cached-cat"))
        .await
        .unwrap();
    let interceptor = Interceptor::new(&config(), store, fetcher.clone());

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/cat.jpg")).await;

    assert_eq!(resp.text(), "cached-cat");
    assert_eq!(outcome, Outcome::Hit { generation: "v8".into() });
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn hit_in_older_generation_still_counts() {
    let store = seeded_store().await;
    store
        .put("v7", &RequestKey::get("/old.js"), &CachedResponse::new(200, "old"))
        .await
        .unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let interceptor = Interceptor::new(&config(), store, fetcher.clone());

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/old.js")).await;

    assert_eq!(resp.text(), "old");
    assert_eq!(outcome, Outcome::Hit { generation: "v7".into() });
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn current_generation_wins_over_older_copy() {
    let store = Arc::new(MemoryStore::new());
    store
        .put("v7", &RequestKey::get("/app.js"), &CachedResponse::new(200, "v7 app"))
        .await
        .unwrap();
    store
        .put("v8", &RequestKey::get("/app.js"), &CachedResponse::new(200, "v8 app"))
        .await
        .unwrap();
    let interceptor = Interceptor::new(&config(), store, Arc::new(ScriptedFetcher::new()));

    assert_eq!(interceptor.handle(&Request::get("/app.js")).await.text(), "v8 app");
}

#[tokio::test]
async fn miss_is_fetched_once_stored_and_returned() {
    let store = seeded_store().await;
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/new.css", 200, "body{}"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher.clone());

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/new.css")).await;

    assert_eq!(resp.text(), "body{}");
    assert_eq!(outcome, Outcome::Stored { status: 200 });
    assert_eq!(fetcher.calls_for("/new.css"), 1);
    let stored = store.get("v8", &RequestKey::get("/new.css")).await.unwrap();
    assert_eq!(stored, Some(resp));

    // Second request is a hit.
    let (_, outcome) = interceptor.handle_with_outcome(&Request::get("/new.css")).await;
    assert_eq!(outcome, Outcome::Hit { generation: "v8".into() });
    assert_eq!(fetcher.calls_for("/new.css"), 1);
}

#[tokio::test]
async fn upstream_404_serves_fallback_and_stores_nothing() {
    let store = seeded_store().await;
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/unknown.png", 404, "upstream 404"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher.clone());

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/unknown.png")).await;

    assert_eq!(resp.text(), "<h1>Not here</h1>");
    assert_eq!(outcome, Outcome::Fallback { generation: "v8".into() });
    assert_eq!(fetcher.calls_for("/unknown.png"), 1);
    assert!(store
        .get("v8", &RequestKey::get("/unknown.png"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn other_error_statuses_are_cached() {
    let store = seeded_store().await;
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .respond("/broken", 500, "server exploded")
            .respond("/secret", 403, "forbidden"),
    );
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher);

    for (url, status) in [("/broken", 500), ("/secret", 403)] {
        let (resp, outcome) = interceptor.handle_with_outcome(&Request::get(url)).await;
        assert_eq!(resp.status, status);
        assert_eq!(outcome, Outcome::Stored { status });
        let stored = store.get("v8", &RequestKey::get(url)).await.unwrap().unwrap();
        assert_eq!(stored.status, status);
    }
}

#[tokio::test]
async fn network_failure_yields_synthetic_response() {
    let store = seeded_store().await;
    let fetcher = Arc::new(ScriptedFetcher::new().fail("/offline.json"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher);

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/offline.json")).await;

    assert_eq!(resp, CachedResponse::synthetic_failure());
    assert!(matches!(outcome, Outcome::NetworkError { .. }));
    assert!(store
        .get("v8", &RequestKey::get("/offline.json"))
        .await
        .unwrap()
        .is_none());
    assert_eq!(interceptor.stats().network_errors, 1);
}

#[tokio::test]
async fn missing_fallback_returns_upstream_404() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/gone", 404, "upstream 404"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher);

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/gone")).await;

    assert_eq!(resp.status, 404);
    assert_eq!(resp.text(), "upstream 404");
    assert_eq!(outcome, Outcome::FallbackMissing);
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_get_requests_bypass_the_store() {
    let store = seeded_store().await;
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/form", 201, "created"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher.clone());

    let (resp, outcome) = interceptor
        .handle_with_outcome(&Request::new("POST", "/form"))
        .await;

    assert_eq!(resp.status, 201);
    assert_eq!(outcome, Outcome::Bypass { status: 201 });
    assert_eq!(store.keys("v8").await.unwrap(), vec![RequestKey::get("/my404.html")]);

    // A failing bypass still answers.
    let (resp, _) = interceptor
        .handle_with_outcome(&Request::new("DELETE", "/nowhere"))
        .await;
    assert_eq!(resp, CachedResponse::synthetic_failure());
}

#[tokio::test]
async fn store_write_failure_still_returns_response() {
    let store = Arc::new(FlakyStore::new());
    store.fail_puts_of("/big.bin");
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/big.bin", 200, "payload"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher);

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/big.bin")).await;

    assert_eq!(resp.text(), "payload");
    assert_eq!(outcome, Outcome::StoreFailed { status: 200 });
    assert_eq!(interceptor.stats().store_errors, 1);
}

#[tokio::test]
async fn store_read_failure_is_a_miss() {
    let store = Arc::new(FlakyStore::new());
    store.fail_reads(true);
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/a.txt", 200, "fresh"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher.clone());

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get("/a.txt")).await;

    assert_eq!(resp.text(), "fresh");
    assert_eq!(outcome, Outcome::Stored { status: 200 });
    assert_eq!(fetcher.calls_for("/a.txt"), 1);
}

#[tokio::test]
async fn fragments_share_an_entry() {
    let store = seeded_store().await;
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/doc.html#intro", 200, "doc"));
    let interceptor = Interceptor::new(&config(), store.clone(), fetcher.clone());

    interceptor.handle(&Request::get("/doc.html#intro")).await;
    let (_, outcome) = interceptor
        .handle_with_outcome(&Request::get("/doc.html#usage"))
        .await;

    assert_eq!(outcome, Outcome::Hit { generation: "v8".into() });
    assert!(store
        .get("v8", &RequestKey::get("/doc.html"))
        .await
        .unwrap()
        .is_some());
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl InterceptHook for Recorder {
    async fn on_request(&self, req: &Request) {
        self.seen.lock().unwrap().push(format!("request {}", req.url));
    }

    async fn on_outcome(&self, req: &Request, outcome: &Outcome) {
        self.seen
            .lock()
            .unwrap()
            .push(format!("{} {}", outcome, req.url));
    }
}

#[tokio::test]
async fn hooks_observe_each_request_in_order() {
    let store = seeded_store().await;
    let fetcher = Arc::new(ScriptedFetcher::new().respond("/x", 200, "x"));
    let recorder = Recorder::default();
    let interceptor = Interceptor::new(&config(), store, fetcher)
        .with_hooks(HookPipeline::new().with(recorder.clone()));

    interceptor.handle(&Request::get("/x")).await;
    interceptor.handle(&Request::get("/x")).await;

    assert_eq!(
        *recorder.seen.lock().unwrap(),
        vec![
            "request /x".to_string(),
            "stored(200) /x".to_string(),
            "request /x".to_string(),
            "hit(v8) /x".to_string(),
        ]
    );
}

#[tokio::test]
async fn stats_track_hits_and_misses() {
    let store = seeded_store().await;
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .respond("/a", 200, "a")
            .respond("/missing", 404, ""),
    );
    let interceptor = Interceptor::new(&config(), store, fetcher);

    interceptor.handle(&Request::get("/a")).await;
    interceptor.handle(&Request::get("/a")).await;
    interceptor.handle(&Request::get("/missing")).await;

    let stats = interceptor.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.fallbacks, 1);
}
