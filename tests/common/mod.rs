//! Shared fixtures: a scripted fetcher, stores that fail or stall on demand.

#![allow(dead_code)]

use async_trait::async_trait;
use offline_cache::fetch::{FetchError, Fetcher};
use offline_cache::store::{MemoryStore, Store, StoreError, StoreResult};
use offline_cache::types::{CachedResponse, Request, RequestKey};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

enum Script {
    Respond(CachedResponse),
    Fail(String),
}

/// Answers from a fixed URL table; unknown URLs fail as unreachable.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: &'static str) -> Self {
        self.set(url, status, body);
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Fail(format!("connection refused: {}", url)));
        self
    }

    /// Replaces the scripted answer for `url` after construction.
    pub fn set(&self, url: &str, status: u16, body: &'static str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Script::Respond(CachedResponse::new(status, body).with_header("x-origin", "scripted")),
        );
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError> {
        self.calls.lock().unwrap().push(request.url.clone());
        match self.routes.lock().unwrap().get(&request.url) {
            Some(Script::Respond(resp)) => Ok(resp.clone()),
            Some(Script::Fail(msg)) => Err(FetchError::Unreachable(msg.clone())),
            None => Err(FetchError::Unreachable(format!("no route to {}", request.url))),
        }
    }
}

/// A [`MemoryStore`] that fails on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_puts: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_reads: Mutex<bool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts of this URL fail, in any generation.
    pub fn fail_puts_of(&self, url: &str) {
        self.failing_puts.lock().unwrap().insert(url.to_string());
    }

    pub fn fail_delete_of(&self, generation: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(generation.to_string());
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.failing_reads.lock().unwrap() = fail;
    }

    fn reads_fail(&self) -> bool {
        *self.failing_reads.lock().unwrap()
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn open(&self, generation: &str) -> StoreResult<bool> {
        self.inner.open(generation).await
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> StoreResult<()> {
        if self.failing_puts.lock().unwrap().contains(&key.url) {
            return Err(StoreError::Other(format!("disk full writing {}", key.url)));
        }
        self.inner.put(generation, key, response).await
    }

    async fn get(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> StoreResult<Option<CachedResponse>> {
        if self.reads_fail() {
            return Err(StoreError::Other("read failed".into()));
        }
        self.inner.get(generation, key).await
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        if self.reads_fail() {
            return Err(StoreError::Other("list failed".into()));
        }
        self.inner.list().await
    }

    async fn delete(&self, generation: &str) -> StoreResult<bool> {
        if self.failing_deletes.lock().unwrap().contains(generation) {
            return Err(StoreError::Other(format!("permission denied: {}", generation)));
        }
        self.inner.delete(generation).await
    }

    async fn keys(&self, generation: &str) -> StoreResult<Vec<RequestKey>> {
        self.inner.keys(generation).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

/// Where a [`GatedStore`] delete stalls until [`GatedStore::release`].
#[derive(Debug, Clone, Copy)]
pub enum HoldDeletes {
    /// The generation is still there while the delete is pending.
    Before,
    /// The generation is gone but the delete has not returned yet.
    After,
}

/// A [`MemoryStore`] whose deletes stall, keeping a reap in progress.
pub struct GatedStore {
    pub inner: MemoryStore,
    hold: HoldDeletes,
    gate: Semaphore,
}

impl GatedStore {
    pub fn new(hold: HoldDeletes) -> Self {
        Self {
            inner: MemoryStore::new(),
            hold,
            gate: Semaphore::new(0),
        }
    }

    /// Lets every pending and future delete finish.
    pub fn release(&self) {
        self.gate.close();
    }

    async fn wait(&self) {
        let _ = self.gate.acquire().await;
    }
}

#[async_trait]
impl Store for GatedStore {
    async fn open(&self, generation: &str) -> StoreResult<bool> {
        self.inner.open(generation).await
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> StoreResult<()> {
        self.inner.put(generation, key, response).await
    }

    async fn get(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> StoreResult<Option<CachedResponse>> {
        self.inner.get(generation, key).await
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        self.inner.list().await
    }

    async fn delete(&self, generation: &str) -> StoreResult<bool> {
        match self.hold {
            HoldDeletes::Before => {
                self.wait().await;
                self.inner.delete(generation).await
            }
            HoldDeletes::After => {
                let deleted = self.inner.delete(generation).await;
                self.wait().await;
                deleted
            }
        }
    }

    async fn keys(&self, generation: &str) -> StoreResult<Vec<RequestKey>> {
        self.inner.keys(generation).await
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Holds every fetch of one URL until [`GatedFetcher::release`].
pub struct GatedFetcher {
    inner: ScriptedFetcher,
    url: String,
    waiting: AtomicUsize,
    gate: Semaphore,
}

impl GatedFetcher {
    pub fn new(inner: ScriptedFetcher, url: &str) -> Self {
        Self {
            inner,
            url: url.to_string(),
            waiting: AtomicUsize::new(0),
            gate: Semaphore::new(0),
        }
    }

    /// Fetches of the held URL that have started.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.gate.close();
    }
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError> {
        if request.url == self.url {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            let _ = self.gate.acquire().await;
        }
        self.inner.fetch(request).await
    }
}

/// Yields to spawned tasks until `ready` holds.
pub async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Fetcher serving the three default seed resources.
pub fn seeded_fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .respond("/wonderful.jpg", 200, "wonderful-bytes")
        .respond("/cat.jpg", 200, "cat-bytes")
        .respond("/my404.html", 200, "<h1>Not here</h1>")
}

pub fn keys(urls: &[&str]) -> Vec<RequestKey> {
    urls.iter().map(RequestKey::get).collect()
}
