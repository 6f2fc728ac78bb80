//! 拦截器模块：缓存优先、未命中回源并写入当前代、404 替换为兜底页。
//!
//! # Interceptor Module
//!
//! Sits on the request path and always answers:
//!
//! 1. A hit in *any* generation is returned untouched (no revalidation, no TTL).
//! 2. On a miss the request is fetched exactly once.
//!    - `404` is replaced by the fallback entry and nothing is stored.
//!    - Every other status, errors included, is written to the current
//!      generation and returned.
//! 3. A fetch that produces no response yields
//!    [`CachedResponse::synthetic_failure`].
//!
//! Non-GET requests skip the store entirely and go straight to the network.
//!
//! ## Example
//!
//! ```rust,no_run
//! use offline_cache::config::CacheConfig;
//! use offline_cache::fetch::HttpFetcher;
//! use offline_cache::interceptor::Interceptor;
//! use offline_cache::store::MemoryStore;
//! use offline_cache::types::Request;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> offline_cache::Result<()> {
//!     let config = CacheConfig::new().with_origin("https://example.com");
//!     let fetcher = Arc::new(HttpFetcher::new(&config)?);
//!     let interceptor = Interceptor::new(&config, Arc::new(MemoryStore::new()), fetcher);
//!
//!     let resp = interceptor.handle(&Request::get("/cat.jpg")).await;
//!     println!("{} ({} bytes)", resp.status, resp.body.len());
//!     Ok(())
//! }
//! ```

mod hooks;

pub use hooks::{HookPipeline, InterceptHook, TracingHook};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn, Instrument};
use url::Url;

use crate::config::CacheConfig;
use crate::fetch::Fetcher;
use crate::generation::{Lifecycle, LifecycleState};
use crate::store::Store;
use crate::types::{CachedResponse, Request, RequestKey};

/// What the interceptor did for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the store; `generation` held the entry.
    Hit { generation: String },
    /// Fetched and written to the current generation.
    Stored { status: u16 },
    /// Fetched and returned, but the write to the store failed.
    StoreFailed { status: u16 },
    /// Upstream 404 replaced by the fallback entry from `generation`.
    Fallback { generation: String },
    /// Upstream 404 returned as-is because no generation holds the fallback.
    FallbackMissing,
    /// Fetched and returned without touching the store: a non-GET request,
    /// or a miss answered by a version that has been superseded.
    Bypass { status: u16 },
    /// No response from the network; the synthetic response was served.
    NetworkError { message: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Hit { generation } => write!(f, "hit({})", generation),
            Outcome::Stored { status } => write!(f, "stored({})", status),
            Outcome::StoreFailed { status } => write!(f, "store_failed({})", status),
            Outcome::Fallback { generation } => write!(f, "fallback({})", generation),
            Outcome::FallbackMissing => write!(f, "fallback_missing"),
            Outcome::Bypass { status } => write!(f, "bypass({})", status),
            Outcome::NetworkError { message } => write!(f, "network_error({})", message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub fallbacks: u64,
    pub network_errors: u64,
    pub store_errors: u64,
    pub bypasses: u64,
}

impl InterceptStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    fallbacks: AtomicU64,
    network_errors: AtomicU64,
    store_errors: AtomicU64,
    bypasses: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> InterceptStats {
        InterceptStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            bypasses: self.bypasses.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub struct Interceptor {
    generation: String,
    origin: Option<Url>,
    fallback: RequestKey,
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    hooks: HookPipeline,
    lifecycle: Option<Arc<Lifecycle>>,
    stats: Arc<AtomicStats>,
}

impl Interceptor {
    /// An origin that does not parse is ignored here; [`CacheConfig::validate`]
    /// rejects it before a worker is built.
    pub fn new(config: &CacheConfig, store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>) -> Self {
        let origin = config.origin_url().ok().flatten();
        Self {
            generation: config.generation.clone(),
            fallback: RequestKey::get(&config.fallback).resolve(origin.as_ref()),
            origin,
            store,
            fetcher,
            hooks: HookPipeline::new(),
            lifecycle: None,
            stats: Arc::new(AtomicStats::default()),
        }
    }

    pub fn with_hooks(mut self, hooks: HookPipeline) -> Self {
        self.hooks = hooks;
        self
    }

    /// Ties writes to a version's lifecycle: once it is redundant, misses are
    /// still answered but no longer stored.
    pub fn with_lifecycle(mut self, lifecycle: Arc<Lifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    fn superseded(&self) -> bool {
        self.lifecycle
            .as_ref()
            .is_some_and(|l| l.state() == LifecycleState::Redundant)
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn stats(&self) -> InterceptStats {
        self.stats.to_stats()
    }

    /// Answers a request. Never fails.
    pub async fn handle(&self, req: &Request) -> CachedResponse {
        self.handle_with_outcome(req).await.0
    }

    pub async fn handle_with_outcome(&self, req: &Request) -> (CachedResponse, Outcome) {
        let span = tracing::debug_span!(
            "intercept",
            request_id = %uuid::Uuid::new_v4(),
            method = %req.method,
            url = %req.url,
        );
        async move {
            self.hooks.request(req).await;
            let (resp, outcome) = self.respond(req).await;
            self.hooks.outcome(req, &outcome).await;
            (resp, outcome)
        }
        .instrument(span)
        .await
    }

    async fn respond(&self, req: &Request) -> (CachedResponse, Outcome) {
        if !req.is_cacheable() {
            bump(&self.stats.bypasses);
            return match self.fetcher.fetch(req).await {
                Ok(resp) => {
                    let status = resp.status;
                    (resp, Outcome::Bypass { status })
                }
                Err(e) => self.network_failure(e.to_string()),
            };
        }

        let key = req.key().resolve(self.origin.as_ref());
        if let Some((generation, cached)) = self.lookup(&key).await {
            bump(&self.stats.hits);
            debug!(generation = %generation, "cache hit");
            return (cached, Outcome::Hit { generation });
        }
        bump(&self.stats.misses);

        let resp = match self.fetcher.fetch(req).await {
            Ok(resp) => resp,
            Err(e) => return self.network_failure(e.to_string()),
        };

        if resp.is_not_found() {
            return match self.lookup(&self.fallback).await {
                Some((generation, fallback)) => {
                    bump(&self.stats.fallbacks);
                    (fallback, Outcome::Fallback { generation })
                }
                None => {
                    warn!(fallback = %self.fallback.url, "fallback entry missing from store");
                    (resp, Outcome::FallbackMissing)
                }
            };
        }

        let status = resp.status;
        if self.superseded() {
            bump(&self.stats.bypasses);
            debug!(generation = %self.generation, status, "version superseded, not storing");
            return (resp, Outcome::Bypass { status });
        }
        match self.store.put(&self.generation, &key, &resp).await {
            Ok(()) => {
                bump(&self.stats.stores);
                debug!(generation = %self.generation, status, "stored");
                (resp, Outcome::Stored { status })
            }
            Err(e) => {
                bump(&self.stats.store_errors);
                warn!(
                    store = self.store.name(),
                    generation = %self.generation,
                    error = %e,
                    "store write failed"
                );
                (resp, Outcome::StoreFailed { status })
            }
        }
    }

    /// Current generation first, then every generation in creation order.
    /// Read errors count as a miss.
    async fn lookup(&self, key: &RequestKey) -> Option<(String, CachedResponse)> {
        match self.store.get(&self.generation, key).await {
            Ok(Some(resp)) => return Some((self.generation.clone(), resp)),
            Ok(None) => {}
            Err(e) => {
                bump(&self.stats.store_errors);
                warn!(
                    store = self.store.name(),
                    generation = %self.generation,
                    error = %e,
                    "store read failed"
                );
            }
        }
        match self.store.match_any(key).await {
            Ok(found) => found,
            Err(e) => {
                bump(&self.stats.store_errors);
                warn!(store = self.store.name(), error = %e, "store read failed");
                None
            }
        }
    }

    fn network_failure(&self, message: String) -> (CachedResponse, Outcome) {
        bump(&self.stats.network_errors);
        debug!(error = %message, "network failure, serving synthetic response");
        (
            CachedResponse::synthetic_failure(),
            Outcome::NetworkError { message },
        )
    }
}
