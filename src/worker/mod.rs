//! 工作者模块：单个缓存版本的生命周期（安装、激活、拦截）与注册驱动。
//!
//! # Worker Module
//!
//! A [`CacheWorker`] is one deployed version of the cache: its config, its
//! interceptor, its generation manager and its lifecycle state. The host
//! drives it explicitly through [`CacheWorker::on_install`] and
//! [`CacheWorker::on_activate`]; [`Registration`] does that for you and keeps
//! track of which version is currently serving.
//!
//! ## Example
//!
//! ```rust,no_run
//! use offline_cache::config::CacheConfig;
//! use offline_cache::types::Request;
//! use offline_cache::worker::{CacheWorker, Registration};
//!
//! #[tokio::main]
//! async fn main() -> offline_cache::Result<()> {
//!     let config = CacheConfig::new()
//!         .with_generation("v8")
//!         .with_origin("https://example.com");
//!     let registration = Registration::new();
//!     registration
//!         .register(CacheWorker::builder().config(config).build()?)
//!         .await?;
//!
//!     if let Some(resp) = registration.handle(&Request::get("/cat.jpg")).await {
//!         println!("{}", resp.status);
//!     }
//!     Ok(())
//! }
//! ```

mod builder;
mod registration;

pub use builder::CacheWorkerBuilder;
pub use registration::Registration;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::CacheConfig;
use crate::fetch::Fetcher;
use crate::generation::{GenerationManager, Lifecycle, LifecycleState, ReapReport};
use crate::interceptor::{InterceptStats, Interceptor, Outcome};
use crate::store::Store;
use crate::types::{CachedResponse, Request, RequestKey};
use crate::Result;

pub struct CacheWorker {
    pub(crate) config: CacheConfig,
    pub(crate) seed: Vec<RequestKey>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) interceptor: Interceptor,
    pub(crate) generations: GenerationManager,
    pub(crate) lifecycle: Arc<Lifecycle>,
}

impl CacheWorker {
    pub fn builder() -> CacheWorkerBuilder {
        CacheWorkerBuilder::new()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn generation(&self) -> &str {
        &self.config.generation
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn stats(&self) -> InterceptStats {
        self.interceptor.stats()
    }

    /// Seeds the current generation. On failure the worker becomes redundant
    /// and must not be activated.
    pub async fn on_install(&self) -> Result<()> {
        self.lifecycle.transition(LifecycleState::Installing)?;
        match self.generations.seed(&self.config.generation, &self.seed).await {
            Ok(()) => {
                self.lifecycle.transition(LifecycleState::Installed)?;
                info!(generation = %self.config.generation, "installed");
                Ok(())
            }
            Err(e) => {
                error!(generation = %self.config.generation, error = %e, "install failed");
                self.lifecycle.transition(LifecycleState::Redundant)?;
                Err(e)
            }
        }
    }

    /// Reaps stale generations and starts serving. Reap problems never block
    /// activation; they are logged and returned in the report.
    pub async fn on_activate(&self) -> Result<ReapReport> {
        self.lifecycle.transition(LifecycleState::Activating)?;
        let report = match self.generations.reap(&self.config.generation).await {
            Ok(report) => report,
            Err(e) => {
                warn!(generation = %self.config.generation, error = %e, "reap skipped");
                ReapReport::default()
            }
        };
        self.lifecycle.transition(LifecycleState::Active)?;
        info!(
            generation = %self.config.generation,
            reaped = report.deleted.len(),
            failed = report.failed.len(),
            "activated"
        );
        Ok(report)
    }

    /// Marks an active worker as replaced by a newer version.
    pub fn supersede(&self) {
        if let Err(e) = self.lifecycle.transition(LifecycleState::Redundant) {
            warn!(generation = %self.config.generation, error = %e, "supersede ignored");
        }
    }

    /// Whether this worker's interceptor is answering requests.
    pub fn controls_requests(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::Activating | LifecycleState::Active
        )
    }

    /// Answers a request. Never fails.
    pub async fn handle(&self, req: &Request) -> CachedResponse {
        self.handle_with_outcome(req).await.0
    }

    /// Before activation, or once redundant, requests go straight to the
    /// network and are not stored.
    pub async fn handle_with_outcome(&self, req: &Request) -> (CachedResponse, Outcome) {
        if self.controls_requests() {
            return self.interceptor.handle_with_outcome(req).await;
        }
        match self.fetcher.fetch(req).await {
            Ok(resp) => {
                let status = resp.status;
                (resp, Outcome::Bypass { status })
            }
            Err(e) => (
                CachedResponse::synthetic_failure(),
                Outcome::NetworkError {
                    message: e.to_string(),
                },
            ),
        }
    }
}
