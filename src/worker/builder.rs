use crate::config::CacheConfig;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::generation::{GenerationManager, Lifecycle};
use crate::interceptor::{HookPipeline, InterceptHook, Interceptor};
use crate::store::{MemoryStore, Store};
use crate::types::RequestKey;
use crate::worker::CacheWorker;
use crate::Result;
use std::sync::Arc;

/// Builder for one cache version.
///
/// Without an explicit store the worker gets a fresh [`MemoryStore`]; without
/// an explicit fetcher it gets an [`HttpFetcher`] built from the config.
pub struct CacheWorkerBuilder {
    config: CacheConfig,
    store: Option<Arc<dyn Store>>,
    fetcher: Option<Arc<dyn Fetcher>>,
    hooks: HookPipeline,
}

impl CacheWorkerBuilder {
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            store: None,
            fetcher: None,
            hooks: HookPipeline::new(),
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Adds an interceptor hook. Hooks run in the order they are added.
    pub fn hook<H: InterceptHook + 'static>(mut self, hook: H) -> Self {
        self.hooks = self.hooks.with(hook);
        self
    }

    pub fn build(self) -> Result<CacheWorker> {
        self.config.validate()?;

        let store = match self.store {
            Some(s) => s,
            None => Arc::new(MemoryStore::new()),
        };
        let fetcher = match self.fetcher {
            Some(f) => f,
            None => Arc::new(HttpFetcher::new(&self.config)?),
        };

        let origin = self.config.origin_url()?;
        let seed = self
            .config
            .seed
            .iter()
            .map(|url| RequestKey::get(url).resolve(origin.as_ref()))
            .collect();
        let lifecycle = Arc::new(Lifecycle::new());
        let interceptor = Interceptor::new(&self.config, store.clone(), fetcher.clone())
            .with_hooks(self.hooks)
            .with_lifecycle(lifecycle.clone());
        let generations = GenerationManager::new(&self.config, store.clone(), fetcher.clone());

        Ok(CacheWorker {
            config: self.config,
            seed,
            store,
            fetcher,
            interceptor,
            generations,
            lifecycle,
        })
    }
}

impl Default for CacheWorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
