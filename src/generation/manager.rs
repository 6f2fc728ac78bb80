use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::fetch::Fetcher;
use crate::store::Store;
use crate::types::{CachedResponse, Request, RequestKey};
use crate::{Error, ErrorContext, Result};

/// Result of one reap pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Stale generations that are gone.
    pub deleted: Vec<String>,
    /// The current generation and every tag outside our prefix.
    pub retained: Vec<String>,
    /// Stale generations whose deletion failed, with the error text.
    pub failed: Vec<(String, String)>,
}

impl ReapReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct GenerationManager {
    prefix: String,
    store: Arc<dyn Store>,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl GenerationManager {
    pub fn new(config: &CacheConfig, store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            prefix: config.prefix.clone(),
            store,
            fetcher: Some(fetcher),
        }
    }

    /// A manager that can only reap; [`seed`](Self::seed) fails without a fetcher.
    pub fn reaper(config: &CacheConfig, store: Arc<dyn Store>) -> Self {
        Self {
            prefix: config.prefix.clone(),
            store,
            fetcher: None,
        }
    }

    pub fn owns(&self, generation: &str) -> bool {
        generation.starts_with(&self.prefix)
    }

    /// Fetches every seed key and writes the results into `generation`.
    ///
    /// All fetches must return 2xx before anything is written. If a write
    /// fails on a generation this call created, the generation is removed again.
    pub async fn seed(&self, generation: &str, seed: &[RequestKey]) -> Result<()> {
        let Some(fetcher) = self.fetcher.as_deref() else {
            return Err(Error::runtime_with_context(
                "seeding requires a fetcher",
                ErrorContext::new()
                    .with_field_path(generation)
                    .with_source("generation_manager"),
            ));
        };
        info!(generation, entries = seed.len(), "seeding generation");

        let fetched =
            try_join_all(seed.iter().map(|key| fetch_seed(fetcher, generation, key))).await?;

        let created = self.store.open(generation).await?;
        for (key, resp) in &fetched {
            if let Err(e) = self.store.put(generation, key, resp).await {
                warn!(generation, url = %key.url, error = %e, "seed write failed");
                if created {
                    if let Err(cleanup) = self.store.delete(generation).await {
                        warn!(generation, error = %cleanup, "could not remove partial generation");
                    }
                }
                return Err(Error::seed(generation, &key.url, e.to_string()));
            }
        }

        info!(generation, "seed complete");
        Ok(())
    }

    /// Deletes every generation we own except `current`.
    ///
    /// Fails only if the generation list itself cannot be read; individual
    /// deletion failures are reported in the [`ReapReport`].
    pub async fn reap(&self, current: &str) -> Result<ReapReport> {
        let mut report = ReapReport::default();
        let mut stale = Vec::new();
        for generation in self.store.list().await? {
            if generation != current && self.owns(&generation) {
                stale.push(generation);
            } else {
                report.retained.push(generation);
            }
        }

        let results = join_all(stale.iter().map(|g| self.store.delete(g))).await;
        for (generation, result) in stale.into_iter().zip(results) {
            match result {
                Ok(_) => {
                    info!(generation = %generation, "reaped stale generation");
                    report.deleted.push(generation);
                }
                Err(e) => {
                    warn!(generation = %generation, error = %e, "failed to reap generation");
                    report.failed.push((generation, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

async fn fetch_seed(
    fetcher: &dyn Fetcher,
    generation: &str,
    key: &RequestKey,
) -> Result<(RequestKey, CachedResponse)> {
    let resp = fetcher
        .fetch(&Request::from(key))
        .await
        .map_err(|e| Error::seed(generation, &key.url, e.to_string()))?;
    if !resp.is_success() {
        return Err(Error::seed(
            generation,
            &key.url,
            format!("HTTP {}", resp.status),
        ));
    }
    debug!(generation, url = %key.url, bytes = resp.body.len(), "seed fetched");
    Ok((key.clone(), resp))
}
