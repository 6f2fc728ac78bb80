use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::CacheWorker;
use crate::generation::ReapReport;
use crate::types::{CachedResponse, Request};
use crate::Result;

/// Tracks the serving cache version and installs new ones.
///
/// A new version only replaces the serving one after its install succeeded;
/// a failed install leaves the previous version in place.
pub struct Registration {
    active: ArcSwapOption<CacheWorker>,
    registering: Mutex<()>,
}

impl Registration {
    pub fn new() -> Self {
        Self {
            active: ArcSwapOption::empty(),
            registering: Mutex::new(()),
        }
    }

    /// Installs `worker`, swaps it in as the serving version, then activates it.
    pub async fn register(&self, worker: CacheWorker) -> Result<ReapReport> {
        let _guard = self.registering.lock().await;
        let worker = Arc::new(worker);
        let generation = worker.generation().to_string();

        if let Err(e) = worker.on_install().await {
            error!(generation = %generation, error = %e, "registration failed");
            return Err(e);
        }

        if let Some(previous) = self.active.swap(Some(worker.clone())) {
            previous.supersede();
        }
        let report = worker.on_activate().await?;
        info!(generation = %generation, "registered");
        Ok(report)
    }

    pub fn active(&self) -> Option<Arc<CacheWorker>> {
        self.active.load_full()
    }

    /// `None` when no version is serving; the host should fetch on its own.
    pub async fn handle(&self, req: &Request) -> Option<CachedResponse> {
        let worker = self.active.load_full()?;
        Some(worker.handle(req).await)
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}
