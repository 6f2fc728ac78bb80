//! Optional hooks around intercepted requests.
//!
//! Hooks observe; they cannot change what the interceptor serves. Useful for
//! logging, metrics and auditing.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Outcome;
use crate::types::Request;

#[async_trait]
pub trait InterceptHook: Send + Sync {
    async fn on_request(&self, _req: &Request) {}

    async fn on_outcome(&self, _req: &Request, _outcome: &Outcome) {}
}

/// Runs hooks in the order they were added.
pub struct HookPipeline {
    pub(crate) hooks: Vec<Box<dyn InterceptHook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn with<H: InterceptHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub(crate) async fn request(&self, req: &Request) {
        for hook in &self.hooks {
            hook.on_request(req).await;
        }
    }

    pub(crate) async fn outcome(&self, req: &Request, outcome: &Outcome) {
        for hook in &self.hooks {
            hook.on_outcome(req, outcome).await;
        }
    }
}

impl Default for HookPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every outcome; degraded outcomes at `warn`.
pub struct TracingHook;

#[async_trait]
impl InterceptHook for TracingHook {
    async fn on_outcome(&self, req: &Request, outcome: &Outcome) {
        match outcome {
            Outcome::StoreFailed { .. } | Outcome::FallbackMissing | Outcome::NetworkError { .. } => {
                warn!(method = %req.method, url = %req.url, outcome = %outcome, "request degraded")
            }
            _ => debug!(method = %req.method, url = %req.url, outcome = %outcome, "request served"),
        }
    }
}
