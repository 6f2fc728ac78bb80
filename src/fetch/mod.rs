//! Network fetch primitive.
//!
//! The interceptor and the generation manager only see the [`Fetcher`] trait.
//! [`HttpFetcher`] is the reqwest-backed implementation used outside tests.

mod http;

pub use http::HttpFetcher;

use crate::types::{CachedResponse, Request};
use async_trait::async_trait;

/// A fetch that produced no HTTP response at all.
///
/// HTTP error statuses are *not* fetch errors; they arrive as ordinary
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("unsupported method '{0}'")]
    UnsupportedMethod(String),

    #[error("network unreachable: {0}")]
    Unreachable(String),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, FetchError>;
}
