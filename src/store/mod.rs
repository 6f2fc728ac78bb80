//! 存储模块：按代（generation）组织的缓存响应存储，支持可插拔后端。
//!
//! # Generational Store Module
//!
//! The store is a named collection of generations. Each generation maps a
//! [`RequestKey`] to a [`CachedResponse`]. Generations are created on first
//! open or write, filled one entry at a time, and only ever destroyed whole.
//! The store itself outlives every generation.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Store`] | Async trait every backend implements |
//! | [`MemoryStore`] | In-process store, insertion ordered |
//! | [`DiskStore`] | Directory-per-generation store with a JSON manifest |
//! | [`StoreError`] | Backend failures (I/O, corruption, poisoned locks) |
//!
//! ## Example
//!
//! ```rust
//! use offline_cache::store::{MemoryStore, Store};
//! use offline_cache::types::{CachedResponse, RequestKey};
//!
//! # tokio_test_block_on(async {
//! let store = MemoryStore::new();
//! store.put("v8", &RequestKey::get("/cat.jpg"), &CachedResponse::new(200, "meow")).await?;
//!
//! let hit = store.match_any(&RequestKey::get("/cat.jpg")).await?;
//! assert_eq!(hit.map(|(generation, _)| generation), Some("v8".to_string()));
//! # Ok::<(), offline_cache::store::StoreError>(())
//! # }).unwrap();
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::types::{CachedResponse, RequestKey};
use async_trait::async_trait;
use std::path::PathBuf;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store data at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A named collection of response generations.
///
/// Implementations must tolerate concurrent use: writes to the same key are
/// last-write-wins, and a read racing the deletion of its generation reports
/// `Ok(None)` rather than an error.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a generation, creating it if absent. Returns `true` when created.
    async fn open(&self, generation: &str) -> StoreResult<bool>;

    /// Inserts or replaces one entry, creating the generation if needed.
    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> StoreResult<()>;

    /// Looks up a key in a single generation.
    async fn get(&self, generation: &str, key: &RequestKey)
        -> StoreResult<Option<CachedResponse>>;

    /// Generation names in creation order.
    async fn list(&self) -> StoreResult<Vec<String>>;

    /// Deletes a whole generation. Returns `false` if it did not exist.
    async fn delete(&self, generation: &str) -> StoreResult<bool>;

    /// Keys held by a generation; empty when the generation does not exist.
    async fn keys(&self, generation: &str) -> StoreResult<Vec<RequestKey>>;

    async fn contains(&self, generation: &str) -> StoreResult<bool> {
        Ok(self.list().await?.iter().any(|g| g == generation))
    }

    /// Looks a key up across every generation in creation order and returns
    /// the first hit together with the generation that held it.
    async fn match_any(&self, key: &RequestKey) -> StoreResult<Option<(String, CachedResponse)>> {
        for generation in self.list().await? {
            if let Some(resp) = self.get(&generation, key).await? {
                return Ok(Some((generation, resp)));
            }
        }
        Ok(None)
    }

    fn name(&self) -> &'static str;
}
