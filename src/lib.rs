//! # offline-cache
//!
//! 客户端 HTTP 响应缓存：缓存优先、回源写入、404 兜底页以及按代回收。
//!
//! A client-side HTTP response cache interposed between an application and the
//! network. Responses are kept in versioned *generations*; each deployment owns
//! one current generation, pre-populates it on install, and deletes the
//! generations it supersedes on activation.
//!
//! ## Core Behaviour
//!
//! - **Cache first**: a stored response in any generation is served as-is
//! - **Store on miss**: a miss is fetched once and written to the current generation
//! - **Not-found fallback**: an upstream 404 is replaced by a seeded fallback page
//! - **Always answers**: a network failure yields a fixed synthetic response
//! - **Generational cleanup**: superseded generations are removed wholesale
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use offline_cache::{CacheConfig, CacheWorker, Registration, Request};
//!
//! #[tokio::main]
//! async fn main() -> offline_cache::Result<()> {
//!     let config = CacheConfig::new()
//!         .with_generation("v8")
//!         .with_origin("https://example.com")
//!         .apply_env_overrides();
//!
//!     let registration = Registration::new();
//!     let report = registration
//!         .register(CacheWorker::builder().config(config).build()?)
//!         .await?;
//!     println!("reaped {:?}", report.deleted);
//!
//!     let resp = registration.handle(&Request::get("/new.css")).await;
//!     println!("{:?}", resp.map(|r| r.status));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Per-deployment configuration (generation, seed set, fallback, prefix) |
//! | [`types`] | Requests, request keys and immutable cached responses |
//! | [`store`] | Generational store trait with memory and disk backends |
//! | [`fetch`] | Network fetch trait and the reqwest-backed fetcher |
//! | [`interceptor`] | Request-path policy (hit, store, fallback, synthetic failure) |
//! | [`generation`] | Seeding, reaping and the version lifecycle |
//! | [`worker`] | One cache version plus the registration driver |

pub mod config;
pub mod fetch;
pub mod generation;
pub mod interceptor;
pub mod store;
pub mod types;
pub mod worker;

pub use config::CacheConfig;
pub use generation::{GenerationManager, LifecycleState, ReapReport};
pub use interceptor::{Interceptor, Outcome};
pub use store::{DiskStore, MemoryStore, Store};
pub use types::{CachedResponse, Request, RequestKey};
pub use worker::{CacheWorker, Registration};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
