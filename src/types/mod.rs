//! 类型模块：定义请求键与缓存响应等核心数据类型。
//!
//! # Types Module
//!
//! Core value types shared by the store, the fetcher and the interceptor.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Request`] | Intercepted outbound request (method, URL, headers) |
//! | [`RequestKey`] | Normalized method + URL used to address cached entries |
//! | [`CachedResponse`] | Immutable response snapshot (status, headers, body bytes) |
//!
//! ## Example
//!
//! ```rust
//! use offline_cache::types::{CachedResponse, Request, RequestKey};
//!
//! let req = Request::get("/cat.jpg#whiskers");
//! assert_eq!(req.key(), RequestKey::get("/cat.jpg"));
//!
//! let resp = CachedResponse::new(200, "meow").with_header("content-type", "image/jpeg");
//! let copy = resp.clone(); // shares the same body bytes
//! assert_eq!(copy.body, resp.body);
//! ```

pub mod request;
pub mod response;

pub use request::{Request, RequestKey};
pub use response::CachedResponse;
