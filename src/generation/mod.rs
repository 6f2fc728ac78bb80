//! 代管理模块：安装时预填充当前代，激活时回收旧代。
//!
//! # Generation Management Module
//!
//! One deployment of the cache owns exactly one *current* generation. This
//! module fills it before serving starts and removes superseded generations
//! once the new version takes over.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`GenerationManager`] | `seed` (install) and `reap` (activate) |
//! | [`ReapReport`] | Per-generation result of a reap |
//! | [`Lifecycle`] | `installing -> installed -> activating -> active` state machine |
//!
//! ## Seeding
//!
//! Every seed URL is fetched concurrently. Nothing is written unless all of
//! them return a 2xx response, so a failed install never leaves half a
//! generation visible to the cross-generation lookup of an older version.
//!
//! ## Reaping
//!
//! Only generations whose tag starts with the configured prefix are candidates;
//! anything else in the store belongs to someone else and is left alone.
//! Deletions run concurrently and independently.

mod lifecycle;
mod manager;

pub use lifecycle::{Lifecycle, LifecycleState};
pub use manager::{GenerationManager, ReapReport};
