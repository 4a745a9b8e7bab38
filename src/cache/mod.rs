//! Generic resource cache with per-slot freshness tracking.
//!
//! This module provides a source-agnostic caching mechanism that:
//! - Keeps one independently timed slot per resource
//! - Serves stale values while a single background refresh runs
//! - Never discards a good value because a refresh failed
//! - Supports on-demand, blocking and scheduled refresh policies

mod layer;
mod slot;
mod traits;

pub use layer::{CacheSettings, ResourceCache};
pub use traits::{BoxFuture, Resource, SlotState, SlotStatus, Source};

#[cfg(test)]
pub(crate) use layer::tests as test_support;
