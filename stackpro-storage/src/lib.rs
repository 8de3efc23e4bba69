//! STACKPRO Storage
//!
//! Process-local storage for resolved values. The only store today is the
//! [`ExpiringCache`]: nothing in the resolution core persists state.

pub mod cache;

pub use cache::{CacheEntry, CacheStats, ExpiringCache, ResolutionCache};
