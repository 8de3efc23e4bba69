//! Expiring cache with lazy eviction and read-only introspection.
//!
//! Entries carry an absolute expiry. A read past expiry behaves exactly like
//! a miss and evicts the entry; nothing runs in the background. Time is read
//! through an injected [`stackpro_core::Clock`] so expiry is testable.
//!
//! # Example
//!
//! ```ignore
//! let cache: ResolutionCache<CachedResolution> = ExpiringCache::new(Arc::new(SystemClock));
//! cache.set_default(key.clone(), value);
//! assert!(cache.get(&key).is_some());
//! cache.clear();
//! assert_eq!(cache.stats().size, 0);
//! ```

pub mod expiring;
pub mod stats;

pub use expiring::{CacheEntry, ExpiringCache, ResolutionCache};
pub use stats::CacheStats;
