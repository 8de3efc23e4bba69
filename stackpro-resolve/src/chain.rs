//! Ordered source chain with a cache in front and a default behind.
//!
//! Every resolver in this crate is a [`SourceChain`] with different tiers:
//!
//! ```text
//! cache hit? ── yes ──> (value, Cache, stored degraded bit)
//!    │ no
//!    ▼
//! tier 1 ─ Absent/Failed ─> tier 2 ─ ... ─> default
//!    │ Found                  │ Found          │
//!    ▼                        ▼                ▼
//!           write (value, degraded) to cache, return
//! ```
//!
//! A failed tier marks the result degraded but never aborts the walk, so
//! resolution always yields a value.

use std::sync::Arc;
use std::time::Duration;

use stackpro_core::{
    CachePayload, ResolutionKind, ResolutionRequest, ResolutionResult, ResolutionSource,
    ResolvedValue,
};
use stackpro_storage::ResolutionCache;
use tracing::{debug, warn};

use crate::observer::{NoopObserver, ResolutionObserver};
use crate::source::{SourceOutcome, ValueSource};

/// Cache payload: the resolved value plus the degraded bit it was produced with.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResolution {
    pub value: ResolvedValue,
    pub degraded: bool,
}

/// The cache shared by all chains of one resolver bundle.
pub type SharedCache = Arc<ResolutionCache<CachedResolution>>;

/// Produces the last-resort value for a request.
pub type DefaultFn<V> = Arc<dyn Fn(&ResolutionRequest) -> V + Send + Sync>;

pub struct SourceChain<V: CachePayload> {
    kind: ResolutionKind,
    sources: Vec<Arc<dyn ValueSource<V>>>,
    default: DefaultFn<V>,
    cache: SharedCache,
    ttl: Duration,
    observer: Arc<dyn ResolutionObserver>,
}

impl<V: CachePayload> SourceChain<V> {
    pub fn new(kind: ResolutionKind, cache: SharedCache, default: DefaultFn<V>) -> Self {
        let ttl = cache.default_ttl();
        Self {
            kind,
            sources: Vec::new(),
            default,
            cache,
            ttl,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Append a tier. Tiers are consulted in insertion order.
    pub fn with_source(mut self, source: Arc<dyn ValueSource<V>>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn kind(&self) -> ResolutionKind {
        self.kind
    }

    /// Resolve through the cache, walking the tiers on a miss.
    ///
    /// A hit returns the stored value with `source = Cache` and leaves the
    /// entry untouched. A miss always writes the walked result back.
    pub async fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult<V> {
        let key = request.cache_key();

        if let Some(cached) = self.cache.get(&key) {
            let degraded = cached.degraded;
            if let Some(value) = V::from_resolved(cached.value) {
                debug!(key = %key, degraded, "Resolved from cache");
                self.observer
                    .on_resolved(self.kind, ResolutionSource::Cache, degraded);
                return ResolutionResult::new(value, ResolutionSource::Cache, degraded);
            }
            // Keys are namespaced by kind, so this only happens if a caller
            // wrote a foreign payload under our key. Treat it as a miss.
            warn!(key = %key, "Cached payload has the wrong kind, ignoring");
        }

        let result = self.walk(request).await;

        self.cache.set(
            key.clone(),
            CachedResolution {
                value: result.value.clone().into_resolved(),
                degraded: result.degraded,
            },
            self.ttl,
        );
        debug!(
            key = %key,
            source = %result.source,
            degraded = result.degraded,
            "Resolved and cached"
        );
        self.observer
            .on_resolved(self.kind, result.source, result.degraded);

        result
    }

    /// Walk the tiers without touching the cache.
    pub async fn walk(&self, request: &ResolutionRequest) -> ResolutionResult<V> {
        let mut degraded = false;

        for source in &self.sources {
            let outcome = source.lookup(request).await;
            self.observer
                .on_lookup(self.kind, source.tier(), outcome.label());

            match outcome {
                SourceOutcome::Found(value) => {
                    return ResolutionResult::new(value, source.tier(), degraded);
                }
                SourceOutcome::Absent => {}
                SourceOutcome::Failed(err) => {
                    degraded = true;
                    warn!(
                        kind = %self.kind,
                        subject = request.subject(),
                        tier = %source.tier(),
                        source_name = source.name(),
                        error_kind = err.kind(),
                        error = %err,
                        "Source tier failed, falling through"
                    );
                }
            }
        }

        ResolutionResult::new((self.default)(request), ResolutionSource::Default, degraded)
    }
}

impl<V: CachePayload> std::fmt::Debug for SourceChain<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("SourceChain")
            .field("kind", &self.kind)
            .field("sources", &names)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stackpro_core::{CapabilityId, Environment, ManualClock, SourceError};
    use stackpro_storage::ExpiringCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        tier: ResolutionSource,
        outcome: SourceOutcome<String>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(tier: ResolutionSource, outcome: SourceOutcome<String>) -> Arc<Self> {
            Arc::new(Self {
                tier,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValueSource<String> for Scripted {
        fn tier(&self) -> ResolutionSource {
            self.tier
        }

        fn name(&self) -> &str {
            "scripted"
        }

        async fn lookup(&self, _request: &ResolutionRequest) -> SourceOutcome<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn failure() -> SourceError {
        SourceError::Unreachable {
            source_name: "remote".to_string(),
            reason: "connection refused".to_string(),
        }
    }

    fn request() -> ResolutionRequest {
        ResolutionRequest::capability(CapabilityId::new("messaging").unwrap(), Environment::Sandbox)
    }

    fn chain(clock: Arc<ManualClock>) -> SourceChain<String> {
        let cache: SharedCache = Arc::new(ExpiringCache::new(clock));
        SourceChain::new(
            ResolutionKind::Capability,
            cache,
            Arc::new(|_: &ResolutionRequest| "/api".to_string()),
        )
    }

    #[tokio::test]
    async fn test_first_found_wins() {
        let first = Scripted::new(ResolutionSource::Global, SourceOutcome::Found("a".into()));
        let second = Scripted::new(ResolutionSource::Remote, SourceOutcome::Found("b".into()));
        let chain = chain(Arc::new(ManualClock::starting_now()))
            .with_source(first.clone())
            .with_source(second.clone());

        let result = chain.resolve(&request()).await;
        assert_eq!(result.value, "a");
        assert_eq!(result.source, ResolutionSource::Global);
        assert!(!result.degraded);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_absent_falls_through_without_degrading() {
        let chain = chain(Arc::new(ManualClock::starting_now()))
            .with_source(Scripted::new(ResolutionSource::Global, SourceOutcome::Absent));

        let result = chain.resolve(&request()).await;
        assert_eq!(result.value, "/api");
        assert_eq!(result.source, ResolutionSource::Default);
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn test_failure_degrades_and_is_cached() {
        let remote = Scripted::new(ResolutionSource::Remote, SourceOutcome::Failed(failure()));
        let chain = chain(Arc::new(ManualClock::starting_now())).with_source(remote.clone());

        let first = chain.resolve(&request()).await;
        assert_eq!(first.source, ResolutionSource::Default);
        assert!(first.degraded);

        let second = chain.resolve(&request()).await;
        assert_eq!(second.source, ResolutionSource::Cache);
        assert!(second.degraded);
        assert_eq!(second.value, "/api");
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_expiry_triggers_new_walk() {
        let clock = Arc::new(ManualClock::starting_now());
        let remote = Scripted::new(ResolutionSource::Remote, SourceOutcome::Found("x".into()));
        let chain = chain(clock.clone())
            .with_ttl(Duration::from_secs(5))
            .with_source(remote.clone());

        chain.resolve(&request()).await;
        clock.advance(Duration::from_secs(4));
        assert_eq!(chain.resolve(&request()).await.source, ResolutionSource::Cache);
        clock.advance(Duration::from_secs(1));
        assert_eq!(chain.resolve(&request()).await.source, ResolutionSource::Remote);
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn test_walk_bypasses_cache() {
        let remote = Scripted::new(ResolutionSource::Remote, SourceOutcome::Found("x".into()));
        let chain = chain(Arc::new(ManualClock::starting_now())).with_source(remote.clone());

        chain.walk(&request()).await;
        chain.walk(&request()).await;
        assert_eq!(remote.calls(), 2);
    }
}
