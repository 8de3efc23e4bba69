//! Hooks for recording resolution activity outside the resolution core.

use stackpro_core::{ResolutionKind, ResolutionSource};

/// Receives one callback per tier consulted and one per finished resolution.
///
/// Implementations must be cheap: they run inline on the resolution path.
pub trait ResolutionObserver: Send + Sync {
    /// A tier answered. `outcome` is `found`, `absent` or a source error kind.
    fn on_lookup(&self, _kind: ResolutionKind, _tier: ResolutionSource, _outcome: &'static str) {}

    /// A resolution finished, from the cache or from a chain walk.
    fn on_resolved(&self, _kind: ResolutionKind, _source: ResolutionSource, _degraded: bool) {}
}

/// Observer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ResolutionObserver for NoopObserver {}
