//! Capability base URL resolution.
//!
//! Tier order: global override (`CAP_<CAPABILITY>_BASE_URL`), remote
//! parameter store, configured fallback URL.

use std::sync::Arc;

use stackpro_core::{
    CapabilityId, Environment, OverrideKey, ResolutionKind, ResolutionRequest, ResolutionResult,
    ResolutionSource, ResolverConfig,
};
use tracing::instrument;

use crate::chain::{SharedCache, SourceChain};
use crate::health::HealthTracker;
use crate::observer::ResolutionObserver;
use crate::overrides::OverrideSource;
use crate::remote::ParameterStore;
use crate::tiers::{OverrideTier, RemoteTier};

fn base_url_key(request: &ResolutionRequest) -> Option<OverrideKey> {
    match request {
        ResolutionRequest::Capability { capability, .. } => {
            Some(OverrideKey::CapabilityBaseUrl(capability.clone()))
        }
        ResolutionRequest::Flag { .. } => None,
    }
}

fn trimmed(raw: &str) -> String {
    raw.trim().to_string()
}

pub struct CapabilityResolver {
    chain: SourceChain<String>,
    health: Arc<HealthTracker>,
    fallback_url: String,
}

impl CapabilityResolver {
    pub fn new(
        config: &ResolverConfig,
        overrides: Arc<dyn OverrideSource>,
        store: Arc<dyn ParameterStore>,
        health: Arc<HealthTracker>,
        cache: SharedCache,
        observer: Arc<dyn ResolutionObserver>,
    ) -> Self {
        let fallback_url = config.capability_fallback_url.clone();
        let fallback = fallback_url.clone();

        let chain = SourceChain::new(
            ResolutionKind::Capability,
            cache,
            Arc::new(move |_: &ResolutionRequest| fallback.clone()),
        )
        .with_ttl(config.cache_ttl)
        .with_observer(observer)
        .with_source(Arc::new(OverrideTier::new(
            overrides,
            ResolutionSource::Global,
            base_url_key,
            trimmed,
        )))
        .with_source(Arc::new(RemoteTier::new(
            store,
            config.product.clone(),
            config.remote_timeout,
            Arc::clone(&health),
        )));

        Self {
            chain,
            health,
            fallback_url,
        }
    }

    /// Resolve the base URL of a capability with its provenance.
    #[instrument(skip_all, fields(capability = %capability, environment = %environment))]
    pub async fn resolve_capability(
        &self,
        capability: &CapabilityId,
        environment: Environment,
    ) -> ResolutionResult<String> {
        let request = ResolutionRequest::capability(capability.clone(), environment);
        self.chain.resolve(&request).await
    }

    /// Convenience form returning only the URL.
    pub async fn resolve_capability_url(
        &self,
        capability: &CapabilityId,
        environment: Environment,
    ) -> String {
        self.resolve_capability(capability, environment).await.value
    }

    pub fn health(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }
}

impl std::fmt::Debug for CapabilityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityResolver")
            .field("chain", &self.chain)
            .field("fallback_url", &self.fallback_url)
            .finish()
    }
}
