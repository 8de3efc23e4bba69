//! Tenant-scoped feature flag resolution.
//!
//! Tier order: tenant override (`<flag>:tenant:<tenant>`, only when a tenant
//! is given), global override (`<flag>`), compiled-in default. The client id
//! in the context is logged but never changes precedence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures_util::future::join_all;
use stackpro_core::{
    CapabilityHealth, Clock, FlagContext, FlagDefaults, FlagHealth, FlagKey, FlagResult,
    FlagValue, OverrideKey, ResolutionKind, ResolutionRequest, ResolutionSource, ResolverConfig,
};
use tracing::{debug, instrument, warn};

use crate::chain::{SharedCache, SourceChain};
use crate::health::ReachabilityProbe;
use crate::observer::ResolutionObserver;
use crate::overrides::OverrideSource;
use crate::tiers::OverrideTier;

fn tenant_key(request: &ResolutionRequest) -> Option<OverrideKey> {
    match request {
        ResolutionRequest::Flag { flag, context } => context
            .tenant_id
            .as_ref()
            .map(|tenant| OverrideKey::TenantFlag(flag.clone(), tenant.clone())),
        ResolutionRequest::Capability { .. } => None,
    }
}

fn global_key(request: &ResolutionRequest) -> Option<OverrideKey> {
    match request {
        ResolutionRequest::Flag { flag, .. } => Some(OverrideKey::GlobalFlag(flag.clone())),
        ResolutionRequest::Capability { .. } => None,
    }
}

pub struct TenantFlagResolver {
    chain: SourceChain<FlagValue>,
    defaults: Arc<FlagDefaults>,
    probe: Arc<dyn ReachabilityProbe>,
    clock: Arc<dyn Clock>,
}

impl TenantFlagResolver {
    pub fn new(
        config: &ResolverConfig,
        overrides: Arc<dyn OverrideSource>,
        defaults: FlagDefaults,
        probe: Arc<dyn ReachabilityProbe>,
        clock: Arc<dyn Clock>,
        cache: SharedCache,
        observer: Arc<dyn ResolutionObserver>,
    ) -> Self {
        let defaults = Arc::new(defaults);
        let table = Arc::clone(&defaults);

        let chain = SourceChain::new(
            ResolutionKind::Flag,
            cache,
            Arc::new(move |request: &ResolutionRequest| match request {
                ResolutionRequest::Flag { flag, .. } => table.get(flag),
                ResolutionRequest::Capability { .. } => FlagDefaults::UNKNOWN,
            }),
        )
        .with_ttl(config.cache_ttl)
        .with_observer(observer)
        .with_source(Arc::new(OverrideTier::new(
            Arc::clone(&overrides),
            ResolutionSource::Tenant,
            tenant_key,
            FlagValue::from_raw,
        )))
        .with_source(Arc::new(OverrideTier::new(
            overrides,
            ResolutionSource::Global,
            global_key,
            FlagValue::from_raw,
        )));

        Self {
            chain,
            defaults,
            probe,
            clock,
        }
    }

    /// Resolve one flag for a tenant context.
    #[instrument(
        skip_all,
        fields(
            flag = %flag,
            tenant_id = context.tenant_id.as_ref().map(|t| t.as_str()),
            client_id = context.client_id.as_deref(),
        )
    )]
    pub async fn resolve_tenant_flag(&self, flag: &FlagKey, context: &FlagContext) -> FlagResult {
        let request = ResolutionRequest::flag(flag.clone(), context.clone());
        self.chain.resolve(&request).await
    }

    /// Resolve several flags concurrently against the same context.
    ///
    /// Duplicate keys collapse to one entry.
    pub async fn resolve_tenant_flags(
        &self,
        flags: &[FlagKey],
        context: &FlagContext,
    ) -> BTreeMap<FlagKey, FlagResult> {
        // Resolving a repeated key concurrently would turn its second copy
        // into a cache hit of the first.
        let unique: BTreeSet<&FlagKey> = flags.iter().collect();
        let lookups = unique.into_iter().map(|flag| async move {
            let result = self.resolve_tenant_flag(flag, context).await;
            (flag.clone(), result)
        });
        join_all(lookups).await.into_iter().collect()
    }

    /// Probe the override backing store.
    pub async fn check_flag_health(&self) -> FlagHealth {
        let checked_at = self.clock.now();
        let stub = self.probe.is_stub();
        let backing_store = self.probe.name().to_string();

        match self.probe.probe().await {
            Ok(()) => {
                debug!(backing_store = %backing_store, stub, "Flag store reachable");
                FlagHealth {
                    healthy: true,
                    status: CapabilityHealth::Healthy,
                    backing_store,
                    stub,
                    message: stub
                        .then(|| "No remote flag store configured; overrides are local".to_string()),
                    checked_at,
                }
            }
            Err(err) => {
                warn!(backing_store = %backing_store, error = %err, "Flag store unreachable");
                FlagHealth {
                    healthy: false,
                    status: CapabilityHealth::Error,
                    backing_store,
                    stub,
                    message: Some(err.to_string()),
                    checked_at,
                }
            }
        }
    }

    pub fn defaults(&self) -> &FlagDefaults {
        &self.defaults
    }
}

impl std::fmt::Debug for TenantFlagResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantFlagResolver")
            .field("chain", &self.chain)
            .field("probe", &self.probe.name())
            .finish()
    }
}
