//! The resolver bundle: one cache, one health tracker, both resolvers.

use std::sync::Arc;

use stackpro_core::{
    CapabilityDefinition, CapabilityId, Clock, Environment, FlagContext, FlagDefaults,
    FlagHealth, FlagKey, FlagResult, ResolutionKey, ResolutionResult, ResolverConfig,
    StackproResult, SystemClock,
};
use stackpro_storage::{CacheStats, ExpiringCache};
use tracing::{info, warn};

use crate::capability::CapabilityResolver;
use crate::chain::SharedCache;
use crate::directory::CapabilityDirectory;
use crate::flag::TenantFlagResolver;
use crate::health::{HealthSnapshot, HealthTracker, ReachabilityProbe, StubProbe};
use crate::observer::{NoopObserver, ResolutionObserver};
use crate::overrides::{EnvOverrides, LayeredOverrides, MapOverrides, OverrideSource};
use crate::remote::{DisabledParameterStore, HttpParameterStore, ParameterStore};

/// Builder for [`Resolvers`]. Unset collaborators take production defaults:
/// wall clock, environment overrides, no remote store, stub flag probe.
pub struct ResolversBuilder {
    config: ResolverConfig,
    clock: Option<Arc<dyn Clock>>,
    overrides: Option<Arc<dyn OverrideSource>>,
    store: Option<Arc<dyn ParameterStore>>,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    observer: Option<Arc<dyn ResolutionObserver>>,
    defaults: FlagDefaults,
}

impl ResolversBuilder {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            clock: None,
            overrides: None,
            store: None,
            probe: None,
            observer: None,
            defaults: FlagDefaults::builtin(),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn overrides(mut self, overrides: Arc<dyn OverrideSource>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn parameter_store(mut self, store: Arc<dyn ParameterStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn flag_defaults(mut self, defaults: FlagDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Assemble the bundle. Invalid config fields are replaced with their
    /// defaults so the fallback URL is never empty and TTLs are never zero.
    pub fn build(self) -> Resolvers {
        let (config, replaced) = self.config.repaired();
        if !replaced.is_empty() {
            warn!(fields = ?replaced, "Invalid resolver config fields replaced with defaults");
        }
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let overrides = self.overrides.unwrap_or_else(|| Arc::new(EnvOverrides));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(DisabledParameterStore));
        let probe = self.probe.unwrap_or_else(|| Arc::new(StubProbe));
        let observer = self.observer.unwrap_or_else(|| Arc::new(NoopObserver));

        let cache: SharedCache = Arc::new(ExpiringCache::with_ttl(
            Arc::clone(&clock),
            config.cache_ttl,
        ));
        let health = Arc::new(HealthTracker::new(
            Arc::clone(&clock),
            config.degraded_threshold,
        ));

        let capabilities = Arc::new(CapabilityResolver::new(
            &config,
            Arc::clone(&overrides),
            store,
            Arc::clone(&health),
            Arc::clone(&cache),
            Arc::clone(&observer),
        ));
        let flags = Arc::new(TenantFlagResolver::new(
            &config,
            overrides,
            self.defaults,
            probe,
            clock,
            Arc::clone(&cache),
            observer,
        ));
        let directory = CapabilityDirectory::new(Arc::clone(&capabilities), Arc::clone(&flags));

        Resolvers {
            config,
            cache,
            health,
            capabilities,
            flags,
            directory,
        }
    }
}

/// Everything a host process needs to resolve capabilities and flags.
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
#[derive(Debug)]
pub struct Resolvers {
    config: ResolverConfig,
    cache: SharedCache,
    health: Arc<HealthTracker>,
    capabilities: Arc<CapabilityResolver>,
    flags: Arc<TenantFlagResolver>,
    directory: CapabilityDirectory,
}

impl Resolvers {
    pub fn builder(config: ResolverConfig) -> ResolversBuilder {
        ResolversBuilder::new(config)
    }

    /// Production wiring from configuration.
    pub fn from_config(config: ResolverConfig) -> StackproResult<Self> {
        Ok(Self::configured(config)?.build())
    }

    /// Builder pre-wired from configuration, for hosts that still want to
    /// plug in an observer or probe.
    ///
    /// Overrides are the optional TOML file layered over the process
    /// environment (file first). The remote tier is HTTP when a store URL is
    /// configured and disabled otherwise.
    pub fn configured(config: ResolverConfig) -> StackproResult<ResolversBuilder> {
        config.validate()?;

        let overrides: Arc<dyn OverrideSource> = match &config.overrides_file {
            Some(path) => {
                let file = MapOverrides::from_toml_file(path)?;
                info!(path = %path.display(), entries = file.len(), "Loaded overrides file");
                Arc::new(LayeredOverrides::new(vec![
                    Arc::new(file),
                    Arc::new(EnvOverrides),
                ]))
            }
            None => Arc::new(EnvOverrides),
        };

        let store: Arc<dyn ParameterStore> = match &config.parameter_store_url {
            Some(url) => {
                info!(endpoint = %url, "Remote parameter store enabled");
                Arc::new(HttpParameterStore::new(url.clone(), config.remote_timeout))
            }
            None => {
                info!("No parameter store configured, remote tier disabled");
                Arc::new(DisabledParameterStore)
            }
        };

        Ok(Self::builder(config)
            .overrides(overrides)
            .parameter_store(store))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn resolve_capability(
        &self,
        capability: &CapabilityId,
        environment: Environment,
    ) -> ResolutionResult<String> {
        self.capabilities
            .resolve_capability(capability, environment)
            .await
    }

    pub async fn resolve_capability_url(
        &self,
        capability: &CapabilityId,
        environment: Environment,
    ) -> String {
        self.capabilities
            .resolve_capability_url(capability, environment)
            .await
    }

    pub async fn resolve_tenant_flag(&self, flag: &FlagKey, context: &FlagContext) -> FlagResult {
        self.flags.resolve_tenant_flag(flag, context).await
    }

    pub async fn resolve_tenant_flags(
        &self,
        flags: &[FlagKey],
        context: &FlagContext,
    ) -> std::collections::BTreeMap<FlagKey, FlagResult> {
        self.flags.resolve_tenant_flags(flags, context).await
    }

    pub async fn check_flag_health(&self) -> FlagHealth {
        self.flags.check_flag_health().await
    }

    pub async fn describe_capability(
        &self,
        capability: &CapabilityId,
        environment: Environment,
        context: &FlagContext,
    ) -> CapabilityDefinition {
        self.directory
            .describe(capability, environment, context)
            .await
    }

    /// Health of the remote tier.
    pub fn remote_health(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Drop every cached resolution. Returns the number of entries removed.
    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear();
        info!(removed, "Resolution cache cleared");
        removed
    }

    /// Drop one cached resolution.
    pub fn invalidate(&self, key: &ResolutionKey) -> bool {
        self.cache.remove(key)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn capabilities(&self) -> &Arc<CapabilityResolver> {
        &self.capabilities
    }

    pub fn flags(&self) -> &Arc<TenantFlagResolver> {
        &self.flags
    }
}
