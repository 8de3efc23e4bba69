//! Capability metadata assembled from live resolution.

use std::sync::Arc;

use stackpro_core::{
    create_capability_definition, CapabilityDefinition, CapabilityHealth, CapabilityId,
    CapabilityOverrides, Environment, FlagContext, FlagKey,
};
use tracing::warn;

use crate::capability::CapabilityResolver;
use crate::flag::TenantFlagResolver;

/// Builds [`CapabilityDefinition`]s from the `<capability>_enabled` flag and
/// the resolved base URL.
#[derive(Debug, Clone)]
pub struct CapabilityDirectory {
    capabilities: Arc<CapabilityResolver>,
    flags: Arc<TenantFlagResolver>,
}

impl CapabilityDirectory {
    pub fn new(capabilities: Arc<CapabilityResolver>, flags: Arc<TenantFlagResolver>) -> Self {
        Self {
            capabilities,
            flags,
        }
    }

    /// Name of the flag gating a capability.
    pub fn enabled_flag(capability: &CapabilityId) -> Option<FlagKey> {
        FlagKey::new(format!("{}_enabled", capability)).ok()
    }

    /// Describe one capability for a tenant context.
    ///
    /// A disabled capability has no base URL and `unknown` health. An enabled
    /// one carries the resolved URL; health is `degraded` (or `error` once
    /// the remote tier is past its failure threshold) when resolution was
    /// degraded, `unknown` when the URL is the fallback, else `healthy`.
    pub async fn describe(
        &self,
        capability: &CapabilityId,
        environment: Environment,
        context: &FlagContext,
    ) -> CapabilityDefinition {
        let Some(flag) = Self::enabled_flag(capability) else {
            warn!(capability = %capability, "Capability id does not form a valid flag key");
            return create_capability_definition(capability.clone(), CapabilityOverrides::new());
        };

        let gate = self.flags.resolve_tenant_flag(&flag, context).await;
        if !gate.value.is_enabled() {
            return create_capability_definition(
                capability.clone(),
                CapabilityOverrides::new()
                    .enabled(false)
                    .degraded(gate.degraded)
                    .health(CapabilityHealth::Unknown),
            );
        }

        let url = self
            .capabilities
            .resolve_capability(capability, environment)
            .await;
        let degraded = url.degraded || gate.degraded;
        let health = if url.degraded {
            match self.capabilities.health().status() {
                CapabilityHealth::Error => CapabilityHealth::Error,
                _ => CapabilityHealth::Degraded,
            }
        } else if gate.degraded {
            CapabilityHealth::Degraded
        } else if url.value == self.capabilities.fallback_url() {
            CapabilityHealth::Unknown
        } else {
            CapabilityHealth::Healthy
        };

        create_capability_definition(
            capability.clone(),
            CapabilityOverrides::new()
                .enabled(true)
                .degraded(degraded)
                .base_url(Some(url.value))
                .health(health),
        )
    }
}
