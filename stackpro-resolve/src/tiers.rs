//! Concrete [`ValueSource`] tiers shared by the resolvers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stackpro_core::{
    OverrideKey, ParameterPath, ResolutionRequest, ResolutionSource, SourceError,
};

use crate::health::HealthTracker;
use crate::overrides::OverrideSource;
use crate::remote::ParameterStore;
use crate::source::{SourceOutcome, ValueSource};

/// Maps a request to the override entry a tier reads, if any.
pub type KeyFn = fn(&ResolutionRequest) -> Option<OverrideKey>;

/// Tier reading one entry of an override mapping.
///
/// Blank values are absent. `convert` turns the raw string into the
/// resolver's value type.
pub struct OverrideTier<V> {
    overrides: Arc<dyn OverrideSource>,
    tier: ResolutionSource,
    key_for: KeyFn,
    convert: fn(&str) -> V,
}

impl<V> OverrideTier<V> {
    pub fn new(
        overrides: Arc<dyn OverrideSource>,
        tier: ResolutionSource,
        key_for: KeyFn,
        convert: fn(&str) -> V,
    ) -> Self {
        Self {
            overrides,
            tier,
            key_for,
            convert,
        }
    }
}

#[async_trait]
impl<V: Send + Sync + 'static> ValueSource<V> for OverrideTier<V> {
    fn tier(&self) -> ResolutionSource {
        self.tier
    }

    fn name(&self) -> &str {
        self.overrides.name()
    }

    async fn lookup(&self, request: &ResolutionRequest) -> SourceOutcome<V> {
        let Some(key) = (self.key_for)(request) else {
            return SourceOutcome::Absent;
        };
        match self.overrides.get(&key) {
            Ok(Some(raw)) if !raw.trim().is_empty() => SourceOutcome::Found((self.convert)(&raw)),
            Ok(_) => SourceOutcome::Absent,
            Err(err) => SourceOutcome::Failed(err),
        }
    }
}

/// Tier reading capability base URLs from the remote parameter store.
///
/// Each lookup is bounded by `timeout` and its outcome feeds the shared
/// [`HealthTracker`]. A disabled store is skipped without touching health.
pub struct RemoteTier {
    store: Arc<dyn ParameterStore>,
    product: String,
    timeout: Duration,
    health: Arc<HealthTracker>,
}

impl RemoteTier {
    pub fn new(
        store: Arc<dyn ParameterStore>,
        product: impl Into<String>,
        timeout: Duration,
        health: Arc<HealthTracker>,
    ) -> Self {
        Self {
            store,
            product: product.into(),
            timeout,
            health,
        }
    }

    async fn fetch(&self, path: &ParameterPath) -> Result<Option<String>, SourceError> {
        match tokio::time::timeout(self.timeout, self.store.get_parameter(path)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout {
                source_name: self.store.name().to_string(),
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl ValueSource<String> for RemoteTier {
    fn tier(&self) -> ResolutionSource {
        ResolutionSource::Remote
    }

    fn name(&self) -> &str {
        self.store.name()
    }

    async fn lookup(&self, request: &ResolutionRequest) -> SourceOutcome<String> {
        let ResolutionRequest::Capability {
            capability,
            environment,
        } = request
        else {
            return SourceOutcome::Absent;
        };
        if !self.store.is_enabled() {
            return SourceOutcome::Absent;
        }

        let path = ParameterPath::capability_base_url(self.product.as_str(), *environment, capability);
        match self.fetch(&path).await {
            Ok(value) => {
                self.health.record_success();
                match value.map(|v| v.trim().to_string()) {
                    Some(url) if !url.is_empty() => SourceOutcome::Found(url),
                    _ => {
                        tracing::debug!(path = %path, "No remote value");
                        SourceOutcome::Absent
                    }
                }
            }
            Err(err) => {
                self.health.record_failure(&err);
                SourceOutcome::Failed(err)
            }
        }
    }
}
