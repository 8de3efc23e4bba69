//! STACKPRO Test Utilities
//!
//! Shared test infrastructure for the STACKPRO workspace:
//! - Scriptable fakes for the remote store, probes, and observers
//! - Proptest generators for ids and raw flag values
//! - Fixtures for common resolver wiring
//! - Scoped environment variable guards

pub use stackpro_core::{
    CapabilityId, Environment, FlagContext, FlagKey, FlagValue, ManualClock, ParameterPath,
    ResolutionKind, ResolutionSource, ResolverConfig, SourceError, TenantId,
};
pub use stackpro_resolve::{
    MapOverrides, ParameterStore, ReachabilityProbe, ResolutionObserver, Resolvers,
};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
// FAKE PARAMETER STORE
// ============================================================================

#[derive(Debug, Clone)]
enum StoreMode {
    Answer,
    Fail(SourceError),
    Stall(Duration),
}

/// In-memory [`ParameterStore`] with switchable failure modes and a call
/// counter.
#[derive(Debug)]
pub struct FakeParameterStore {
    values: Mutex<HashMap<String, String>>,
    mode: Mutex<StoreMode>,
    calls: AtomicUsize,
}

impl FakeParameterStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            mode: Mutex::new(StoreMode::Answer),
            calls: AtomicUsize::new(0),
        }
    }

    /// Store a value at the full parameter path, e.g.
    /// `/stackpro/sandbox/capabilities/messaging/base-url`.
    pub fn with_value(self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(path, value);
        self
    }

    /// Store a capability base URL under the default product.
    pub fn with_capability(
        self,
        capability: &str,
        environment: Environment,
        value: impl Into<String>,
    ) -> Self {
        let path = format!(
            "/{}/{}/capabilities/{}/base-url",
            stackpro_core::DEFAULT_PRODUCT,
            environment,
            capability
        );
        self.with_value(path, value)
    }

    pub fn put(&self, path: impl Into<String>, value: impl Into<String>) {
        self.values
            .lock()
            .unwrap()
            .insert(path.into(), value.into());
    }

    /// Every lookup fails with `error` until [`FakeParameterStore::recover`].
    pub fn fail_with(&self, error: SourceError) {
        *self.mode.lock().unwrap() = StoreMode::Fail(error);
    }

    /// Every lookup fails as unreachable.
    pub fn go_down(&self) {
        self.fail_with(SourceError::Unreachable {
            source_name: "fake-store".to_string(),
            reason: "connection refused".to_string(),
        });
    }

    /// Every lookup sleeps for `delay` before answering.
    pub fn stall_for(&self, delay: Duration) {
        *self.mode.lock().unwrap() = StoreMode::Stall(delay);
    }

    pub fn recover(&self) {
        *self.mode.lock().unwrap() = StoreMode::Answer;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParameterStore for FakeParameterStore {
    fn name(&self) -> &str {
        "fake-store"
    }

    async fn get_parameter(&self, path: &ParameterPath) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            StoreMode::Fail(err) => return Err(err),
            StoreMode::Stall(delay) => tokio::time::sleep(delay).await,
            StoreMode::Answer => {}
        }
        Ok(self.values.lock().unwrap().get(&path.to_string()).cloned())
    }
}

// ============================================================================
// PROBES AND OBSERVERS
// ============================================================================

/// Probe that always reports the backing store as unreachable.
#[derive(Debug, Clone, Default)]
pub struct UnreachableProbe;

#[async_trait]
impl ReachabilityProbe for UnreachableProbe {
    fn name(&self) -> &str {
        "fake-flag-store"
    }

    async fn probe(&self) -> Result<(), SourceError> {
        Err(SourceError::Unreachable {
            source_name: "fake-flag-store".to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// One recorded [`ResolutionObserver::on_resolved`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResolution {
    pub kind: ResolutionKind,
    pub source: ResolutionSource,
    pub degraded: bool,
}

/// Observer that keeps every callback for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    resolutions: Mutex<Vec<ObservedResolution>>,
    lookups: Mutex<Vec<(ResolutionKind, ResolutionSource, &'static str)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolutions(&self) -> Vec<ObservedResolution> {
        self.resolutions.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<(ResolutionKind, ResolutionSource, &'static str)> {
        self.lookups.lock().unwrap().clone()
    }
}

impl ResolutionObserver for RecordingObserver {
    fn on_lookup(&self, kind: ResolutionKind, tier: ResolutionSource, outcome: &'static str) {
        self.lookups.lock().unwrap().push((kind, tier, outcome));
    }

    fn on_resolved(&self, kind: ResolutionKind, source: ResolutionSource, degraded: bool) {
        self.resolutions.lock().unwrap().push(ObservedResolution {
            kind,
            source,
            degraded,
        });
    }
}

// ============================================================================
// ENVIRONMENT GUARD
// ============================================================================

/// Sets an environment variable for the guard's lifetime and restores the
/// previous value on drop.
///
/// The process environment is global: tests using this must pick variable
/// names no other test touches.
#[derive(Debug)]
pub struct EnvVarGuard {
    key: String,
    previous: Option<String>,
}

impl EnvVarGuard {
    pub fn set(key: impl Into<String>, value: impl AsRef<str>) -> Self {
        let key = key.into();
        let previous = std::env::var(&key).ok();
        std::env::set_var(&key, value.as_ref());
        Self { key, previous }
    }

    pub fn unset(key: impl Into<String>) -> Self {
        let key = key.into();
        let previous = std::env::var(&key).ok();
        std::env::remove_var(&key);
        Self { key, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => std::env::set_var(&self.key, value),
            None => std::env::remove_var(&self.key),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for STACKPRO identifiers and raw values.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_capability_id() -> impl Strategy<Value = CapabilityId> {
        "[a-z][a-z0-9_-]{0,20}".prop_map(|s| CapabilityId::new(s).unwrap())
    }

    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        "[a-zA-Z0-9][a-zA-Z0-9._-]{0,30}".prop_map(|s| TenantId::new(s).unwrap())
    }

    pub fn arb_flag_key() -> impl Strategy<Value = FlagKey> {
        "[a-z][a-z0-9_.-]{0,30}".prop_map(|s| FlagKey::new(s).unwrap())
    }

    pub fn arb_environment() -> impl Strategy<Value = Environment> {
        prop_oneof![Just(Environment::Sandbox), Just(Environment::Production)]
    }

    /// Raw override text: booleans, near-booleans, and arbitrary words.
    pub fn arb_raw_flag_value() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("true".to_string()),
            Just("false".to_string()),
            Just("TRUE".to_string()),
            Just("1".to_string()),
            Just("yes".to_string()),
            "[a-z0-9]{1,12}",
        ]
    }

    pub fn arb_url() -> impl Strategy<Value = String> {
        "[a-z]{1,10}".prop_map(|host| format!("https://{}.example", host))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made wiring for resolver tests.

    use super::*;

    /// Bundle of a [`Resolvers`] and the fakes behind it.
    pub struct Harness {
        pub resolvers: Resolvers,
        pub clock: Arc<ManualClock>,
        pub overrides: Arc<MapOverrides>,
        pub store: Arc<FakeParameterStore>,
        pub observer: Arc<RecordingObserver>,
    }

    /// Config with a short remote timeout so stalled-store tests finish fast.
    pub fn test_config() -> ResolverConfig {
        ResolverConfig::default().with_remote_timeout(Duration::from_millis(100))
    }

    pub fn harness() -> Harness {
        harness_with(test_config(), FakeParameterStore::new())
    }

    pub fn harness_with(config: ResolverConfig, store: FakeParameterStore) -> Harness {
        let clock = Arc::new(ManualClock::starting_now());
        let overrides = Arc::new(MapOverrides::new());
        let store = Arc::new(store);
        let observer = Arc::new(RecordingObserver::new());

        let resolvers = Resolvers::builder(config)
            .clock(clock.clone())
            .overrides(overrides.clone())
            .parameter_store(store.clone())
            .observer(observer.clone())
            .build();

        Harness {
            resolvers,
            clock,
            overrides,
            store,
            observer,
        }
    }

    pub fn capability(name: &str) -> CapabilityId {
        CapabilityId::new(name).unwrap()
    }

    pub fn flag(name: &str) -> FlagKey {
        FlagKey::new(name).unwrap()
    }

    pub fn tenant(name: &str) -> FlagContext {
        FlagContext::for_tenant(TenantId::new(name).unwrap())
    }
}
