//! Health of the remote tier and of the override backing store.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use stackpro_core::{CapabilityHealth, Clock, SourceError, Timestamp, DEFAULT_DEGRADED_THRESHOLD};
use tracing::{info, warn};

/// Point-in-time view of a [`HealthTracker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub status: CapabilityHealth,
    pub degraded: bool,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<Timestamp>,
}

impl HealthSnapshot {
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[derive(Debug, Default)]
struct HealthState {
    consecutive_failures: u32,
    last_error: Option<String>,
    last_checked_at: Option<Timestamp>,
    last_success_at: Option<Timestamp>,
}

/// Consecutive-failure tracker for one remote dependency.
///
/// `unknown` until the first outcome, `healthy` after a success, `degraded`
/// after a failure, `error` once failures reach the threshold. One success
/// resets the count.
pub struct HealthTracker {
    state: RwLock<HealthState>,
    clock: Arc<dyn Clock>,
    threshold: u32,
}

impl HealthTracker {
    pub fn new(clock: Arc<dyn Clock>, threshold: u32) -> Self {
        Self {
            state: RwLock::new(HealthState::default()),
            clock,
            threshold: threshold.max(1),
        }
    }

    pub fn with_default_threshold(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, DEFAULT_DEGRADED_THRESHOLD)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn record_success(&self) {
        let now = self.clock.now();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.consecutive_failures > 0 {
            info!(
                failures = state.consecutive_failures,
                "Remote source recovered"
            );
        }
        state.consecutive_failures = 0;
        state.last_error = None;
        state.last_checked_at = Some(now);
        state.last_success_at = Some(now);
    }

    pub fn record_failure(&self, error: &SourceError) {
        let now = self.clock.now();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_error = Some(error.to_string());
        state.last_checked_at = Some(now);
        if state.consecutive_failures == self.threshold {
            warn!(
                failures = state.consecutive_failures,
                error = %error,
                "Remote source reached failure threshold"
            );
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let status = match (state.last_checked_at, state.consecutive_failures) {
            (None, _) => CapabilityHealth::Unknown,
            (Some(_), 0) => CapabilityHealth::Healthy,
            (Some(_), n) if n >= self.threshold => CapabilityHealth::Error,
            (Some(_), _) => CapabilityHealth::Degraded,
        };
        HealthSnapshot {
            status,
            degraded: status.is_degraded(),
            consecutive_failures: state.consecutive_failures,
            last_error: state.last_error.clone(),
            last_checked_at: state.last_checked_at,
            last_success_at: state.last_success_at,
        }
    }

    pub fn status(&self) -> CapabilityHealth {
        self.snapshot().status
    }

    pub fn is_degraded(&self) -> bool {
        self.snapshot().is_degraded()
    }

    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = HealthState::default();
    }
}

impl std::fmt::Debug for HealthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthTracker")
            .field("threshold", &self.threshold)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

// ============================================================================
// REACHABILITY PROBES
// ============================================================================

/// Checks whether a backing store answers at all.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    fn name(&self) -> &str;

    /// True when the probe is a placeholder whose answer carries no signal.
    fn is_stub(&self) -> bool {
        false
    }

    async fn probe(&self) -> Result<(), SourceError>;
}

/// Placeholder probe for deployments without a remote override store.
/// Always reports reachable and marks itself as a stub.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubProbe;

#[async_trait]
impl ReachabilityProbe for StubProbe {
    fn name(&self) -> &str {
        "none"
    }

    fn is_stub(&self) -> bool {
        true
    }

    async fn probe(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
