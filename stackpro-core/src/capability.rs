//! Capability definitions for discovery.
//!
//! A [`CapabilityDefinition`] describes a capability beyond its bare URL.
//! Two invariants hold for every definition built here:
//!
//! - `base_url` is `None` whenever `enabled` is false
//! - `health == Error` implies `degraded`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::CapabilityId;

/// Version assigned when the caller does not provide one.
pub const DEFAULT_CAPABILITY_VERSION: &str = "1.0.0";

/// Scope granted when the caller does not provide any.
pub const DEFAULT_SCOPE: &str = "read";

/// Health of a capability or of a backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityHealth {
    Healthy,
    Degraded,
    Unknown,
    Error,
}

impl CapabilityHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityHealth::Healthy => "healthy",
            CapabilityHealth::Degraded => "degraded",
            CapabilityHealth::Unknown => "unknown",
            CapabilityHealth::Error => "error",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, CapabilityHealth::Degraded | CapabilityHealth::Error)
    }
}

impl fmt::Display for CapabilityHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityHealth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(CapabilityHealth::Healthy),
            "degraded" => Ok(CapabilityHealth::Degraded),
            "unknown" => Ok(CapabilityHealth::Unknown),
            "error" => Ok(CapabilityHealth::Error),
            other => Err(format!("unknown health value: {}", other)),
        }
    }
}

/// Full metadata of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDefinition {
    pub id: CapabilityId,
    pub version: String,
    pub enabled: bool,
    pub degraded: bool,
    pub base_url: Option<String>,
    pub scopes: BTreeSet<String>,
    pub health: CapabilityHealth,
}

impl CapabilityDefinition {
    /// Structural check of an untyped candidate, returning the typed
    /// definition when every field and invariant holds.
    pub fn from_candidate(candidate: &Value) -> Option<Self> {
        let obj = candidate.as_object()?;

        let id = obj.get("id")?.as_str()?;
        let id = CapabilityId::new(id).ok()?;

        let version = obj.get("version")?.as_str()?;
        if version.trim().is_empty() {
            return None;
        }

        let enabled = obj.get("enabled")?.as_bool()?;
        let degraded = obj.get("degraded")?.as_bool()?;

        let base_url = match obj.get("baseUrl") {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) => Some(url.clone()),
            Some(_) => return None,
        };

        let scopes = obj
            .get("scopes")?
            .as_array()?
            .iter()
            .map(|scope| scope.as_str().map(str::to_string))
            .collect::<Option<BTreeSet<String>>>()?;

        let health = obj.get("health")?.as_str()?.parse::<CapabilityHealth>().ok()?;

        let definition = Self {
            id,
            version: version.to_string(),
            enabled,
            degraded,
            base_url,
            scopes,
            health,
        };
        definition.satisfies_invariants().then_some(definition)
    }

    pub fn satisfies_invariants(&self) -> bool {
        let url_ok = self.enabled || self.base_url.is_none();
        let health_ok = self.health != CapabilityHealth::Error || self.degraded;
        url_ok && health_ok
    }

    fn normalize(mut self) -> Self {
        if !self.enabled {
            self.base_url = None;
        }
        if self.base_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            self.base_url = None;
        }
        if self.health == CapabilityHealth::Error {
            self.degraded = true;
        }
        self
    }
}

/// Caller-supplied fields applied on top of the safe defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityOverrides {
    pub version: Option<String>,
    pub enabled: Option<bool>,
    pub degraded: Option<bool>,
    pub base_url: Option<Option<String>>,
    pub scopes: Option<BTreeSet<String>>,
    pub health: Option<CapabilityHealth>,
}

impl CapabilityOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn degraded(mut self, degraded: bool) -> Self {
        self.degraded = Some(degraded);
        self
    }

    pub fn base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn health(mut self, health: CapabilityHealth) -> Self {
        self.health = Some(health);
        self
    }
}

/// Build a definition from safe defaults plus overrides.
///
/// Defaults: disabled, not degraded, no base URL, scopes `{"read"}`, health
/// `Unknown`. The result is normalized so the module invariants hold even
/// when the overrides contradict them.
pub fn create_capability_definition(
    id: CapabilityId,
    overrides: CapabilityOverrides,
) -> CapabilityDefinition {
    CapabilityDefinition {
        id,
        version: overrides
            .version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CAPABILITY_VERSION.to_string()),
        enabled: overrides.enabled.unwrap_or(false),
        degraded: overrides.degraded.unwrap_or(false),
        base_url: overrides.base_url.unwrap_or(None),
        scopes: overrides
            .scopes
            .unwrap_or_else(|| BTreeSet::from([DEFAULT_SCOPE.to_string()])),
        health: overrides.health.unwrap_or(CapabilityHealth::Unknown),
    }
    .normalize()
}

/// Structural validation of an untyped capability definition.
///
/// Never panics; invalid input simply returns `false`.
pub fn validate_capability(candidate: &Value) -> bool {
    CapabilityDefinition::from_candidate(candidate).is_some()
}
