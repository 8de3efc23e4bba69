//! Resolution requests, results and provenance.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flag::{FlagContext, FlagKey, FlagValue};
use crate::key::ResolutionKey;
use crate::{CapabilityId, Environment, TenantId};

// ============================================================================
// ENUMS
// ============================================================================

/// Resolution domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionKind {
    Capability,
    Flag,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::Capability => "capability",
            ResolutionKind::Flag => "flag",
        }
    }
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier that satisfied a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Cache,
    Tenant,
    Global,
    Remote,
    Default,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Cache => "cache",
            ResolutionSource::Tenant => "tenant",
            ResolutionSource::Global => "global",
            ResolutionSource::Remote => "remote",
            ResolutionSource::Default => "default",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// One value to resolve, with its scoping context.
///
/// Capability requests always carry an environment; flag requests carry an
/// optional tenant and client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionRequest {
    Capability {
        capability: CapabilityId,
        environment: Environment,
    },
    Flag {
        flag: FlagKey,
        context: FlagContext,
    },
}

impl ResolutionRequest {
    pub fn capability(capability: CapabilityId, environment: Environment) -> Self {
        ResolutionRequest::Capability {
            capability,
            environment,
        }
    }

    pub fn flag(flag: FlagKey, context: FlagContext) -> Self {
        ResolutionRequest::Flag { flag, context }
    }

    pub fn kind(&self) -> ResolutionKind {
        match self {
            ResolutionRequest::Capability { .. } => ResolutionKind::Capability,
            ResolutionRequest::Flag { .. } => ResolutionKind::Flag,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            ResolutionRequest::Capability { capability, .. } => capability.as_str(),
            ResolutionRequest::Flag { flag, .. } => flag.as_str(),
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        match self {
            ResolutionRequest::Capability { .. } => None,
            ResolutionRequest::Flag { context, .. } => context.tenant_id.as_ref(),
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        match self {
            ResolutionRequest::Capability { .. } => None,
            ResolutionRequest::Flag { context, .. } => context.client_id.as_deref(),
        }
    }

    pub fn environment(&self) -> Option<Environment> {
        match self {
            ResolutionRequest::Capability { environment, .. } => Some(*environment),
            ResolutionRequest::Flag { .. } => None,
        }
    }

    /// Cache key for this request.
    pub fn cache_key(&self) -> ResolutionKey {
        match self {
            ResolutionRequest::Capability {
                capability,
                environment,
            } => ResolutionKey::capability(capability, *environment),
            ResolutionRequest::Flag { flag, context } => {
                ResolutionKey::flag(flag, context.tenant_id.as_ref())
            }
        }
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// A resolved value annotated with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult<V> {
    pub value: V,
    pub source: ResolutionSource,
    /// True when a source failed during the walk that produced this value.
    pub degraded: bool,
}

impl<V> ResolutionResult<V> {
    pub fn new(value: V, source: ResolutionSource, degraded: bool) -> Self {
        Self {
            value,
            source,
            degraded,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> ResolutionResult<U> {
        ResolutionResult {
            value: f(self.value),
            source: self.source,
            degraded: self.degraded,
        }
    }
}

/// Payload stored in the shared resolution cache.
///
/// One cache instance serves both resolution kinds, so the payload is a
/// closed union of what each resolver produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ResolvedValue {
    Url(String),
    Flag(FlagValue),
}

/// Conversion between a resolver's value type and the cache payload.
pub trait CachePayload: Clone + Send + Sync + 'static {
    fn into_resolved(self) -> ResolvedValue;

    /// `None` when the payload belongs to the other resolution kind.
    fn from_resolved(value: ResolvedValue) -> Option<Self>;
}

impl CachePayload for String {
    fn into_resolved(self) -> ResolvedValue {
        ResolvedValue::Url(self)
    }

    fn from_resolved(value: ResolvedValue) -> Option<Self> {
        match value {
            ResolvedValue::Url(url) => Some(url),
            ResolvedValue::Flag(_) => None,
        }
    }
}

impl CachePayload for FlagValue {
    fn into_resolved(self) -> ResolvedValue {
        ResolvedValue::Flag(self)
    }

    fn from_resolved(value: ResolvedValue) -> Option<Self> {
        match value {
            ResolvedValue::Flag(flag) => Some(flag),
            ResolvedValue::Url(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accessors_capability() {
        let req = ResolutionRequest::capability(
            CapabilityId::new("messaging").unwrap(),
            Environment::Sandbox,
        );
        assert_eq!(req.kind(), ResolutionKind::Capability);
        assert_eq!(req.subject(), "messaging");
        assert_eq!(req.environment(), Some(Environment::Sandbox));
        assert!(req.tenant_id().is_none());
        assert_eq!(req.cache_key().encode(), "capability:messaging:sandbox");
    }

    #[test]
    fn test_request_accessors_flag() {
        let ctx = FlagContext::for_tenant(TenantId::new("acme").unwrap()).with_client("web");
        let req = ResolutionRequest::flag(FlagKey::new("beta").unwrap(), ctx);
        assert_eq!(req.kind(), ResolutionKind::Flag);
        assert_eq!(req.tenant_id().map(|t| t.as_str()), Some("acme"));
        assert_eq!(req.client_id(), Some("web"));
        assert!(req.environment().is_none());
        assert_eq!(req.cache_key().encode(), "flag:beta:tenant:acme");
    }

    #[test]
    fn test_result_serialization() {
        let result = ResolutionResult::new(
            "https://msg.example.com".to_string(),
            ResolutionSource::Global,
            false,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "global");
        assert_eq!(json["degraded"], false);
        assert_eq!(json["value"], "https://msg.example.com");
    }

    #[test]
    fn test_payload_kinds_do_not_cross() {
        let url = "https://x".to_string().into_resolved();
        assert!(FlagValue::from_resolved(url.clone()).is_none());
        assert_eq!(String::from_resolved(url), Some("https://x".to_string()));

        let flag = FlagValue::Bool(true).into_resolved();
        assert!(String::from_resolved(flag.clone()).is_none());
        assert_eq!(FlagValue::from_resolved(flag), Some(FlagValue::Bool(true)));
    }
}
