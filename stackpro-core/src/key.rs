//! Typed key construction for the cache, override sources and the remote store.
//!
//! Every namespace that used to be assembled by string concatenation has a
//! type here. A [`ResolutionKey`] can only be built through its constructors,
//! so a capability key can never collide with a flag key and a tenant-scoped
//! flag key can never be built without its tenant.

use std::fmt;

use crate::flag::FlagKey;
use crate::resolution::{ResolutionKind, ResolutionSource};
use crate::{CapabilityId, Environment, TenantId};

/// Separator between key segments.
const SEPARATOR: char = ':';

// ============================================================================
// RESOLUTION KEY (cache)
// ============================================================================

/// Key of one cached resolution.
///
/// # Encoded form
///
/// - `capability:<capability>:<environment>`
/// - `flag:<flag>`
/// - `flag:<flag>:tenant:<tenant>`
///
/// Capability ids, flag keys and tenant ids all reject `:`, so the encoding
/// is unambiguous and [`ResolutionKey::decode`] is its exact inverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolutionKey {
    /// Private inner data - cannot be constructed externally
    inner: KeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum KeyInner {
    Capability {
        capability: CapabilityId,
        environment: Environment,
    },
    Flag {
        flag: FlagKey,
        tenant: Option<TenantId>,
    },
}

impl ResolutionKey {
    /// Key for a capability base URL in one environment.
    pub fn capability(capability: &CapabilityId, environment: Environment) -> Self {
        Self {
            inner: KeyInner::Capability {
                capability: capability.clone(),
                environment,
            },
        }
    }

    /// Key for a flag, optionally scoped to a tenant.
    pub fn flag(flag: &FlagKey, tenant: Option<&TenantId>) -> Self {
        Self {
            inner: KeyInner::Flag {
                flag: flag.clone(),
                tenant: tenant.cloned(),
            },
        }
    }

    pub fn kind(&self) -> ResolutionKind {
        match self.inner {
            KeyInner::Capability { .. } => ResolutionKind::Capability,
            KeyInner::Flag { .. } => ResolutionKind::Flag,
        }
    }

    /// The capability id or flag key this key resolves.
    pub fn subject(&self) -> &str {
        match &self.inner {
            KeyInner::Capability { capability, .. } => capability.as_str(),
            KeyInner::Flag { flag, .. } => flag.as_str(),
        }
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        match &self.inner {
            KeyInner::Capability { .. } => None,
            KeyInner::Flag { tenant, .. } => tenant.as_ref(),
        }
    }

    pub fn environment(&self) -> Option<Environment> {
        match &self.inner {
            KeyInner::Capability { environment, .. } => Some(*environment),
            KeyInner::Flag { .. } => None,
        }
    }

    /// Encode this key to its string form.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode a key from its string form.
    ///
    /// Returns `None` if the kind prefix is unknown, a segment is missing or
    /// malformed, or there are trailing segments.
    pub fn decode(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(SEPARATOR).collect();
        match parts.as_slice() {
            ["capability", capability, environment] => {
                let capability = CapabilityId::new(*capability).ok()?;
                let environment = environment.parse().ok()?;
                Some(Self::capability(&capability, environment))
            }
            ["flag", flag] => {
                let flag = FlagKey::new(*flag).ok()?;
                Some(Self::flag(&flag, None))
            }
            ["flag", flag, "tenant", tenant] => {
                let flag = FlagKey::new(*flag).ok()?;
                let tenant = TenantId::new(*tenant).ok()?;
                Some(Self::flag(&flag, Some(&tenant)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            KeyInner::Capability {
                capability,
                environment,
            } => write!(f, "capability:{}:{}", capability, environment),
            KeyInner::Flag { flag, tenant: None } => write!(f, "flag:{}", flag),
            KeyInner::Flag {
                flag,
                tenant: Some(tenant),
            } => write!(f, "flag:{}:tenant:{}", flag, tenant),
        }
    }
}

// ============================================================================
// OVERRIDE KEY (environment / file overrides)
// ============================================================================

/// Name of an override lookup in a flat override mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverrideKey {
    /// `CAP_<CAPABILITY_UPPER>_BASE_URL`
    CapabilityBaseUrl(CapabilityId),
    /// Bare flag key.
    GlobalFlag(FlagKey),
    /// `<flag>:tenant:<tenant>`
    TenantFlag(FlagKey, TenantId),
}

impl OverrideKey {
    /// The variable name looked up in the override mapping.
    pub fn name(&self) -> String {
        match self {
            OverrideKey::CapabilityBaseUrl(capability) => {
                format!("CAP_{}_BASE_URL", capability.env_fragment())
            }
            OverrideKey::GlobalFlag(flag) => flag.as_str().to_string(),
            OverrideKey::TenantFlag(flag, tenant) => format!("{}:tenant:{}", flag, tenant),
        }
    }

    /// The tier a value found under this key is attributed to.
    pub fn tier(&self) -> ResolutionSource {
        match self {
            OverrideKey::TenantFlag(..) => ResolutionSource::Tenant,
            OverrideKey::CapabilityBaseUrl(_) | OverrideKey::GlobalFlag(_) => {
                ResolutionSource::Global
            }
        }
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ============================================================================
// PARAMETER PATH (remote store)
// ============================================================================

/// Hierarchical path of a value in the remote parameter store.
///
/// Format: `/{product}/{environment}/capabilities/{capability}/base-url`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterPath {
    product: String,
    environment: Environment,
    capability: CapabilityId,
}

impl ParameterPath {
    pub fn capability_base_url(
        product: impl Into<String>,
        environment: Environment,
        capability: &CapabilityId,
    ) -> Self {
        Self {
            product: product.into(),
            environment,
            capability: capability.clone(),
        }
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn capability(&self) -> &CapabilityId {
        &self.capability
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}/capabilities/{}/base-url",
            self.product, self.environment, self.capability
        )
    }
}
