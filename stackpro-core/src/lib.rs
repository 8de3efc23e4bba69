//! STACKPRO Core - Resolution Types
//!
//! Pure data structures shared by the cache, the resolvers and the API layer.
//! This crate performs no I/O: every other crate depends on it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod capability;
pub mod clock;
pub mod config;
pub mod error;
pub mod flag;
pub mod key;
pub mod resolution;

pub use capability::{
    create_capability_definition, validate_capability, CapabilityDefinition, CapabilityHealth,
    CapabilityOverrides, DEFAULT_CAPABILITY_VERSION,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ResolverConfig, DEFAULT_CACHE_TTL, DEFAULT_DEGRADED_THRESHOLD, DEFAULT_FALLBACK_URL,
    DEFAULT_PRODUCT, DEFAULT_REMOTE_TIMEOUT,
};
pub use error::{ConfigError, SourceError, StackproError, StackproResult, ValidationError};
pub use flag::{FlagContext, FlagDefaults, FlagHealth, FlagKey, FlagResult, FlagValue};
pub use key::{OverrideKey, ParameterPath, ResolutionKey};
pub use resolution::{
    CachePayload, ResolutionKind, ResolutionRequest, ResolutionResult, ResolutionSource,
    ResolvedValue,
};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

const CAPABILITY_ID_PATTERN: &str = r"^[a-z][a-z0-9_-]{0,63}$";

static CAPABILITY_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(CAPABILITY_ID_PATTERN).expect("Invalid capability id regex"));

/// Maximum accepted length of a tenant identifier.
pub const MAX_TENANT_ID_LEN: usize = 128;

/// Identifier of a capability such as `messaging` or `datalake`.
///
/// Lowercase, starts with a letter, at most 64 characters of `[a-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityId(String);

impl CapabilityId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if Self::is_valid(&raw) {
            Ok(Self(raw))
        } else {
            Err(ValidationError::InvalidCapabilityId { value: raw })
        }
    }

    /// Check a raw string against the capability id pattern.
    pub fn is_valid(raw: &str) -> bool {
        CAPABILITY_ID_RE.is_match(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name fragment used in override variable names (`CAP_<THIS>_BASE_URL`).
    pub fn env_fragment(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CapabilityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CapabilityId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CapabilityId> for String {
    fn from(id: CapabilityId) -> Self {
        id.0
    }
}

/// Identifier of a tenant. Opaque, but never empty and never contains `:`
/// so that it cannot collide with the key separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidTenantId {
                value: raw,
                reason: "must not be empty".to_string(),
            });
        }
        if trimmed.len() > MAX_TENANT_ID_LEN {
            return Err(ValidationError::InvalidTenantId {
                value: raw,
                reason: format!("must be at most {} characters", MAX_TENANT_ID_LEN),
            });
        }
        if trimmed.contains(':') {
            return Err(ValidationError::InvalidTenantId {
                value: raw,
                reason: "must not contain ':'".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

// ============================================================================
// ENUMS
// ============================================================================

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "dev" | "development" => Ok(Environment::Sandbox),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ValidationError::InvalidEnvironment {
                value: s.to_string(),
            }),
        }
    }
}
