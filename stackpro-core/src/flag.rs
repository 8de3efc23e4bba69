//! Feature flag types: keys, values, context and the compiled-in defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::resolution::ResolutionResult;
use crate::{CapabilityHealth, TenantId, Timestamp};

/// Maximum accepted length of a flag key.
pub const MAX_FLAG_KEY_LEN: usize = 128;

// ============================================================================
// FLAG KEY
// ============================================================================

/// Key of a feature flag, e.g. `messaging_enabled`.
///
/// Non-empty, at most 128 characters, no whitespace and no `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlagKey(String);

impl FlagKey {
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let reason = if raw.is_empty() {
            Some("must not be empty")
        } else if raw.len() > MAX_FLAG_KEY_LEN {
            Some("too long")
        } else if raw.contains(':') {
            Some("must not contain ':'")
        } else if raw.chars().any(char::is_whitespace) {
            Some("must not contain whitespace")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ValidationError::InvalidFlagKey {
                value: raw,
                reason: reason.to_string(),
            }),
            None => Ok(Self(raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FlagKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FlagKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FlagKey> for String {
    fn from(key: FlagKey) -> Self {
        key.0
    }
}

// ============================================================================
// FLAG VALUE
// ============================================================================

/// Value of a flag: a boolean or a string variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
}

impl FlagValue {
    /// Coerce a raw override value.
    ///
    /// Exactly `"true"` and `"false"` become booleans; every other string is
    /// kept verbatim as a variant.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "true" => FlagValue::Bool(true),
            "false" => FlagValue::Bool(false),
            other => FlagValue::Text(other.to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            FlagValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FlagValue::Bool(_) => None,
            FlagValue::Text(s) => Some(s),
        }
    }

    /// True only for `Bool(true)`.
    pub fn is_enabled(&self) -> bool {
        matches!(self, FlagValue::Bool(true))
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::Text(s) => f.write_str(s),
        }
    }
}

/// Result of resolving one flag.
pub type FlagResult = ResolutionResult<FlagValue>;

// ============================================================================
// FLAG CONTEXT
// ============================================================================

/// Scoping context of a flag lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    /// Carried for logging only; does not affect precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl FlagContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            client_id: None,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

// ============================================================================
// DEFAULTS
// ============================================================================

/// Compiled-in flag defaults, the last tier of flag resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDefaults {
    table: BTreeMap<FlagKey, FlagValue>,
}

impl FlagDefaults {
    /// Value for flags missing from the table.
    pub const UNKNOWN: FlagValue = FlagValue::Bool(false);

    /// An empty table: every flag defaults to `false`.
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// The built-in table of known flags.
    pub fn builtin() -> Self {
        let known = [
            ("messaging_enabled", false),
            ("datalake_enabled", false),
            ("jwt_auth_allowed", true),
            ("maintenance_mode", false),
        ];
        let table = known
            .into_iter()
            .filter_map(|(key, value)| FlagKey::new(key).ok().map(|k| (k, FlagValue::Bool(value))))
            .collect();
        Self { table }
    }

    pub fn with_default(mut self, key: FlagKey, value: FlagValue) -> Self {
        self.table.insert(key, value);
        self
    }

    /// Default for a flag, `false` when unknown.
    pub fn get(&self, key: &FlagKey) -> FlagValue {
        self.table.get(key).cloned().unwrap_or(Self::UNKNOWN)
    }

    pub fn is_known(&self, key: &FlagKey) -> bool {
        self.table.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FlagKey> {
        self.table.keys()
    }
}

impl Default for FlagDefaults {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// FLAG HEALTH
// ============================================================================

/// Reachability report for the override backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagHealth {
    pub healthy: bool,
    pub status: CapabilityHealth,
    /// Name of the backing store that was probed.
    pub backing_store: String,
    /// True when the report comes from a placeholder probe and carries no signal.
    pub stub: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: Timestamp,
}
