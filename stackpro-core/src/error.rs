//! Error types for STACKPRO resolution

use std::time::Duration;
use thiserror::Error;

/// Failure of a single source tier during a chain walk.
///
/// Never surfaced to resolver callers: the chain treats it as "absent" and
/// flags the final result as degraded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name} unreachable: {reason}")]
    Unreachable { source_name: String, reason: String },

    #[error("{source_name} timed out after {after:?}")]
    Timeout { source_name: String, after: Duration },

    #[error("{source_name} denied access: {reason}")]
    PermissionDenied { source_name: String, reason: String },

    #[error("{source_name} returned a malformed response: {reason}")]
    Malformed { source_name: String, reason: String },
}

impl SourceError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Unreachable { .. } => "unreachable",
            SourceError::Timeout { .. } => "timeout",
            SourceError::PermissionDenied { .. } => "permission_denied",
            SourceError::Malformed { .. } => "malformed",
        }
    }
}

/// Input validation errors raised at the edges (parsing ids, environments).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid capability id: {value:?}")]
    InvalidCapabilityId { value: String },

    #[error("Invalid tenant id {value:?}: {reason}")]
    InvalidTenantId { value: String, reason: String },

    #[error("Invalid environment {value:?}: expected sandbox or production")]
    InvalidEnvironment { value: String },

    #[error("Invalid flag key {value:?}: {reason}")]
    InvalidFlagKey { value: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Master error type for all STACKPRO errors.
#[derive(Debug, Clone, Error)]
pub enum StackproError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for STACKPRO operations.
pub type StackproResult<T> = Result<T, StackproError>;

// =============================================================================
// TESTS
// =============================================================================
