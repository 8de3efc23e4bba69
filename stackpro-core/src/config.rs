//! Resolver Configuration
//!
//! Configuration is loaded from environment variables with defaults that
//! work for local development. Every value is validated before use.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::CapabilityId;

/// Product segment of remote parameter paths.
pub const DEFAULT_PRODUCT: &str = "stackpro";

/// Lifetime of a cache entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(60_000);

/// Upper bound on a single remote parameter lookup.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_millis(1_500);

/// Capability URL served when no tier produced one.
pub const DEFAULT_FALLBACK_URL: &str = "/api";

/// Consecutive remote failures after which health reports `error`.
pub const DEFAULT_DEGRADED_THRESHOLD: u32 = 3;

// ============================================================================
// RESOLVER CONFIGURATION
// ============================================================================

/// Configuration of the resolution core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// First segment of remote parameter paths.
    pub product: String,

    /// Lifetime of cached resolutions (fixed expiration, not refreshed on hit).
    pub cache_ttl: Duration,

    /// Timeout applied to each remote lookup.
    pub remote_timeout: Duration,

    /// Base URL of the remote parameter store. `None` disables the remote tier.
    pub parameter_store_url: Option<String>,

    /// Final capability fallback.
    pub capability_fallback_url: String,

    /// Optional TOML file of overrides consulted before the process environment.
    pub overrides_file: Option<PathBuf>,

    /// Consecutive failures before remote health escalates to `error`.
    pub degraded_threshold: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            parameter_store_url: None,
            capability_fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            overrides_file: None,
            degraded_threshold: DEFAULT_DEGRADED_THRESHOLD,
        }
    }
}

impl ResolverConfig {
    /// Create ResolverConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STACKPRO_PRODUCT`: parameter path product segment (default: stackpro)
    /// - `STACKPRO_CACHE_TTL_MS`: cache entry lifetime (default: 60000)
    /// - `STACKPRO_REMOTE_TIMEOUT_MS`: remote lookup timeout (default: 1500)
    /// - `STACKPRO_PARAMETER_STORE_URL`: remote store base URL (default: disabled)
    /// - `STACKPRO_CAPABILITY_FALLBACK_URL`: final capability fallback (default: /api)
    /// - `STACKPRO_OVERRIDES_FILE`: TOML overrides file (default: none)
    /// - `STACKPRO_DEGRADED_THRESHOLD`: failures before `error` health (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let product = non_blank("STACKPRO_PRODUCT").unwrap_or(defaults.product);

        let cache_ttl = match non_blank("STACKPRO_CACHE_TTL_MS") {
            Some(raw) => Duration::from_millis(parse_positive("STACKPRO_CACHE_TTL_MS", &raw)?),
            None => defaults.cache_ttl,
        };

        let remote_timeout = match non_blank("STACKPRO_REMOTE_TIMEOUT_MS") {
            Some(raw) => {
                Duration::from_millis(parse_positive("STACKPRO_REMOTE_TIMEOUT_MS", &raw)?)
            }
            None => defaults.remote_timeout,
        };

        let parameter_store_url = non_blank("STACKPRO_PARAMETER_STORE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string());

        let capability_fallback_url = non_blank("STACKPRO_CAPABILITY_FALLBACK_URL")
            .map(|url| url.trim().to_string())
            .unwrap_or(defaults.capability_fallback_url);

        let overrides_file = non_blank("STACKPRO_OVERRIDES_FILE").map(PathBuf::from);

        let degraded_threshold = match non_blank("STACKPRO_DEGRADED_THRESHOLD") {
            Some(raw) => {
                let value = parse_positive("STACKPRO_DEGRADED_THRESHOLD", &raw)?;
                u32::try_from(value).map_err(|_| ConfigError::InvalidValue {
                    field: "STACKPRO_DEGRADED_THRESHOLD".to_string(),
                    value: raw.clone(),
                    reason: "out of range".to_string(),
                })?
            }
            None => defaults.degraded_threshold,
        };

        let config = Self {
            product,
            cache_ttl,
            remote_timeout,
            parameter_store_url,
            capability_fallback_url,
            overrides_file,
            degraded_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that environment parsing alone cannot guarantee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !CapabilityId::is_valid(&self.product) {
            return Err(ConfigError::InvalidValue {
                field: "product".to_string(),
                value: self.product.clone(),
                reason: "must be a lowercase path segment".to_string(),
            });
        }
        if self.cache_ttl.is_zero() {
            return Err(invalid("cache_ttl", "0", "must be greater than zero"));
        }
        if self.remote_timeout.is_zero() {
            return Err(invalid("remote_timeout", "0", "must be greater than zero"));
        }
        if self.capability_fallback_url.trim().is_empty() {
            return Err(invalid(
                "capability_fallback_url",
                &self.capability_fallback_url,
                "must not be empty",
            ));
        }
        if let Some(url) = &self.parameter_store_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(
                    "parameter_store_url",
                    url,
                    "must start with http:// or https://",
                ));
            }
        }
        if self.degraded_threshold == 0 {
            return Err(invalid("degraded_threshold", "0", "must be greater than zero"));
        }
        Ok(())
    }

    /// Replace every invalid field with its default. Returns the names of
    /// the replaced fields; a config that passes [`ResolverConfig::validate`]
    /// comes back unchanged with an empty list.
    pub fn repaired(mut self) -> (Self, Vec<&'static str>) {
        let mut replaced = Vec::new();
        if !CapabilityId::is_valid(&self.product) {
            self.product = DEFAULT_PRODUCT.to_string();
            replaced.push("product");
        }
        if self.cache_ttl.is_zero() {
            self.cache_ttl = DEFAULT_CACHE_TTL;
            replaced.push("cache_ttl");
        }
        if self.remote_timeout.is_zero() {
            self.remote_timeout = DEFAULT_REMOTE_TIMEOUT;
            replaced.push("remote_timeout");
        }
        if self.capability_fallback_url.trim().is_empty() {
            self.capability_fallback_url = DEFAULT_FALLBACK_URL.to_string();
            replaced.push("capability_fallback_url");
        }
        if let Some(url) = &self.parameter_store_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                self.parameter_store_url = None;
                replaced.push("parameter_store_url");
            }
        }
        if self.degraded_threshold == 0 {
            self.degraded_threshold = DEFAULT_DEGRADED_THRESHOLD;
            replaced.push("degraded_threshold");
        }
        (self, replaced)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_parameter_store_url(mut self, url: impl Into<String>) -> Self {
        self.parameter_store_url = Some(url.into());
        self
    }
}

fn parse_positive(field: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid(field, raw, "must be greater than zero")),
        Ok(value) => Ok(value),
        Err(e) => Err(invalid(field, raw, &e.to_string())),
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.product, "stackpro");
        assert_eq!(config.cache_ttl, Duration::from_millis(60_000));
        assert_eq!(config.remote_timeout, Duration::from_millis(1_500));
        assert!(config.parameter_store_url.is_none());
        assert_eq!(config.capability_fallback_url, "/api");
        assert_eq!(config.degraded_threshold, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = ResolverConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResolverConfig::default());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = ResolverConfig::from_lookup(lookup(&[
            ("STACKPRO_PRODUCT", "acme"),
            ("STACKPRO_CACHE_TTL_MS", "5000"),
            ("STACKPRO_REMOTE_TIMEOUT_MS", "250"),
            ("STACKPRO_PARAMETER_STORE_URL", "https://params.internal/"),
            ("STACKPRO_CAPABILITY_FALLBACK_URL", "/fallback"),
            ("STACKPRO_OVERRIDES_FILE", "/etc/stackpro/overrides.toml"),
            ("STACKPRO_DEGRADED_THRESHOLD", "5"),
        ]))
        .unwrap();
        assert_eq!(config.product, "acme");
        assert_eq!(config.cache_ttl, Duration::from_millis(5000));
        assert_eq!(config.remote_timeout, Duration::from_millis(250));
        assert_eq!(
            config.parameter_store_url.as_deref(),
            Some("https://params.internal")
        );
        assert_eq!(config.capability_fallback_url, "/fallback");
        assert_eq!(
            config.overrides_file,
            Some(PathBuf::from("/etc/stackpro/overrides.toml"))
        );
        assert_eq!(config.degraded_threshold, 5);
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let err = ResolverConfig::from_lookup(lookup(&[("STACKPRO_CACHE_TTL_MS", "0")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_rejects_non_numeric_timeout() {
        let err = ResolverConfig::from_lookup(lookup(&[("STACKPRO_REMOTE_TIMEOUT_MS", "soon")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_bad_store_url() {
        let err =
            ResolverConfig::from_lookup(lookup(&[("STACKPRO_PARAMETER_STORE_URL", "ftp://x")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_bad_product() {
        let err = ResolverConfig::from_lookup(lookup(&[("STACKPRO_PRODUCT", "Stack Pro")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ResolverConfig::from_lookup(lookup(&[
            ("STACKPRO_CAPABILITY_FALLBACK_URL", "   "),
            ("STACKPRO_PARAMETER_STORE_URL", ""),
        ]))
        .unwrap();
        assert_eq!(config.capability_fallback_url, "/api");
        assert!(config.parameter_store_url.is_none());
    }

    #[test]
    fn test_repaired_replaces_only_invalid_fields() {
        let config = ResolverConfig {
            capability_fallback_url: "  ".to_string(),
            degraded_threshold: 0,
            ..ResolverConfig::default().with_cache_ttl(Duration::from_secs(5))
        };
        let (repaired, replaced) = config.repaired();

        assert_eq!(replaced, vec!["capability_fallback_url", "degraded_threshold"]);
        assert_eq!(repaired.capability_fallback_url, "/api");
        assert_eq!(repaired.degraded_threshold, 3);
        assert_eq!(repaired.cache_ttl, Duration::from_secs(5));
        assert!(repaired.validate().is_ok());
    }

    #[test]
    fn test_repaired_keeps_valid_config() {
        let config = ResolverConfig::default().with_parameter_store_url("https://params.internal");
        let (repaired, replaced) = config.clone().repaired();
        assert!(replaced.is_empty());
        assert_eq!(repaired, config);
    }
}
