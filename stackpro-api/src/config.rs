//! Server Configuration
//!
//! Listener settings for the HTTP surface. Resolver settings live in
//! [`stackpro_core::ResolverConfig`].

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Upper bound on the time spent serving a single request.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create ServerConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STACKPRO_API_BIND`: listen host (default: 0.0.0.0)
    /// - `PORT` or `STACKPRO_API_PORT`: listen port (default: 3000)
    /// - `STACKPRO_API_REQUEST_TIMEOUT_MS`: per-request timeout (default: 10000)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("STACKPRO_API_BIND").unwrap_or_else(|| "0.0.0.0".to_string());
        let port_str = lookup("PORT")
            .or_else(|| lookup("STACKPRO_API_PORT"))
            .unwrap_or_else(|| "3000".to_string());
        let port = port_str
            .trim()
            .parse::<u16>()
            .map_err(|_| ApiError::config_error(format!("Invalid port value: {}", port_str)))?;

        let addr = format!("{}:{}", host.trim(), port);
        let bind_addr = addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::config_error(format!("Invalid bind address {}: {}", addr, e))
        })?;

        let request_timeout = match lookup("STACKPRO_API_REQUEST_TIMEOUT_MS") {
            Some(raw) => {
                let ms = raw.trim().parse::<u64>().ok().filter(|ms| *ms > 0).ok_or_else(|| {
                    ApiError::config_error(format!("Invalid request timeout: {}", raw))
                })?;
                Duration::from_millis(ms)
            }
            None => defaults.request_timeout,
        };

        Ok(Self {
            bind_addr,
            request_timeout,
        })
    }
}
