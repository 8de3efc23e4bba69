//! Remote hierarchical parameter store.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use stackpro_core::{ParameterPath, SourceError};

/// Read access to a remote parameter store.
///
/// `Ok(None)` means the store answered and has no value at the path. Every
/// other failure to answer is an `Err`.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    fn name(&self) -> &str;

    /// `false` for stores that never produce values, so callers can skip
    /// them without recording health.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn get_parameter(&self, path: &ParameterPath) -> Result<Option<String>, SourceError>;
}

/// Store used when no remote endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledParameterStore;

#[async_trait]
impl ParameterStore for DisabledParameterStore {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn get_parameter(&self, _path: &ParameterPath) -> Result<Option<String>, SourceError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct ParameterEnvelope {
    #[serde(rename = "Parameter")]
    parameter: ParameterBody,
}

#[derive(Debug, Deserialize)]
struct ParameterBody {
    #[serde(rename = "Value")]
    value: String,
}

/// HTTP client for a parameter store exposing
/// `GET {endpoint}{path}?withDecryption=false`.
///
/// The HTTP client is built on first use and reused for every lookup.
pub struct HttpParameterStore {
    endpoint: String,
    timeout: Duration,
    client: OnceCell<Client>,
}

impl HttpParameterStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            endpoint,
            timeout,
            client: OnceCell::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> Result<&Client, SourceError> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| self.unreachable(format!("Failed to build HTTP client: {}", e)))
        })
    }

    fn unreachable(&self, reason: impl Into<String>) -> SourceError {
        SourceError::Unreachable {
            source_name: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ParameterStore for HttpParameterStore {
    fn name(&self) -> &str {
        "parameter-store"
    }

    async fn get_parameter(&self, path: &ParameterPath) -> Result<Option<String>, SourceError> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .client()?
            .get(&url)
            .query(&[("withDecryption", "false")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout {
                        source_name: self.name().to_string(),
                        after: self.timeout,
                    }
                } else {
                    self.unreachable(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::PermissionDenied {
                    source_name: self.name().to_string(),
                    reason: format!("HTTP {}", status.as_u16()),
                });
            }
            _ if !status.is_success() => {
                return Err(self.unreachable(format!("HTTP {}", status.as_u16())));
            }
            _ => {}
        }

        let envelope: ParameterEnvelope =
            response.json().await.map_err(|e| SourceError::Malformed {
                source_name: self.name().to_string(),
                reason: format!("Failed to parse response: {}", e),
            })?;

        Ok(Some(envelope.parameter.value))
    }
}

impl std::fmt::Debug for HttpParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpParameterStore")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("client_ready", &self.client.get().is_some())
            .finish()
    }
}
