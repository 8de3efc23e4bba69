//! REST routes.
//!
//! - `/health/*` liveness and readiness
//! - `/v1/capabilities/*` capability URL resolution and discovery
//! - `/v1/flags/*` tenant flag resolution
//! - `/admin/cache/*` cache inspection and invalidation

pub mod admin;
pub mod capability;
pub mod flag;
pub mod health;

use stackpro_core::{CapabilityId, Environment, FlagContext, FlagKey, TenantId};

use crate::error::{ApiError, ApiResult};

pub(crate) fn parse_capability(raw: &str) -> ApiResult<CapabilityId> {
    Ok(CapabilityId::new(raw)?)
}

pub(crate) fn parse_flag(raw: &str) -> ApiResult<FlagKey> {
    Ok(FlagKey::new(raw)?)
}

/// The environment query parameter is mandatory; there is no implicit default.
pub(crate) fn parse_environment(raw: Option<&str>) -> ApiResult<Environment> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => Ok(value.parse::<Environment>()?),
        None => Err(ApiError::missing_field("environment")),
    }
}

/// Build a flag context from optional query parameters. Blank values are
/// treated as absent.
pub(crate) fn parse_context(
    tenant_id: Option<&str>,
    client_id: Option<&str>,
) -> ApiResult<FlagContext> {
    let mut context = match tenant_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => FlagContext::for_tenant(TenantId::new(raw)?),
        None => FlagContext::new(),
    };
    if let Some(client) = client_id.map(str::trim).filter(|s| !s.is_empty()) {
        context = context.with_client(client);
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_missing_environment() {
        assert_eq!(parse_environment(None).unwrap_err().code, ErrorCode::MissingField);
        assert_eq!(
            parse_environment(Some("  ")).unwrap_err().code,
            ErrorCode::MissingField
        );
    }

    #[test]
    fn test_environment_aliases() {
        assert_eq!(parse_environment(Some("prod")).unwrap(), Environment::Production);
        assert_eq!(
            parse_environment(Some("staging")).unwrap_err().code,
            ErrorCode::InvalidInput
        );
    }

    #[test]
    fn test_blank_tenant_is_absent() {
        let ctx = parse_context(Some(""), Some("web")).unwrap();
        assert_eq!(ctx.tenant_id, None);
        assert_eq!(ctx.client_id.as_deref(), Some("web"));
    }

    #[test]
    fn test_invalid_tenant() {
        let err = parse_context(Some("a:b"), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }
}
