//! Driver contracts and the internal error-mapping seam.

mod compute;
mod dns;
mod loadbalancer;

pub use compute::ComputeDriver;
pub use dns::DnsDriver;
pub use loadbalancer::LoadBalancerDriver;

use crate::error::{DriverError, ResourceKind};

/// Raw API error as reported by a provider (internal use).
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// Provider error code, format differs per provider.
    pub code: Option<String>,
    /// Original error message.
    pub message: String,
}

impl RawApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// What the failing request was about, so mapped errors can name it (internal use).
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    pub resource: Option<ResourceKind>,
    /// Identifier used for `NotFound`.
    pub id: Option<String>,
    /// Name used for `AlreadyExists`.
    pub name: Option<String>,
}

impl ErrorContext {
    pub fn resource(resource: ResourceKind) -> Self {
        Self {
            resource: Some(resource),
            ..Self::default()
        }
    }

    pub fn with_id(resource: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            resource: Some(resource),
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn with_name(resource: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            resource: Some(resource),
            id: None,
            name: Some(name.into()),
        }
    }
}

/// Translates raw provider errors into [`DriverError`] (internal use).
///
/// Each driver connection implements `map_error` with its own code table and
/// falls back on the shared helpers below.
pub(crate) trait ErrorMapper {
    /// Registry id of the provider.
    fn provider_name(&self) -> &'static str;

    /// Map a raw API error to the unified error type.
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError;

    /// Shortcut: the response could not be decoded.
    fn parse_error(&self, detail: impl ToString) -> DriverError {
        DriverError::MalformedResponse {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
            body: None,
        }
    }

    /// Shortcut: unknown error (fallback).
    fn unknown_error(&self, raw: RawApiError) -> DriverError {
        DriverError::Unknown {
            provider: self.provider_name().to_string(),
            raw_code: raw.code,
            raw_message: raw.message,
        }
    }

    fn credentials_error(&self, raw: RawApiError) -> DriverError {
        DriverError::InvalidCredentials {
            provider: self.provider_name().to_string(),
            raw_message: Some(raw.message),
        }
    }

    /// `NotFound` for the context resource; `Unknown` when the context names none.
    fn not_found_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
        match context.resource {
            Some(resource) => DriverError::NotFound {
                provider: self.provider_name().to_string(),
                resource,
                id: context.id.unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },
            None => self.unknown_error(raw),
        }
    }

    /// `AlreadyExists` for the context resource; `Unknown` when the context names none.
    fn already_exists_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
        match context.resource {
            Some(resource) => DriverError::AlreadyExists {
                provider: self.provider_name().to_string(),
                resource,
                name: context
                    .name
                    .or(context.id)
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },
            None => self.unknown_error(raw),
        }
    }

    /// Generic mapping from an HTTP status, for providers without structured codes.
    fn map_status(&self, status: u16, raw: RawApiError, context: ErrorContext) -> DriverError {
        match status {
            401 => self.credentials_error(raw),
            403 => DriverError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },
            404 => self.not_found_error(raw, context),
            409 => self.already_exists_error(raw, context),
            400 | 422 => DriverError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "request".to_string(),
                detail: raw.message,
            },
            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestMapper;

    impl ErrorMapper for TestMapper {
        fn provider_name(&self) -> &'static str {
            "test"
        }

        fn map_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
            self.map_status(400, raw, context)
        }
    }

    #[test]
    fn map_status_401() {
        let err = TestMapper.map_status(401, RawApiError::new("expired"), ErrorContext::default());
        assert!(matches!(err, DriverError::InvalidCredentials { raw_message: Some(m), .. } if m == "expired"));
    }

    #[test]
    fn map_status_404_uses_context() {
        let err = TestMapper.map_status(
            404,
            RawApiError::new("gone"),
            ErrorContext::with_id(ResourceKind::Node, "n-1"),
        );
        assert!(matches!(
            err,
            DriverError::NotFound { resource: ResourceKind::Node, ref id, .. } if id == "n-1"
        ));
    }

    #[test]
    fn map_status_404_without_context_is_unknown() {
        let err = TestMapper.map_status(404, RawApiError::new("gone"), ErrorContext::default());
        assert!(matches!(err, DriverError::Unknown { .. }));
    }

    #[test]
    fn map_status_409_prefers_name() {
        let err = TestMapper.map_status(
            409,
            RawApiError::new("dup"),
            ErrorContext::with_name(ResourceKind::KeyPair, "deploy"),
        );
        assert!(matches!(
            err,
            DriverError::AlreadyExists { resource: ResourceKind::KeyPair, ref name, .. } if name == "deploy"
        ));
    }

    #[test]
    fn map_status_422_is_invalid_parameter() {
        let err = TestMapper.map_error(RawApiError::new("bad"), ErrorContext::default());
        assert!(matches!(err, DriverError::InvalidParameter { .. }));
    }

    #[test]
    fn map_status_other_is_unknown_with_code() {
        let err = TestMapper.map_status(
            500,
            RawApiError::with_code("E1", "boom"),
            ErrorContext::default(),
        );
        assert!(matches!(err, DriverError::Unknown { raw_code: Some(ref c), .. } if c == "E1"));
    }
}
