//! OpenStack error mapping
//!
//! `raw.code` is the Nova fault name (`itemNotFound`, `badRequest`, ...).

use crate::error::DriverError;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::OpenStackNodeDriver;

impl ErrorMapper for OpenStackNodeDriver {
    fn provider_name(&self) -> &'static str {
        super::PROVIDER
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
        match raw.code.as_deref() {
            Some("unauthorized") => self.credentials_error(raw),

            Some("forbidden") => DriverError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            Some("itemNotFound") => self.not_found_error(raw, context),

            Some("conflictingRequest") if context.name.is_some() => {
                self.already_exists_error(raw, context)
            }
            Some("conflictingRequest") => DriverError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "state".to_string(),
                detail: raw.message,
            },

            Some("badRequest") => DriverError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "request".to_string(),
                detail: raw.message,
            },

            // 413 carries both quota and rate limit faults
            Some("overLimit") if raw.message.to_lowercase().contains("quota") => {
                DriverError::QuotaExceeded {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                }
            }
            Some("overLimit") => DriverError::RateLimited {
                provider: self.provider_name().to_string(),
                retry_after: None,
                raw_message: Some(raw.message),
            },

            Some("notImplemented" | "HTTPNotImplemented") => DriverError::NotSupported {
                provider: self.provider_name().to_string(),
                operation: raw.message,
            },

            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceKind;

    fn driver() -> OpenStackNodeDriver {
        OpenStackNodeDriver::builder("u", "p")
            .auth_url("http://keystone:5000")
            .build()
            .unwrap()
    }

    #[test]
    fn item_not_found() {
        let err = driver().map_error(
            RawApiError::with_code("itemNotFound", "Instance srv-1 could not be found."),
            ErrorContext::with_id(ResourceKind::Node, "srv-1"),
        );
        assert!(matches!(
            err,
            DriverError::NotFound { resource: ResourceKind::Node, ref id, .. } if id == "srv-1"
        ));
    }

    #[test]
    fn conflict_depends_on_context() {
        let d = driver();
        let err = d.map_error(
            RawApiError::with_code("conflictingRequest", "Key pair 'k' already exists."),
            ErrorContext::with_name(ResourceKind::KeyPair, "k"),
        );
        assert!(matches!(err, DriverError::AlreadyExists { .. }));

        let err = d.map_error(
            RawApiError::with_code("conflictingRequest", "Cannot 'reboot' instance while it is in vm_state stopped"),
            ErrorContext::with_id(ResourceKind::Node, "srv-1"),
        );
        assert!(matches!(err, DriverError::InvalidParameter { ref param, .. } if param == "state"));
    }

    #[test]
    fn over_limit_split() {
        let d = driver();
        assert!(matches!(
            d.map_error(
                RawApiError::with_code("overLimit", "Quota exceeded for instances"),
                ErrorContext::default()
            ),
            DriverError::QuotaExceeded { .. }
        ));
        assert!(matches!(
            d.map_error(
                RawApiError::with_code("overLimit", "This request was rate-limited."),
                ErrorContext::default()
            ),
            DriverError::RateLimited { .. }
        ));
    }

    #[test]
    fn unknown_fault() {
        let err = driver().map_error(
            RawApiError::with_code("computeFault", "Unexpected API Error."),
            ErrorContext::default(),
        );
        assert!(matches!(err, DriverError::Unknown { raw_code: Some(ref c), .. } if c == "computeFault"));
    }
}
