//! CloudStack error mapping
//!
//! `raw.code` is the API `errorcode` (an HTTP-like number). Missing
//! resources come back as parameter errors, so 431 is split on the message.

use crate::error::DriverError;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::CloudStackConnection;

fn looks_like_not_found(message: &str) -> bool {
    let message = message.to_lowercase();
    ["unable to find", "does not exist", "not found", "invalid parameter id"]
        .iter()
        .any(|pattern| message.contains(pattern))
}

impl ErrorMapper for CloudStackConnection {
    fn provider_name(&self) -> &'static str {
        super::PROVIDER
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
        match raw.code.as_deref() {
            Some("401") => self.credentials_error(raw),

            // PARAM_ERROR
            Some("431") if context.resource.is_some() && looks_like_not_found(&raw.message) => {
                self.not_found_error(raw, context)
            }
            Some("431") => DriverError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "request".to_string(),
                detail: raw.message,
            },

            // UNSUPPORTED_ACTION_ERROR
            Some("432") => DriverError::NotSupported {
                provider: self.provider_name().to_string(),
                operation: raw.message,
            },

            // API_LIMIT_EXCEED
            Some("429" | "436") => DriverError::RateLimited {
                provider: self.provider_name().to_string(),
                retry_after: None,
                raw_message: Some(raw.message),
            },

            // ACCOUNT_ERROR
            Some("531") => DriverError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // ACCOUNT_RESOURCE_LIMIT_ERROR, INSUFFICIENT_CAPACITY_ERROR
            Some("532" | "533") => DriverError::QuotaExceeded {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // NETWORK_RULE_CONFLICT_ERROR
            Some("537") => self.already_exists_error(raw, context),

            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::cloudstack::CloudStackNodeDriver;
    use crate::error::ResourceKind;

    fn conn() -> CloudStackConnection {
        CloudStackNodeDriver::new("AK", "SK", "http://cs.local/client/api")
            .unwrap()
            .conn
    }

    #[test]
    fn unauthorized() {
        let err = conn().map_error(
            RawApiError::with_code("401", "unable to verify user credentials"),
            ErrorContext::default(),
        );
        assert!(matches!(err, DriverError::InvalidCredentials { .. }));
    }

    #[test]
    fn param_error_with_missing_entity_is_not_found() {
        let err = conn().map_error(
            RawApiError::with_code("431", "Unable to find virtual machine with id vm-9"),
            ErrorContext::with_id(ResourceKind::Node, "vm-9"),
        );
        assert!(matches!(
            err,
            DriverError::NotFound { resource: ResourceKind::Node, ref id, .. } if id == "vm-9"
        ));
    }

    #[test]
    fn param_error_otherwise_invalid_parameter() {
        let err = conn().map_error(
            RawApiError::with_code("431", "Unable to find virtual machine"),
            ErrorContext::default(),
        );
        assert!(matches!(err, DriverError::InvalidParameter { .. }));

        let err = conn().map_error(
            RawApiError::with_code("431", "size must be positive"),
            ErrorContext::with_id(ResourceKind::Volume, "v-1"),
        );
        assert!(matches!(err, DriverError::InvalidParameter { .. }));
    }

    #[test]
    fn limits() {
        let c = conn();
        assert!(matches!(
            c.map_error(RawApiError::with_code("532", "limit"), ErrorContext::default()),
            DriverError::QuotaExceeded { .. }
        ));
        assert!(matches!(
            c.map_error(RawApiError::with_code("436", "slow down"), ErrorContext::default()),
            DriverError::RateLimited { .. }
        ));
        assert!(matches!(
            c.map_error(RawApiError::with_code("432", "no such api"), ErrorContext::default()),
            DriverError::NotSupported { .. }
        ));
    }

    #[test]
    fn internal_error_is_unknown() {
        let err = conn().map_error(
            RawApiError::with_code("530", "boom"),
            ErrorContext::default(),
        );
        assert!(matches!(err, DriverError::Unknown { raw_code: Some(ref c), .. } if c == "530"));
    }
}
