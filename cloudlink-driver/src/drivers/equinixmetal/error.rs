//! Equinix Metal error mapping
//!
//! The API has no error codes, so `raw.code` is the HTTP status and
//! validation failures (422) are told apart by their message.

use crate::error::DriverError;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::EquinixMetalNodeDriver;

fn mentions(message: &str, patterns: &[&str]) -> bool {
    let message = message.to_lowercase();
    patterns.iter().any(|p| message.contains(p))
}

impl ErrorMapper for EquinixMetalNodeDriver {
    fn provider_name(&self) -> &'static str {
        super::PROVIDER
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
        match raw.code.as_deref() {
            Some("401") => self.credentials_error(raw),

            Some("403") => DriverError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            Some("404") => self.not_found_error(raw, context),

            Some("422")
                if context.name.is_some()
                    && mentions(&raw.message, &["already", "has been taken"]) =>
            {
                self.already_exists_error(raw, context)
            }
            Some("422") if mentions(&raw.message, &["quota", "limit", "capacity"]) => {
                DriverError::QuotaExceeded {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                }
            }
            Some("400" | "406" | "422") => DriverError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "request".to_string(),
                detail: raw.message,
            },

            Some("409") => self.already_exists_error(raw, context),

            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceKind;

    fn map(code: &str, message: &str, ctx: ErrorContext) -> DriverError {
        EquinixMetalNodeDriver::new("t")
            .unwrap()
            .map_error(RawApiError::with_code(code, message), ctx)
    }

    #[test]
    fn duplicate_key_label() {
        let err = map(
            "422",
            "Key has already been taken",
            ErrorContext::with_name(ResourceKind::KeyPair, "deploy"),
        );
        assert!(matches!(err, DriverError::AlreadyExists { ref name, .. } if name == "deploy"));
    }

    #[test]
    fn capacity_is_quota() {
        let err = map(
            "422",
            "Oh snap, the plan c3.small.x86 has no capacity in metro da",
            ErrorContext::with_name(ResourceKind::Node, "web"),
        );
        assert!(matches!(err, DriverError::QuotaExceeded { .. }));
    }

    #[test]
    fn validation_error() {
        let err = map("422", "Hostname is invalid", ErrorContext::default());
        assert!(matches!(err, DriverError::InvalidParameter { .. }));
    }

    #[test]
    fn server_error_is_unknown() {
        let err = map("500", "oops", ErrorContext::default());
        assert!(matches!(err, DriverError::Unknown { raw_code: Some(ref c), .. } if c == "500"));
    }
}
