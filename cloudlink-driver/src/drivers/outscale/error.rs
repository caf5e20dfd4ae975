//! Outscale error mapping
//!
//! OAPI errors carry a numeric `Code` and a `Type`. The type groups codes into
//! families, which is what the mapping keys on.

use crate::error::DriverError;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::OutscaleNodeDriver;

impl ErrorMapper for OutscaleNodeDriver {
    fn provider_name(&self) -> &'static str {
        super::PROVIDER
    }

    /// `raw.code` holds the OAPI error `Type`.
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
        match raw.code.as_deref() {
            // Signature mismatch, unknown access key, expired request
            Some("AuthFailure" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "RequestExpired") => {
                self.credentials_error(raw)
            }

            Some("AccessDenied") => DriverError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            Some(
                "InvalidParameter" | "InvalidParameterValue" | "MissingParameter"
                | "InvalidParameterCombination" | "InvalidState",
            ) => DriverError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "request".to_string(),
                detail: raw.message,
            },

            Some("InvalidResource") => self.not_found_error(raw, context),

            Some("ResourceConflict") => self.already_exists_error(raw, context),

            Some("TooManyResources" | "LimitExceeded") => DriverError::QuotaExceeded {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            Some("RequestLimitExceeded" | "Throttling") => DriverError::RateLimited {
                provider: self.provider_name().to_string(),
                retry_after: None,
                raw_message: Some(raw.message),
            },

            Some("OperationNotSupported") => DriverError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "operation".to_string(),
                detail: raw.message,
            },

            _ => self.unknown_error(raw),
        }
    }
}
