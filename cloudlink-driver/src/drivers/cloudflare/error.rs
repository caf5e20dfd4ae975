//! Cloudflare error mapping

use crate::error::{DriverError, ResourceKind};
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::CloudflareDnsDriver;

/// Cloudflare error code mapping
/// Reference: <https://api.cloudflare.com/#getting-started-responses>
impl ErrorMapper for CloudflareDnsDriver {
    fn provider_name(&self) -> &'static str {
        super::PROVIDER
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> DriverError {
        match raw.code.as_deref() {
            // 6003: Invalid request headers
            // 6103: Invalid format for X-Auth-Key header
            // 6111: Invalid format for Authorization header
            // 9109: Unauthorized to access requested resource
            // 10000: Authentication error
            Some("6003" | "6103" | "6111" | "9109" | "10000") => self.credentials_error(raw),

            // 1004: DNS Validation Error
            // 9000: Invalid or missing name
            // 9005/9006: Content for A/AAAA record is invalid
            // 9009: Content for MX record must be a hostname
            // 9021: Invalid TTL
            // 9041: This DNS record cannot be proxied
            Some(code @ ("1004" | "9000" | "9005" | "9006" | "9009" | "9021" | "9041")) => {
                let param = match code {
                    "9000" => "name",
                    "9005" | "9006" | "9009" => "data",
                    "9021" => "ttl",
                    "9041" => "proxied",
                    _ => "record",
                };
                DriverError::InvalidParameter {
                    provider: self.provider_name().to_string(),
                    param: param.to_string(),
                    detail: raw.message,
                }
            }

            // 81053..81058: a record with that host/settings already exists
            Some("81053" | "81054" | "81055" | "81056" | "81057" | "81058") => self
                .already_exists_error(
                    raw,
                    ErrorContext {
                        resource: Some(ResourceKind::Record),
                        ..context
                    },
                ),

            // 81044: Record does not exist
            Some("81044") => self.not_found_error(
                raw,
                ErrorContext {
                    resource: Some(ResourceKind::Record),
                    ..context
                },
            ),

            // 81045: The record quota has been exceeded
            Some("81045") => DriverError::QuotaExceeded {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },

            // 7000: No route for that URI
            // 7003: Could not route to /path, the object identifier may be invalid
            Some("7000" | "7003") => {
                let id = match context.resource {
                    Some(ResourceKind::Zone) => context.id,
                    _ => None,
                };
                self.not_found_error(
                    raw,
                    ErrorContext {
                        resource: Some(ResourceKind::Zone),
                        id,
                        name: None,
                    },
                )
            }

            // 1061: zone already exists in the account
            Some("1061") => self.already_exists_error(
                raw,
                ErrorContext {
                    resource: Some(ResourceKind::Zone),
                    ..context
                },
            ),

            _ => self.unknown_error(raw),
        }
    }
}
