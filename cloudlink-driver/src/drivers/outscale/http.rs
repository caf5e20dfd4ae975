//! Outscale HTTP request methods

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DriverError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::sign::CONTENT_TYPE;
use super::types::{Ack, OscErrorResponse};
use super::{OSC_API_PATH, OutscaleNodeDriver};

impl OutscaleNodeDriver {
    /// Call an OAPI action and decode its JSON response.
    pub(crate) async fn request<T, B>(&self, action: &str, body: &B, ctx: ErrorContext) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(body).map_err(|e| DriverError::SerializationError {
            provider: self.provider_name().to_string(),
            detail: e.to_string(),
        })?;
        log::debug!("Request Body: {payload}");

        let signed = self.sign(action, &payload, Utc::now());
        let url = format!("{}{OSC_API_PATH}/{action}", self.base_url);

        let request = self
            .client
            .post(&url)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Osc-Date", &signed.osc_date)
            .header("Authorization", &signed.authorization)
            .body(payload);

        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            "POST",
            action,
            self.max_retries,
        )
        .await?;

        if !response.is_success() {
            return Err(self.decode_error(response.status, &response.body, ctx));
        }

        HttpUtils::parse_json(&response.body, self.provider_name())
    }

    /// Call an action whose response carries nothing but the request id.
    pub(crate) async fn ack<B>(&self, action: &str, body: &B, ctx: ErrorContext) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let ack: Ack = self.request(action, body, ctx).await?;
        log::debug!(
            "[{}] {action} acknowledged, request id {}",
            self.provider_name(),
            ack.response_context.request_id.as_deref().unwrap_or("-")
        );
        Ok(())
    }

    fn decode_error(&self, status: u16, body: &str, ctx: ErrorContext) -> DriverError {
        let first = serde_json::from_str::<OscErrorResponse>(body)
            .ok()
            .and_then(|r| r.errors.into_iter().next());

        let Some(error) = first else {
            return self.map_status(status, RawApiError::new(format!("HTTP {status}")), ctx);
        };

        let message = match (&error.code, &error.details) {
            (Some(code), Some(details)) => format!("{code} - {details}"),
            (Some(code), None) => code.clone(),
            (None, Some(details)) => details.clone(),
            (None, None) => format!("HTTP {status}"),
        };
        log::error!("[{}] API error: {message}", self.provider_name());

        if status == 401 {
            return self.credentials_error(RawApiError::new(message));
        }
        match error.error_type {
            Some(error_type) => self.map_error(RawApiError::with_code(error_type, message), ctx),
            None => self.map_status(status, RawApiError::new(message), ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceKind;

    fn driver() -> OutscaleNodeDriver {
        OutscaleNodeDriver::new("AK", "SK").unwrap()
    }

    #[test]
    fn decode_error_uses_type() {
        let body = r#"{"Errors":[{"Code":"5063","Type":"InvalidResource","Details":"The VmId 'i-1' doesn't exist."}],"ResponseContext":{"RequestId":"r"}}"#;
        let err = driver().decode_error(400, body, ErrorContext::with_id(ResourceKind::Node, "i-1"));
        assert!(matches!(
            err,
            DriverError::NotFound { raw_message: Some(ref m), .. } if m.starts_with("5063 - ")
        ));
    }

    #[test]
    fn decode_error_401_is_credentials() {
        let body = r#"{"Errors":[{"Code":"1","Type":"AccessDenied","Details":""}]}"#;
        let err = driver().decode_error(401, body, ErrorContext::default());
        assert!(matches!(err, DriverError::InvalidCredentials { .. }));
    }

    #[test]
    fn decode_error_non_json_falls_back_to_status() {
        let err = driver().decode_error(403, "<html>denied</html>", ErrorContext::default());
        assert!(matches!(err, DriverError::PermissionDenied { .. }));
    }
}
