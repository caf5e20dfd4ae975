//! Cloudflare HTTP request methods

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DriverError, Result};
use crate::http_client::{HttpUtils, RawResponse};
use crate::pagination::Page;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::CloudflareDnsDriver;
use super::types::CloudflareResponse;

impl CloudflareDnsDriver {
    /// Send a request and unwrap the response envelope.
    pub(crate) async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: ErrorContext,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body, ctx.clone()).await?;
        let envelope: CloudflareResponse<T> = self.decode(&response, ctx)?;
        envelope
            .result
            .ok_or_else(|| self.parse_error("Missing result in response"))
    }

    /// GET one page of a list endpoint. The cursor is the next page number.
    pub(crate) async fn get_page<T>(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
        ctx: ErrorContext,
    ) -> Result<Page<T, u32>>
    where
        T: DeserializeOwned,
    {
        let separator = if path.contains('?') { '&' } else { '?' };
        let path = format!("{path}{separator}page={page}&per_page={per_page}");
        let response = self
            .send::<()>(Method::GET, &path, None, ctx.clone())
            .await?;
        let envelope: CloudflareResponse<Vec<T>> = self.decode(&response, ctx)?;

        let items = envelope.result.unwrap_or_default();
        let next = match envelope.result_info {
            Some(info) => match info.total_pages {
                Some(total) => (info.page < total).then_some(info.page + 1),
                None => crate::pagination::next_page_number(
                    info.page,
                    per_page,
                    info.count.map_or(items.len(), |c| c as usize),
                ),
            },
            None => None,
        };
        Ok(Page::new(items, next))
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: ErrorContext,
    ) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&self.api_token);

        if let Some(body) = body {
            let payload =
                serde_json::to_string(body).map_err(|e| DriverError::SerializationError {
                    provider: self.provider_name().to_string(),
                    detail: e.to_string(),
                })?;
            log::debug!("Request Body: {payload}");
            request = request
                .header("Content-Type", "application/json")
                .body(payload);
        }

        let response = HttpUtils::execute_request_with_retry(
            request,
            self.provider_name(),
            method.as_str(),
            &url,
            self.max_retries,
        )
        .await?;

        // Errors come back in the envelope; only bodies that are not JSON at
        // all are classified by status here.
        if !response.is_success() && !response.body.trim_start().starts_with('{') {
            return Err(self.map_status(
                response.status,
                RawApiError::new(format!("HTTP {}", response.status)),
                ctx,
            ));
        }
        Ok(response)
    }

    fn decode<T>(&self, response: &RawResponse, ctx: ErrorContext) -> Result<CloudflareResponse<T>>
    where
        T: DeserializeOwned,
    {
        let envelope: CloudflareResponse<T> =
            HttpUtils::parse_json(&response.body, self.provider_name())?;

        if !envelope.success {
            let raw = envelope.errors.first().map_or_else(
                || RawApiError::new(format!("HTTP {}", response.status)),
                |e| RawApiError::with_code(e.code.to_string(), e.message.clone()),
            );
            log::error!("[{}] API error: {}", self.provider_name(), raw.message);
            if raw.code.is_none() {
                return Err(self.map_status(response.status, raw, ctx));
            }
            return Err(self.map_error(raw, ctx));
        }

        Ok(envelope)
    }
}
