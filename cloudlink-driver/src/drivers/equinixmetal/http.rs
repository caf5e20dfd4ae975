//! Equinix Metal HTTP request methods

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DriverError, Result};
use crate::http_client::{HttpUtils, RawResponse};
use crate::pagination::{Page, collect_pages};
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::types::{Meta, MetalErrorResponse};
use super::{EquinixMetalNodeDriver, PROVIDER};

const PER_PAGE: u32 = 100;

/// Absolute URL of a `meta.next.href`, which may be absolute, rooted at the
/// host (`/metal/v1/...`) or relative to the API base (`/projects/...`).
pub(crate) fn resolve_href(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let Ok(base) = Url::parse(base_url) else {
        return format!("{base_url}{href}");
    };
    let prefix = base.path().trim_end_matches('/');
    if !prefix.is_empty()
        && href.starts_with(prefix)
        && let Ok(joined) = base.join(href)
    {
        return joined.into();
    }
    format!("{base_url}{href}")
}

impl EquinixMetalNodeDriver {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<RawResponse> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header("X-Auth-Token", &self.api_token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = HttpUtils::execute_request_with_retry(
            request,
            PROVIDER,
            method.as_str(),
            url,
            self.max_retries,
        )
        .await?;

        if !response.is_success() {
            return Err(self.decode_error(response.status, &response.body, ctx));
        }
        Ok(response)
    }

    /// `path` is relative to the API base, e.g. `/devices/{id}`.
    pub(crate) async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self.send(method, &url, body, ctx).await?;
        HttpUtils::parse_json(&response.body, PROVIDER)
    }

    /// Request answered with `204 No Content` (or a body nobody needs).
    pub(crate) async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        self.send(method, &url, body, ctx).await.map(|_| ())
    }

    /// Every page of a list, following `meta.next.href`.
    pub(crate) async fn list_all<T>(
        &self,
        path: &str,
        item_key: &str,
        ctx: ErrorContext,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let sep = if path.contains('?') { '&' } else { '?' };
        let first = format!("{}{path}{sep}per_page={PER_PAGE}", self.base_url);

        collect_pages(PROVIDER, first, |url: String| {
            let ctx = ctx.clone();
            async move {
                let response = self.send(Method::GET, &url, None, ctx).await?;
                let mut body: Value = HttpUtils::parse_json(&response.body, PROVIDER)?;

                let items: Vec<T> = match body.get_mut(item_key).map(Value::take) {
                    Some(items) => serde_json::from_value(items).map_err(|e| {
                        log::error!("[{PROVIDER}] Unexpected '{item_key}' shape: {e}");
                        self.parse_error(e)
                    })?,
                    None => Vec::new(),
                };
                let meta: Meta = body
                    .get_mut("meta")
                    .map(Value::take)
                    .and_then(|m| serde_json::from_value(m).ok())
                    .unwrap_or_default();
                if let Some(total) = meta.total {
                    log::debug!("[{PROVIDER}] {item_key}: {total} in total");
                }
                let next = meta
                    .next
                    .map(|n| resolve_href(&self.base_url, &n.href))
                    .filter(|next| *next != url);
                Ok(Page::new(items, next))
            }
        })
        .await
    }

    fn decode_error(&self, status: u16, body: &str, ctx: ErrorContext) -> DriverError {
        let message = serde_json::from_str::<MetalErrorResponse>(body)
            .ok()
            .and_then(|r| {
                if r.errors.is_empty() {
                    r.error
                } else {
                    Some(r.errors.join("; "))
                }
            })
            .unwrap_or_else(|| format!("HTTP {status}"));
        log::error!("[{PROVIDER}] API error (HTTP {status}): {message}");
        self.map_error(RawApiError::with_code(status.to_string(), message), ctx)
    }
}
