//! Nova HTTP request methods
//!
//! Every call carries the cached `X-Auth-Token`. A 401 drops the token,
//! re-authenticates once and replays the request.

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{DriverError, Result};
use crate::http_client::{HttpUtils, RawResponse};
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};

use super::types::{Link, NovaFault};
use super::{OpenStackNodeDriver, PROVIDER};

/// Marker of the `rel="next"` link, wrapped for [`crate::pagination::Page`].
pub(crate) fn next_marker(links: &[Link]) -> Option<Option<String>> {
    let next = links.iter().find(|l| l.rel == "next")?;
    let url = Url::parse(&next.href).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "marker")
        .map(|(_, v)| Some(v.into_owned()))
}

/// `path` with `marker` appended to its query string.
pub(crate) fn with_marker(path: &str, marker: Option<&str>) -> String {
    match marker {
        None => path.to_string(),
        Some(marker) => {
            let sep = if path.contains('?') { '&' } else { '?' };
            format!("{path}{sep}marker={}", urlencoding::encode(marker))
        }
    }
}

/// `(fault name, message)` from a Nova fault body.
fn parse_fault(body: &str) -> Option<(String, String)> {
    let object: Map<String, Value> = serde_json::from_str(body).ok()?;
    let (name, inner) = object.into_iter().next()?;
    let fault: NovaFault = serde_json::from_value(inner).ok()?;
    Some((name, fault.message.unwrap_or_default()))
}

impl OpenStackNodeDriver {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<RawResponse> {
        let mut reauthenticated = false;

        loop {
            let token = self.token().await?;
            let url = format!("{}{path}", token.compute_url);

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("X-Auth-Token", &token.value)
                .header("Accept", "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = HttpUtils::execute_request_with_retry(
                request,
                PROVIDER,
                method.as_str(),
                &url,
                self.max_retries,
            )
            .await?;

            if response.status == 401 && !reauthenticated {
                log::warn!("[{PROVIDER}] Token rejected, re-authenticating");
                self.invalidate_token(&token).await;
                reauthenticated = true;
                continue;
            }
            if !response.is_success() {
                return Err(self.decode_error(response.status, &response.body, ctx));
            }
            return Ok(response);
        }
    }

    /// Send a request and decode its JSON response.
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
        let response = self.send(method, path, body, ctx).await?;
        HttpUtils::parse_json(&response.body, PROVIDER)
    }

    /// Send a request whose response body is empty (`202`/`204`).
    pub(crate) async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        ctx: ErrorContext,
    ) -> Result<()> {
        self.send(method, path, body, ctx).await.map(|_| ())
    }

    fn decode_error(&self, status: u16, body: &str, ctx: ErrorContext) -> DriverError {
        let Some((fault, message)) = parse_fault(body) else {
            return self.map_status(status, RawApiError::new(format!("HTTP {status}")), ctx);
        };
        log::error!("[{PROVIDER}] API error: {fault} - {message}");

        if status == 401 {
            return self.credentials_error(RawApiError::new(message));
        }
        match self.map_error(RawApiError::with_code(fault, message), ctx.clone()) {
            // Fault names vary between releases; fall back on the status
            DriverError::Unknown { raw_message, .. } if status < 500 => {
                self.map_status(status, RawApiError::new(raw_message), ctx)
            }
            err => err,
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
    fn marker_from_next_link() {
        let links = vec![
            Link {
                rel: "self".into(),
                href: "http://nova/v2.1/servers/detail".into(),
            },
            Link {
                rel: "next".into(),
                href: "http://nova/v2.1/servers/detail?limit=2&marker=srv-2".into(),
            },
        ];
        assert_eq!(next_marker(&links), Some(Some("srv-2".to_string())));
        assert_eq!(next_marker(&links[..1]), None);
    }

    #[test]
    fn marker_appended_to_path() {
        assert_eq!(with_marker("/servers/detail", None), "/servers/detail");
        assert_eq!(
            with_marker("/servers/detail", Some("a b")),
            "/servers/detail?marker=a%20b"
        );
        assert_eq!(
            with_marker("/images/detail?status=ACTIVE", Some("i-1")),
            "/images/detail?status=ACTIVE&marker=i-1"
        );
    }

    #[test]
    fn fault_body() {
        let err = driver().decode_error(
            404,
            r#"{"itemNotFound": {"code": 404, "message": "Flavor m1.huge could not be found."}}"#,
            ErrorContext::with_id(ResourceKind::Size, "m1.huge"),
        );
        assert!(matches!(
            err,
            DriverError::NotFound { resource: ResourceKind::Size, .. }
        ));
    }

    #[test]
    fn unknown_fault_falls_back_to_status() {
        let err = driver().decode_error(
            409,
            r#"{"someNewFault": {"code": 409, "message": "busy"}}"#,
            ErrorContext::with_name(ResourceKind::Node, "web"),
        );
        assert!(matches!(err, DriverError::AlreadyExists { .. }));
    }

    #[test]
    fn non_json_body_uses_status() {
        let err = driver().decode_error(403, "<html>nope</html>", ErrorContext::default());
        assert!(matches!(err, DriverError::PermissionDenied { .. }));
    }
}
