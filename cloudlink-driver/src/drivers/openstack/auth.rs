//! Keystone v3 password authentication and token cache

use chrono::{DateTime, Duration, Utc};

use crate::error::{DriverError, Result};
use crate::http_client::HttpUtils;
use crate::traits::{ErrorContext, ErrorMapper, RawApiError};
use crate::utils::datetime::parse_timestamp;
use crate::utils::log_sanitizer::mask_secret;

use super::types::{
    AuthBody, AuthRequest, CatalogEntry, Identity, KeystoneErrorResponse, NamedRef,
    PasswordMethod, ProjectRef, Scope, TokenResponse, UserRef,
};
use super::{OpenStackNodeDriver, PROVIDER};

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;
const COMPUTE_SERVICE: &str = "compute";

/// A scoped token and the compute endpoint it was issued for.
#[derive(Clone)]
pub(crate) struct AuthToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub compute_url: String,
}

impl AuthToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &mask_secret(&self.value))
            .field("expires_at", &self.expires_at)
            .field("compute_url", &self.compute_url)
            .finish()
    }
}

/// First `service_type` endpoint on `interface`, in `region` when one is given.
pub(crate) fn select_endpoint(
    catalog: &[CatalogEntry],
    service_type: &str,
    region: Option<&str>,
    interface: &str,
) -> Option<String> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| entry.endpoints.iter())
        .find(|ep| {
            ep.interface == interface
                && region.is_none_or(|r| {
                    ep.region_id.as_deref() == Some(r) || ep.region.as_deref() == Some(r)
                })
        })
        .map(|ep| ep.url.trim_end_matches('/').to_string())
}

impl OpenStackNodeDriver {
    fn auth_request(&self) -> AuthRequest<'_> {
        let domain = NamedRef { name: &self.domain };
        AuthRequest {
            auth: AuthBody {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: UserRef {
                            name: &self.username,
                            domain: NamedRef { name: &self.domain },
                            password: &self.password,
                        },
                    },
                },
                scope: self.project.as_deref().map(|project| Scope {
                    project: ProjectRef {
                        name: project,
                        domain,
                    },
                }),
            },
        }
    }

    /// `POST /v3/auth/tokens`
    async fn authenticate(&self) -> Result<AuthToken> {
        let url = format!("{}/v3/auth/tokens", self.auth_url);
        log::debug!("[{PROVIDER}] Authenticating {} against {url}", self.username);

        let request = self.client.post(&url).json(&self.auth_request());
        let response = HttpUtils::execute_request_with_retry(
            request,
            PROVIDER,
            "POST",
            &url,
            self.max_retries,
        )
        .await?;

        if !response.is_success() {
            let message = serde_json::from_str::<KeystoneErrorResponse>(&response.body)
                .ok()
                .and_then(|r| r.error.message.or(r.error.title))
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            log::error!("[{PROVIDER}] Keystone authentication failed: {message}");
            return Err(match response.status {
                401 => self.credentials_error(RawApiError::new(message)),
                status => self.map_status(status, RawApiError::new(message), ErrorContext::default()),
            });
        }

        let Some(value) = response.header("X-Subject-Token").map(str::to_string) else {
            return Err(self.parse_error("Keystone response has no X-Subject-Token header"));
        };
        let body: TokenResponse = HttpUtils::parse_json(&response.body, PROVIDER)?;
        let expires_at = parse_timestamp(&body.token.expires_at).ok_or_else(|| {
            self.parse_error(format!("invalid token expiry '{}'", body.token.expires_at))
        })?;

        let compute_url = match &self.compute_url {
            Some(url) => url.clone(),
            None => select_endpoint(
                &body.token.catalog,
                COMPUTE_SERVICE,
                self.region.as_deref(),
                &self.interface,
            )
            .ok_or_else(|| DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "region".to_string(),
                detail: format!(
                    "no {} compute endpoint in region {}",
                    self.interface,
                    self.region.as_deref().unwrap_or("(any)")
                ),
            })?,
        };

        log::debug!("[{PROVIDER}] Token valid until {expires_at}, compute at {compute_url}");
        Ok(AuthToken {
            value,
            expires_at,
            compute_url,
        })
    }

    /// Cached token, authenticating when there is none or it is about to expire.
    pub(crate) async fn token(&self) -> Result<AuthToken> {
        if let Some(token) = self.token.read().await.as_ref()
            && token.is_fresh(Utc::now())
        {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another task may have refreshed it while we waited
        if let Some(token) = slot.as_ref()
            && token.is_fresh(Utc::now())
        {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Drop `stale` from the cache unless it was already replaced.
    pub(crate) async fn invalidate_token(&self, stale: &AuthToken) {
        let mut slot = self.token.write().await;
        if slot.as_ref().is_some_and(|t| t.value == stale.value) {
            *slot = None;
        }
    }
}
