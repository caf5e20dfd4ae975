//! Outscale compute driver
//!
//! Talks to the Outscale API (OAPI): every call is a JSON `POST` to
//! `/api/v1/{Action}` signed with OSC4-HMAC-SHA256.

mod driver;
mod error;
mod http;
mod sign;
mod sizes;
mod types;

use reqwest::Client;

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::types::Credentials;

pub use driver::OutscalePublicIp;

pub(crate) const PROVIDER: &str = "outscale";
pub(crate) const DEFAULT_REGION: &str = "eu-west-2";
pub(crate) const OSC_SERVICE: &str = "api";
pub(crate) const OSC_API_PATH: &str = "/api/v1";

/// Outscale compute driver
pub struct OutscaleNodeDriver {
    pub(crate) client: Client,
    pub(crate) access_key: String,
    pub(crate) secret_key: String,
    pub(crate) region: String,
    /// `https://api.{region}.outscale.com` unless overridden.
    pub(crate) base_url: String,
    /// Value of the signed `Host` header.
    pub(crate) host: String,
    pub(crate) max_retries: u32,
}

/// Builder for [`OutscaleNodeDriver`].
pub struct OutscaleNodeDriverBuilder {
    access_key: String,
    secret_key: String,
    config: DriverConfig,
}

impl OutscaleNodeDriverBuilder {
    fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key,
            secret_key,
            config: DriverConfig::default(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn build(self) -> Result<OutscaleNodeDriver> {
        let region = self
            .config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let default_url = format!("https://api.{region}.outscale.com");
        let base_url = self.config.endpoint_or(&default_url).to_string();
        let host = host_of(&base_url);

        Ok(OutscaleNodeDriver {
            client: self.config.http_client(PROVIDER)?,
            access_key: self.access_key,
            secret_key: self.secret_key,
            region,
            base_url,
            host,
            max_retries: self.config.max_retries,
        })
    }
}

impl OutscaleNodeDriver {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        Self::builder(access_key, secret_key).build()
    }

    pub fn builder(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> OutscaleNodeDriverBuilder {
        OutscaleNodeDriverBuilder::new(access_key.into(), secret_key.into())
    }

    /// Registry constructor: expects [`Credentials::AccessKey`].
    pub fn from_credentials(credentials: Credentials, config: DriverConfig) -> Result<Self> {
        let (access_key, secret_key) = credentials
            .into_access_key()
            .map_err(|e| DriverError::unusable_credentials(PROVIDER, &e))?;
        Self::builder(access_key, secret_key).config(config).build()
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

/// `https://host:port/path` -> `host:port`
fn host_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}
