//! Cloudflare DNS driver
//!
//! Authenticates with an API token sent as `Authorization: Bearer`.

mod driver;
mod error;
mod http;
mod types;

use reqwest::Client;

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::types::Credentials;

pub(crate) const PROVIDER: &str = "cloudflare";
pub(crate) const CF_API_BASE: &str = "https://api.cloudflare.com/client/v4";
/// Cloudflare Zones API maximum page size
pub(crate) const MAX_PAGE_SIZE_ZONES: u32 = 50;
/// Cloudflare DNS Records API maximum page size
pub(crate) const MAX_PAGE_SIZE_RECORDS: u32 = 100;

/// Cloudflare DNS driver
pub struct CloudflareDnsDriver {
    pub(crate) client: Client,
    pub(crate) api_token: String,
    pub(crate) base_url: String,
    /// Account that new zones are created in (`account_id` option).
    pub(crate) account_id: Option<String>,
    pub(crate) max_retries: u32,
}

/// Builder for [`CloudflareDnsDriver`].
pub struct CloudflareDnsDriverBuilder {
    api_token: String,
    config: DriverConfig,
}

impl CloudflareDnsDriverBuilder {
    fn new(api_token: String) -> Self {
        Self {
            api_token,
            config: DriverConfig::default(),
        }
    }

    /// Replace the whole connection config.
    #[must_use]
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.config
            .options
            .insert("account_id".to_string(), account_id.into());
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn build(self) -> Result<CloudflareDnsDriver> {
        Ok(CloudflareDnsDriver {
            client: self.config.http_client(PROVIDER)?,
            base_url: self.config.endpoint_or(CF_API_BASE).to_string(),
            account_id: self.config.option("account_id").map(str::to_string),
            max_retries: self.config.max_retries,
            api_token: self.api_token,
        })
    }
}

impl CloudflareDnsDriver {
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::builder(api_token).build()
    }

    pub fn builder(api_token: impl Into<String>) -> CloudflareDnsDriverBuilder {
        CloudflareDnsDriverBuilder::new(api_token.into())
    }

    /// Registry constructor: expects [`Credentials::ApiToken`].
    pub fn from_credentials(credentials: Credentials, config: DriverConfig) -> Result<Self> {
        let token = credentials
            .into_api_token()
            .map_err(|e| DriverError::unusable_credentials(PROVIDER, &e))?;
        Self::builder(token).config(config).build()
    }
}
