//! Equinix Metal compute driver
//!
//! Bare-metal devices grouped in projects. Without a configured project the
//! driver lists across every project the token can see.

mod driver;
mod error;
mod http;
mod types;

use reqwest::Client;

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::types::Credentials;

pub use driver::EquinixProject;

pub(crate) const PROVIDER: &str = "equinixmetal";
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.equinix.com/metal/v1";

/// Equinix Metal compute driver
pub struct EquinixMetalNodeDriver {
    pub(crate) client: Client,
    pub(crate) api_token: String,
    pub(crate) base_url: String,
    /// Scope of project-level calls; `None` fans out over all projects.
    pub(crate) project_id: Option<String>,
    pub(crate) max_retries: u32,
}

/// Builder for [`EquinixMetalNodeDriver`].
pub struct EquinixMetalNodeDriverBuilder {
    api_token: String,
    config: DriverConfig,
}

impl EquinixMetalNodeDriverBuilder {
    fn new(api_token: String) -> Self {
        Self {
            api_token,
            config: DriverConfig::default(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.config
            .options
            .insert("project_id".to_string(), project_id.into());
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

    pub fn build(self) -> Result<EquinixMetalNodeDriver> {
        Ok(EquinixMetalNodeDriver {
            client: self.config.http_client(PROVIDER)?,
            api_token: self.api_token,
            base_url: self.config.endpoint_or(DEFAULT_BASE_URL).to_string(),
            project_id: self
                .config
                .option("project_id")
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
            max_retries: self.config.max_retries,
        })
    }
}

impl EquinixMetalNodeDriver {
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        Self::builder(api_token).build()
    }

    pub fn builder(api_token: impl Into<String>) -> EquinixMetalNodeDriverBuilder {
        EquinixMetalNodeDriverBuilder::new(api_token.into())
    }

    /// Registry constructor: expects [`Credentials::ApiToken`]; `project_id`
    /// is read from the driver options.
    pub fn from_credentials(credentials: Credentials, config: DriverConfig) -> Result<Self> {
        let token = credentials
            .into_api_token()
            .map_err(|e| DriverError::unusable_credentials(PROVIDER, &e))?;
        Self::builder(token).config(config).build()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
}
