//! OpenStack compute driver
//!
//! Authenticates against Keystone v3 with a password and talks to Nova with
//! the resulting `X-Auth-Token`. The compute endpoint comes from the service
//! catalog unless `compute_url` is configured.

mod auth;
mod driver;
mod error;
mod http;
mod types;

use reqwest::Client;
use tokio::sync::RwLock;

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::types::Credentials;

use auth::AuthToken;

pub(crate) const PROVIDER: &str = "openstack";
pub(crate) const DEFAULT_DOMAIN: &str = "Default";
pub(crate) const DEFAULT_INTERFACE: &str = "public";

/// OpenStack (Nova) compute driver
pub struct OpenStackNodeDriver {
    pub(crate) client: Client,
    /// Keystone base URL, without the `/v3` suffix.
    pub(crate) auth_url: String,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) project: Option<String>,
    pub(crate) domain: String,
    pub(crate) region: Option<String>,
    pub(crate) interface: String,
    /// Skips the catalog lookup when set.
    pub(crate) compute_url: Option<String>,
    pub(crate) max_retries: u32,
    pub(crate) token: RwLock<Option<AuthToken>>,
}

/// Builder for [`OpenStackNodeDriver`].
///
/// Driver options read from [`DriverConfig::options`]: `auth_version`
/// (only `3.x_password` is accepted), `compute_url`, `interface`.
pub struct OpenStackNodeDriverBuilder {
    username: String,
    password: String,
    project: Option<String>,
    domain: Option<String>,
    config: DriverConfig,
}

impl OpenStackNodeDriverBuilder {
    fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            project: None,
            domain: None,
            config: DriverConfig::default(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Keystone URL, e.g. `https://keystone.example.com:5000`.
    #[must_use]
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Use this Nova URL instead of the one from the service catalog.
    #[must_use]
    pub fn compute_url(mut self, url: impl Into<String>) -> Self {
        self.config.options.insert("compute_url".to_string(), url.into());
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn build(self) -> Result<OpenStackNodeDriver> {
        if let Some(version) = self.config.option("auth_version")
            && !matches!(version, "3" | "3.x_password")
        {
            return Err(DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "auth_version".to_string(),
                detail: format!("unsupported auth version {version}, expected 3.x_password"),
            });
        }

        let Some(auth_url) = self.config.endpoint.as_deref() else {
            return Err(DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "endpoint".to_string(),
                detail: "the Keystone URL must be set as the endpoint".to_string(),
            });
        };
        let auth_url = auth_url
            .trim_end_matches('/')
            .trim_end_matches("/v3")
            .to_string();

        Ok(OpenStackNodeDriver {
            client: self.config.http_client(PROVIDER)?,
            auth_url,
            username: self.username,
            password: self.password,
            project: self.project,
            domain: self.domain.unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            region: self.config.region.clone(),
            interface: self
                .config
                .option("interface")
                .unwrap_or(DEFAULT_INTERFACE)
                .to_string(),
            compute_url: self
                .config
                .option("compute_url")
                .map(|u| u.trim_end_matches('/').to_string()),
            max_retries: self.config.max_retries,
            token: RwLock::new(None),
        })
    }
}

impl OpenStackNodeDriver {
    pub fn builder(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> OpenStackNodeDriverBuilder {
        OpenStackNodeDriverBuilder::new(username.into(), password.into())
    }

    /// Registry constructor: expects [`Credentials::Password`] and the
    /// Keystone URL in [`DriverConfig::endpoint`].
    pub fn from_credentials(credentials: Credentials, config: DriverConfig) -> Result<Self> {
        let (username, password, project, domain) = credentials
            .into_password()
            .map_err(|e| DriverError::unusable_credentials(PROVIDER, &e))?;
        let mut builder = Self::builder(username, password).config(config);
        if let Some(project) = project {
            builder = builder.project(project);
        }
        if let Some(domain) = domain {
            builder = builder.domain(domain);
        }
        builder.build()
    }
}
