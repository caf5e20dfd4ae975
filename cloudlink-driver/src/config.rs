//! Driver configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, Result};

/// Default connection timeout (seconds)
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default request timeout (seconds)
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings shared by every driver.
///
/// Deserializable so it can be loaded from a config file next to the
/// [`Credentials`](crate::Credentials).
///
/// ```rust
/// use cloudlink_driver::DriverConfig;
///
/// let config = DriverConfig::builder()
///     .region("us-east-2")
///     .max_retries(2)
///     .option("project_id", "c6b2f0ee")
///     .build();
/// assert_eq!(config.option("project_id"), Some("c6b2f0ee"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverConfig {
    /// Base URL or host override (private clouds, proxies, tests).
    pub endpoint: Option<String>,
    /// Provider region.
    pub region: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Automatic retries for transient errors. `0` surfaces every error directly.
    pub max_retries: u32,
    /// Overrides the default `User-Agent`.
    pub user_agent: Option<String>,
    /// Driver-specific options (e.g. `project_id`, `job_poll_interval_ms`).
    pub options: BTreeMap<String, String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: 0,
            user_agent: None,
            options: BTreeMap::new(),
        }
    }
}

impl DriverConfig {
    pub fn builder() -> DriverConfigBuilder {
        DriverConfigBuilder::default()
    }

    /// Reads a driver-specific option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Reads a driver-specific option parsed as an integer.
    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.option(key).and_then(|v| v.trim().parse().ok())
    }

    /// The endpoint override with any trailing `/` removed.
    pub fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.endpoint
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
    }

    /// Builds an HTTP client with the configured timeouts.
    pub fn http_client(&self, provider: &str) -> Result<Client> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("cloudlink/{}", env!("CARGO_PKG_VERSION")));

        Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| DriverError::NetworkError {
                provider: provider.to_string(),
                detail: format!("Failed to create HTTP client: {e}"),
            })
    }
}

/// Builder for [`DriverConfig`].
#[derive(Debug, Default)]
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the maximum number of automatic retries for transient errors (default: 0).
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.options.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> DriverConfig {
        self.config
    }
}
