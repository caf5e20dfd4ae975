//! CloudStack compute and load balancer drivers
//!
//! Every call is a signed `GET {endpoint}?command=...&apiKey=...&signature=...`.
//! Mutating commands are asynchronous: they return a `jobid` which the
//! connection polls through `queryAsyncJobResult`.

mod compute;
mod error;
mod http;
mod loadbalancer;
mod sign;
mod types;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::types::Credentials;

pub use compute::{CloudStackAddress, CloudStackNetwork};

pub(crate) const PROVIDER: &str = "cloudstack";
/// Records per `list*` page.
pub(crate) const PAGE_SIZE: u32 = 500;
const DEFAULT_JOB_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;

/// Query parameters of one command, without `command`, `apiKey` and `response`.
pub(crate) type Params = BTreeMap<String, String>;

pub(crate) fn params<const N: usize>(pairs: [(&str, &str); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Signed connection shared by the compute and load balancer drivers.
#[derive(Clone)]
pub(crate) struct CloudStackConnection {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) secret_key: String,
    /// API URL, e.g. `https://cloud.example.com/client/api`.
    pub(crate) base_url: String,
    pub(crate) max_retries: u32,
    pub(crate) job_poll_interval: Duration,
    pub(crate) job_timeout: Duration,
}

/// CloudStack compute driver
pub struct CloudStackNodeDriver {
    pub(crate) conn: CloudStackConnection,
}

/// CloudStack load balancer driver (load balancer rules on public IPs)
pub struct CloudStackLbDriver {
    pub(crate) conn: CloudStackConnection,
}

/// Builder for both CloudStack drivers. The endpoint is mandatory.
pub struct CloudStackDriverBuilder {
    api_key: String,
    secret_key: String,
    config: DriverConfig,
}

impl CloudStackDriverBuilder {
    fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
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
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Interval between two `queryAsyncJobResult` polls.
    #[must_use]
    pub fn job_poll_interval(mut self, interval: Duration) -> Self {
        self.config.options.insert(
            "job_poll_interval_ms".to_string(),
            interval.as_millis().to_string(),
        );
        self
    }

    #[must_use]
    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.config
            .options
            .insert("job_timeout_secs".to_string(), timeout.as_secs().to_string());
        self
    }

    fn connection(self) -> Result<CloudStackConnection> {
        let Some(endpoint) = self.config.endpoint.as_deref() else {
            return Err(DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "endpoint".to_string(),
                detail: "CloudStack has no default endpoint, set the API URL".to_string(),
            });
        };

        Ok(CloudStackConnection {
            client: self.config.http_client(PROVIDER)?,
            base_url: endpoint.trim_end_matches('/').to_string(),
            max_retries: self.config.max_retries,
            job_poll_interval: Duration::from_millis(
                self.config
                    .option_u64("job_poll_interval_ms")
                    .unwrap_or(DEFAULT_JOB_POLL_INTERVAL_MS),
            ),
            job_timeout: Duration::from_secs(
                self.config
                    .option_u64("job_timeout_secs")
                    .unwrap_or(DEFAULT_JOB_TIMEOUT_SECS),
            ),
            api_key: self.api_key,
            secret_key: self.secret_key,
        })
    }

    pub fn build(self) -> Result<CloudStackNodeDriver> {
        Ok(CloudStackNodeDriver {
            conn: self.connection()?,
        })
    }

    pub fn build_load_balancer(self) -> Result<CloudStackLbDriver> {
        Ok(CloudStackLbDriver {
            conn: self.connection()?,
        })
    }
}

fn access_keys(credentials: Credentials) -> Result<(String, String)> {
    credentials
        .into_access_key()
        .map_err(|e| DriverError::unusable_credentials(PROVIDER, &e))
}

impl CloudStackNodeDriver {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(api_key, secret_key).endpoint(endpoint).build()
    }

    pub fn builder(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> CloudStackDriverBuilder {
        CloudStackDriverBuilder::new(api_key.into(), secret_key.into())
    }

    /// Registry constructor: expects [`Credentials::AccessKey`] and `config.endpoint`.
    pub fn from_credentials(credentials: Credentials, config: DriverConfig) -> Result<Self> {
        let (api_key, secret_key) = access_keys(credentials)?;
        Self::builder(api_key, secret_key).config(config).build()
    }

    /// A load balancer driver sharing this driver's connection.
    pub fn load_balancer(&self) -> CloudStackLbDriver {
        CloudStackLbDriver {
            conn: self.conn.clone(),
        }
    }
}

impl CloudStackLbDriver {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        CloudStackNodeDriver::builder(api_key, secret_key)
            .endpoint(endpoint)
            .build_load_balancer()
    }

    /// Registry constructor: expects [`Credentials::AccessKey`] and `config.endpoint`.
    pub fn from_credentials(credentials: Credentials, config: DriverConfig) -> Result<Self> {
        let (api_key, secret_key) = access_keys(credentials)?;
        CloudStackNodeDriver::builder(api_key, secret_key)
            .config(config)
            .build_load_balancer()
    }
}
