//! # cloudlink-driver
//!
//! Unified drivers for compute, load balancer and DNS services across
//! multiple cloud providers, behind three async traits.
//!
//! ## Supported Drivers
//!
//! | Provider | Kind | Feature Flag | Auth Method |
//! |----------|------|-------------|-------------|
//! | [Outscale](https://outscale.com/) | Compute | `outscale` | OSC4-HMAC-SHA256 |
//! | [Apache CloudStack](https://cloudstack.apache.org/) | Compute, Load Balancer | `cloudstack` | HMAC-SHA1 query signing |
//! | [OpenStack](https://www.openstack.org/) | Compute | `openstack` | Keystone v3 password |
//! | [Equinix Metal](https://deploy.equinix.com/) | Compute | `equinixmetal` | API token |
//! | [Cloudflare](https://www.cloudflare.com/) | DNS | `cloudflare` | Bearer Token |
//!
//! ## Feature Flags
//!
//! ### Driver Selection
//!
//! - **`all-drivers`** *(default)*: enable every driver listed above.
//! - **`outscale`**, **`cloudstack`**, **`openstack`**, **`equinixmetal`**,
//!   **`cloudflare`**: enable a single driver.
//!
//! ### TLS Backend
//!
//! - **`native-tls`** *(default)*: use the platform's native TLS implementation.
//! - **`rustls`**: use rustls. Recommended for cross-compilation.
//!
//! ## Usage
//!
//! Drivers are looked up by provider id and instantiated from
//! [`Credentials`] plus a [`DriverConfig`]:
//!
//! ```rust,no_run
//! use cloudlink_driver::{
//!     ComputeDriver, ComputeProvider, CreateNodeRequest, Credentials, DriverConfig, NodeAuth,
//!     WaitOptions, get_compute_driver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = get_compute_driver(ComputeProvider::Outscale)?.connect(
//!         Credentials::access_key("AK", "SK"),
//!         DriverConfig::builder().region("eu-west-2").build(),
//!     )?;
//!
//!     let request = CreateNodeRequest::new("web-1", "tinav5.c2r4p2", "ami-12345678")
//!         .with_auth(NodeAuth::SshKey("deploy".to_string()));
//!     let node = driver.create_node(&request).await?;
//!
//!     let ready = driver
//!         .wait_until_running(&[node.id.clone()], WaitOptions::default())
//!         .await?;
//!     println!("{} is up at {:?}", ready[0].name, ready[0].public_ips);
//!     Ok(())
//! }
//! ```
//!
//! Provider-specific extensions (`ex_*` methods) live on the concrete driver
//! types, which can also be built directly:
//!
//! ```rust,no_run
//! # async fn run() -> cloudlink_driver::Result<()> {
//! use cloudlink_driver::drivers::equinixmetal::EquinixMetalNodeDriver;
//!
//! let driver = EquinixMetalNodeDriver::new("api-token")?;
//! for project in driver.ex_list_projects().await? {
//!     println!("{} {}", project.id, project.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`Result<T, DriverError>`](DriverError). Provider
//! error codes are translated into shared variants such as
//! [`DriverError::InvalidCredentials`], [`DriverError::NotFound`] and
//! [`DriverError::RateLimited`]; operations a driver cannot perform return
//! [`DriverError::NotSupported`].
//!
//! Transient errors are not retried unless [`DriverConfig::max_retries`] is
//! set.

mod config;
pub mod drivers;
mod error;
mod http_client;
mod pagination;
mod registry;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{DriverError, ResourceKind, Result};

// Re-export configuration
pub use config::{DriverConfig, DriverConfigBuilder};

// Re-export the registry
pub use registry::{
    ComputeProvider, DnsProvider, DriverFactory, DriverRegistry, DriverType,
    LoadBalancerProvider, all_driver_metadata, get_compute_driver, get_dns_driver, get_driver,
    get_loadbalancer_driver, set_driver,
};

// Re-export the driver contracts (error mapping stays internal)
pub use traits::{ComputeDriver, DnsDriver, LoadBalancerDriver};

// Re-export types
pub use types::{
    Algorithm, AuthScheme, BalancerState, BatchFailure, BatchResult, CreateBalancerRequest,
    CreateNodeRequest, CreateRecordRequest, CreateVolumeRequest, CreateZoneRequest,
    CredentialField, CredentialValidationError, Credentials, DriverKind, DriverMetadata, Extra,
    FieldType, KeyPair, LoadBalancer, Member, Node, NodeAuth, NodeImage, NodeLocation, NodeSize,
    NodeState, Record, RecordType, StorageVolume, StorageVolumeState, UpdateRecordRequest,
    VolumeSnapshot, VolumeSnapshotState, WaitOptions, Zone, ZoneType,
};

// Re-export utils module
pub use utils::datetime;

// Re-export concrete drivers (behind feature flags)
#[cfg(feature = "outscale")]
pub use drivers::outscale::OutscaleNodeDriver;

#[cfg(feature = "cloudstack")]
pub use drivers::cloudstack::{CloudStackLbDriver, CloudStackNodeDriver};

#[cfg(feature = "openstack")]
pub use drivers::openstack::OpenStackNodeDriver;

#[cfg(feature = "equinixmetal")]
pub use drivers::equinixmetal::EquinixMetalNodeDriver;

#[cfg(feature = "cloudflare")]
pub use drivers::cloudflare::CloudflareDnsDriver;
