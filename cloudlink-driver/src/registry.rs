//! Provider registry: maps provider identifiers to driver constructors.
//!
//! There is one table per driver kind. Built-in drivers enabled by Cargo
//! features are registered the first time a table is touched; callers can add
//! or replace entries at runtime with [`set_driver`].
//!
//! ```rust,no_run
//! use cloudlink_driver::{ComputeProvider, Credentials, DriverConfig, get_compute_driver};
//!
//! # async fn run() -> cloudlink_driver::Result<()> {
//! let factory = get_compute_driver(ComputeProvider::Outscale)?;
//! let driver = factory.connect(
//!     Credentials::access_key("AK", "SK"),
//!     DriverConfig::builder().region("eu-west-2").build(),
//! )?;
//! for node in driver.list_nodes().await? {
//!     println!("{} {}", node.id, node.state);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::config::DriverConfig;
use crate::error::{DriverError, Result};
use crate::traits::{ComputeDriver, DnsDriver, LoadBalancerDriver};
use crate::types::{Credentials, DriverKind, DriverMetadata};

type Constructor<D> = Arc<dyn Fn(Credentials, DriverConfig) -> Result<Arc<D>> + Send + Sync>;

/// A registered driver: its metadata plus a constructor.
///
/// The registry hands out factories rather than driver instances; call
/// [`connect`](Self::connect) to obtain a ready driver.
pub struct DriverFactory<D: ?Sized> {
    metadata: DriverMetadata,
    constructor: Constructor<D>,
}

impl<D: ?Sized> Clone for DriverFactory<D> {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            constructor: Arc::clone(&self.constructor),
        }
    }
}

impl<D: ?Sized> std::fmt::Debug for DriverFactory<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverFactory")
            .field("id", &self.metadata.id)
            .field("kind", &self.metadata.kind)
            .finish_non_exhaustive()
    }
}

impl<D: ?Sized> DriverFactory<D> {
    pub fn new<F>(metadata: DriverMetadata, constructor: F) -> Self
    where
        F: Fn(Credentials, DriverConfig) -> Result<Arc<D>> + Send + Sync + 'static,
    {
        Self {
            metadata,
            constructor: Arc::new(constructor),
        }
    }

    /// Registry key, lowercase.
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn metadata(&self) -> &DriverMetadata {
        &self.metadata
    }

    /// Instantiate the driver.
    pub fn connect(&self, credentials: Credentials, config: DriverConfig) -> Result<Arc<D>> {
        log::debug!("Connecting {} driver '{}'", self.metadata.kind, self.metadata.id);
        (self.constructor)(credentials, config)
    }
}

impl DriverFactory<dyn ComputeDriver> {
    /// Factory for a concrete compute driver type.
    pub fn compute<T>(constructor: fn(Credentials, DriverConfig) -> Result<T>) -> Self
    where
        T: ComputeDriver + 'static,
    {
        Self::new(T::metadata(), move |credentials, config| {
            Ok(Arc::new(constructor(credentials, config)?) as Arc<dyn ComputeDriver>)
        })
    }
}

impl DriverFactory<dyn LoadBalancerDriver> {
    /// Factory for a concrete load balancer driver type.
    pub fn load_balancer<T>(constructor: fn(Credentials, DriverConfig) -> Result<T>) -> Self
    where
        T: LoadBalancerDriver + 'static,
    {
        Self::new(T::metadata(), move |credentials, config| {
            Ok(Arc::new(constructor(credentials, config)?) as Arc<dyn LoadBalancerDriver>)
        })
    }
}

impl DriverFactory<dyn DnsDriver> {
    /// Factory for a concrete DNS driver type.
    pub fn dns<T>(constructor: fn(Credentials, DriverConfig) -> Result<T>) -> Self
    where
        T: DnsDriver + 'static,
    {
        Self::new(T::metadata(), move |credentials, config| {
            Ok(Arc::new(constructor(credentials, config)?) as Arc<dyn DnsDriver>)
        })
    }
}

/// Table of driver factories for one driver kind, keyed by lowercase id.
pub struct DriverRegistry<D: ?Sized> {
    kind: DriverKind,
    factories: RwLock<HashMap<String, DriverFactory<D>>>,
}

impl<D: ?Sized> DriverRegistry<D> {
    /// An empty registry.
    pub fn new(kind: DriverKind) -> Self {
        Self {
            kind,
            factories: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    /// Look up a driver. Identifiers are case-insensitive.
    pub fn get(&self, id: &str) -> Result<DriverFactory<D>> {
        let key = id.trim().to_ascii_lowercase();
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or_else(|| DriverError::UnknownProvider {
                kind: self.kind.to_string(),
                id: id.to_string(),
            })
    }

    /// Register a factory under its metadata id, returning the entry it replaced.
    pub fn register(&self, factory: DriverFactory<D>) -> Option<DriverFactory<D>> {
        let key = factory.metadata.id.to_ascii_lowercase();
        let previous = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), factory);
        if previous.is_some() {
            log::info!("Replaced {} driver '{key}'", self.kind);
        }
        previous
    }

    /// Remove a driver. Returns `true` if it was registered.
    pub fn unregister(&self, id: &str) -> bool {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id.trim().to_ascii_lowercase())
            .is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id.trim().to_ascii_lowercase())
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Metadata of every registered driver, sorted by id.
    pub fn metadata(&self) -> Vec<DriverMetadata> {
        let mut all: Vec<DriverMetadata> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|f| f.metadata.clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

/// Driver trait objects that own a global registry.
pub trait DriverType: Send + Sync + 'static {
    fn registry() -> &'static DriverRegistry<Self>;
}

static COMPUTE_DRIVERS: LazyLock<DriverRegistry<dyn ComputeDriver>> = LazyLock::new(|| {
    let registry = DriverRegistry::new(DriverKind::Compute);
    #[cfg(feature = "outscale")]
    registry.register(DriverFactory::compute(
        crate::drivers::outscale::OutscaleNodeDriver::from_credentials,
    ));
    #[cfg(feature = "cloudstack")]
    registry.register(DriverFactory::compute(
        crate::drivers::cloudstack::CloudStackNodeDriver::from_credentials,
    ));
    #[cfg(feature = "openstack")]
    registry.register(DriverFactory::compute(
        crate::drivers::openstack::OpenStackNodeDriver::from_credentials,
    ));
    #[cfg(feature = "equinixmetal")]
    registry.register(DriverFactory::compute(
        crate::drivers::equinixmetal::EquinixMetalNodeDriver::from_credentials,
    ));
    registry
});

static LOADBALANCER_DRIVERS: LazyLock<DriverRegistry<dyn LoadBalancerDriver>> =
    LazyLock::new(|| {
        let registry = DriverRegistry::new(DriverKind::LoadBalancer);
        #[cfg(feature = "cloudstack")]
        registry.register(DriverFactory::load_balancer(
            crate::drivers::cloudstack::CloudStackLbDriver::from_credentials,
        ));
        registry
    });

static DNS_DRIVERS: LazyLock<DriverRegistry<dyn DnsDriver>> = LazyLock::new(|| {
    let registry = DriverRegistry::new(DriverKind::Dns);
    #[cfg(feature = "cloudflare")]
    registry.register(DriverFactory::dns(
        crate::drivers::cloudflare::CloudflareDnsDriver::from_credentials,
    ));
    registry
});

impl DriverType for dyn ComputeDriver {
    fn registry() -> &'static DriverRegistry<Self> {
        &COMPUTE_DRIVERS
    }
}

impl DriverType for dyn LoadBalancerDriver {
    fn registry() -> &'static DriverRegistry<Self> {
        &LOADBALANCER_DRIVERS
    }
}

impl DriverType for dyn DnsDriver {
    fn registry() -> &'static DriverRegistry<Self> {
        &DNS_DRIVERS
    }
}

/// Resolve a provider id to its driver factory.
///
/// ```rust,no_run
/// use cloudlink_driver::{ComputeDriver, get_driver};
///
/// let factory = get_driver::<dyn ComputeDriver>("openstack").unwrap();
/// assert_eq!(factory.id(), "openstack");
/// ```
pub fn get_driver<D: DriverType + ?Sized>(id: &str) -> Result<DriverFactory<D>> {
    D::registry().get(id)
}

/// Register (or replace) a driver at runtime. Returns the replaced entry.
pub fn set_driver<D: DriverType + ?Sized>(factory: DriverFactory<D>) -> Option<DriverFactory<D>> {
    D::registry().register(factory)
}

pub fn get_compute_driver(provider: ComputeProvider) -> Result<DriverFactory<dyn ComputeDriver>> {
    get_driver::<dyn ComputeDriver>(provider.as_str())
}

pub fn get_loadbalancer_driver(
    provider: LoadBalancerProvider,
) -> Result<DriverFactory<dyn LoadBalancerDriver>> {
    get_driver::<dyn LoadBalancerDriver>(provider.as_str())
}

pub fn get_dns_driver(provider: DnsProvider) -> Result<DriverFactory<dyn DnsDriver>> {
    get_driver::<dyn DnsDriver>(provider.as_str())
}

/// Metadata of every registered driver across all kinds.
pub fn all_driver_metadata() -> Vec<DriverMetadata> {
    let mut all = COMPUTE_DRIVERS.metadata();
    all.extend(LOADBALANCER_DRIVERS.metadata());
    all.extend(DNS_DRIVERS.metadata());
    all
}

macro_rules! provider_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $id:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $id),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DriverError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($id => Ok(Self::$variant),)+
                    _ => Err(DriverError::UnknownProvider {
                        kind: stringify!($name).to_string(),
                        id: s.to_string(),
                    }),
                }
            }
        }
    };
}

provider_enum!(
    /// Built-in compute providers.
    ComputeProvider {
        Outscale => "outscale",
        CloudStack => "cloudstack",
        OpenStack => "openstack",
        EquinixMetal => "equinixmetal",
    }
);

provider_enum!(
    /// Built-in load balancer providers.
    LoadBalancerProvider {
        CloudStack => "cloudstack",
    }
);

provider_enum!(
    /// Built-in DNS providers.
    DnsProvider {
        Cloudflare => "cloudflare",
    }
);
