//! Built-in drivers, one module per provider, each behind its Cargo feature.

pub(crate) mod common;

#[cfg(feature = "cloudflare")]
pub mod cloudflare;
#[cfg(feature = "cloudstack")]
pub mod cloudstack;
#[cfg(feature = "equinixmetal")]
pub mod equinixmetal;
#[cfg(feature = "openstack")]
pub mod openstack;
#[cfg(feature = "outscale")]
pub mod outscale;
