//! Shared value objects returned by every driver.
//!
//! All records carry an `extra` map for provider-specific fields that are not
//! promoted to the common schema. The map is always present, possibly empty.

mod compute;
mod credentials;
mod dns;
mod loadbalancer;
mod metadata;

use std::collections::BTreeMap;

pub use compute::{
    CreateNodeRequest, CreateVolumeRequest, KeyPair, Node, NodeAuth, NodeImage, NodeLocation,
    NodeSize, NodeState, StorageVolume, StorageVolumeState, VolumeSnapshot, VolumeSnapshotState,
    WaitOptions,
};
pub use credentials::{CredentialValidationError, Credentials};
pub use dns::{
    BatchFailure, BatchResult, CreateRecordRequest, CreateZoneRequest, Record, RecordType,
    UpdateRecordRequest, Zone, ZoneType,
};
pub use loadbalancer::{Algorithm, BalancerState, CreateBalancerRequest, LoadBalancer, Member};
pub use metadata::{AuthScheme, CredentialField, DriverKind, DriverMetadata, FieldType};

/// Open-ended provider-specific metadata bag.
pub type Extra = BTreeMap<String, serde_json::Value>;

/// Builds an [`Extra`] map from `(key, value)` pairs, skipping JSON `null`s.
pub(crate) fn extra_from<I, K>(pairs: I) -> Extra
where
    I: IntoIterator<Item = (K, serde_json::Value)>,
    K: Into<String>,
{
    pairs
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.into(), v))
        .collect()
}
