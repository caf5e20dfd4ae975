use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Extra;

// ============ Node ============

/// Lifecycle state of a compute node, normalized across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Running,
    Starting,
    Rebooting,
    Terminated,
    Pending,
    Stopped,
    Stopping,
    Suspended,
    Paused,
    Error,
    Migrating,
    Unknown,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Starting => "starting",
            Self::Rebooting => "rebooting",
            Self::Terminated => "terminated",
            Self::Pending => "pending",
            Self::Stopped => "stopped",
            Self::Stopping => "stopping",
            Self::Suspended => "suspended",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Migrating => "migrating",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A virtual machine or bare-metal server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Provider-specific node identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Normalized lifecycle state.
    pub state: NodeState,
    /// Publicly routable addresses.
    pub public_ips: Vec<String>,
    /// Private addresses.
    pub private_ips: Vec<String>,
    /// Identifier of the size/flavor/plan, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_id: Option<String>,
    /// Identifier of the boot image, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    /// Identifier of the location/zone, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Creation time, if reported.
    #[serde(with = "crate::utils::datetime", default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Registry id of the driver that produced this node.
    pub provider: String,
    /// Provider-specific fields.
    pub extra: Extra,
}

/// An operating system image a node can boot from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeImage {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub extra: Extra,
}

/// A hardware profile (flavor, plan, service offering, VM type).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSize {
    pub id: String,
    pub name: String,
    /// Memory in MiB.
    pub ram_mb: u64,
    /// Root disk in GiB, when the size defines one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_gb: Option<u64>,
    /// Virtual CPU count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<u32>,
    /// Bandwidth allowance, provider units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u64>,
    /// Hourly price, when the provider publishes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub provider: String,
    pub extra: Extra,
}

/// A datacenter, region, zone or facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLocation {
    pub id: String,
    pub name: String,
    /// ISO country code, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub provider: String,
    pub extra: Extra,
}

/// How to grant initial access to a new node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum NodeAuth {
    /// Name of an existing key pair (or a raw public key, provider-dependent).
    SshKey(String),
    /// Initial root/administrator password.
    Password(String),
}

/// Parameters for [`ComputeDriver::create_node`](crate::ComputeDriver::create_node).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub name: String,
    pub size_id: String,
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<NodeAuth>,
    /// Provider-specific options (`ex_*` arguments).
    #[serde(default)]
    pub ex: Extra,
}

impl CreateNodeRequest {
    /// Creates a request with the three mandatory fields.
    pub fn new(
        name: impl Into<String>,
        size_id: impl Into<String>,
        image_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            size_id: size_id.into(),
            image_id: image_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: NodeAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets a provider-specific option.
    #[must_use]
    pub fn with_ex(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.ex.insert(key.into(), value);
        self
    }

    /// Reads a provider-specific option as a string.
    pub fn ex_str(&self, key: &str) -> Option<&str> {
        self.ex.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Polling parameters for [`ComputeDriver::wait_until_running`](crate::ComputeDriver::wait_until_running).
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Delay between two `list_nodes` polls.
    pub interval: Duration,
    /// Total time budget.
    pub timeout: Duration,
    /// Require at least one public IP before a node counts as running.
    pub require_public_ip: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600),
            require_public_ip: true,
        }
    }
}

// ============ Block storage ============

/// State of a block storage volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageVolumeState {
    Available,
    Error,
    InUse,
    Creating,
    Deleting,
    Attaching,
    Detaching,
    Backup,
    Unknown,
}

/// A block storage volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageVolume {
    pub id: String,
    pub name: String,
    /// Size in GiB.
    pub size_gb: u64,
    pub state: StorageVolumeState,
    /// Node the volume is attached to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,
    pub provider: String,
    pub extra: Extra,
}

/// Parameters for [`ComputeDriver::create_volume`](crate::ComputeDriver::create_volume).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolumeRequest {
    pub name: String,
    pub size_gb: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Create the volume from this snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub ex: Extra,
}

/// State of a volume snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeSnapshotState {
    Available,
    Creating,
    Deleting,
    Error,
    Unknown,
}

/// A point-in-time snapshot of a volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<u64>,
    pub state: VolumeSnapshotState,
    #[serde(with = "crate::utils::datetime", default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub provider: String,
    pub extra: Extra,
}

// ============ Key pairs ============

/// An SSH key pair registered with the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Only returned once, by `create_key_pair` on providers that generate keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    pub provider: String,
    pub extra: Extra,
}
