//! Equinix Metal API wire types

use serde::Deserialize;

/// Error body: `{"errors": ["..."]}` or `{"error": "..."}`
#[derive(Debug, Deserialize)]
pub struct MetalErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Href {
    pub href: String,
}

/// `meta` of a paginated list.
#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub next: Option<Href>,
    #[serde(default)]
    pub total: Option<u64>,
}

// ============ Devices ============

#[derive(Debug, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ip_addresses: Vec<IpAssignment>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub operating_system: Option<OperatingSystem>,
    #[serde(default)]
    pub metro: Option<Metro>,
    #[serde(default)]
    pub facility: Option<Facility>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub billing_cycle: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project: Option<Href>,
    #[serde(default)]
    pub locked: bool,
    /// Only present shortly after provisioning.
    #[serde(default)]
    pub root_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IpAssignment {
    pub address: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub address_family: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub id: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub specs: Option<PlanSpecs>,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default)]
    pub line: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlanSpecs {
    #[serde(default)]
    pub cpus: Vec<CpuSpec>,
    #[serde(default)]
    pub memory: Option<MemorySpec>,
    #[serde(default)]
    pub drives: Vec<DriveSpec>,
}

#[derive(Debug, Deserialize)]
pub struct CpuSpec {
    #[serde(default)]
    pub count: u32,
    #[serde(default, rename = "type")]
    pub cpu_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemorySpec {
    /// e.g. `"64GB"`
    #[serde(default)]
    pub total: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DriveSpec {
    #[serde(default)]
    pub count: u64,
    /// e.g. `"480GB"`, `"3.8TB"`
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pricing {
    #[serde(default)]
    pub hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OperatingSystem {
    #[serde(default)]
    pub id: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub distro: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub provisionable_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Metro {
    #[serde(default)]
    pub id: Option<String>,
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Facility {
    pub code: String,
}

// ============ Projects, keys, storage ============

#[derive(Debug, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub organization: Option<Href>,
}

#[derive(Debug, Deserialize)]
pub struct SshKey {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StorageVolume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// GiB
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attachments: Vec<StorageAttachment>,
    #[serde(default)]
    pub facility: Option<Facility>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StorageAttachment {
    pub id: String,
    #[serde(default)]
    pub device: Option<Href>,
}

#[derive(Debug, Deserialize)]
pub struct StorageSnapshot {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub volume: Option<Href>,
}

