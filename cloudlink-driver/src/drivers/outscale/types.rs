//! Outscale OAPI wire types

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseContext {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OscErrorResponse {
    #[serde(default)]
    pub errors: Vec<OscError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OscError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "Type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

// ============ VMs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vm {
    pub vm_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub vm_type: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub nics: Vec<Nic>,
    #[serde(default)]
    pub keypair_name: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<SecurityGroupLight>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Placement {
    #[serde(default)]
    pub subregion_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Nic {
    #[serde(default)]
    pub private_ips: Vec<NicPrivateIp>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NicPrivateIp {
    pub private_ip: String,
    #[serde(default)]
    pub link_public_ip: Option<LinkPublicIp>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkPublicIp {
    pub public_ip: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupLight {
    pub security_group_id: String,
    #[serde(default)]
    pub security_group_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadVmsResponse {
    #[serde(default)]
    pub vms: Vec<Vm>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateVmsResponse {
    #[serde(default)]
    pub vms: Vec<Vm>,
}

// ============ Images & subregions ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    pub image_id: String,
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub account_alias: Option<String>,
    #[serde(default)]
    pub root_device_type: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadImagesResponse {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subregion {
    pub subregion_name: String,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadSubregionsResponse {
    #[serde(default)]
    pub subregions: Vec<Subregion>,
}

// ============ Volumes & snapshots ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    pub volume_id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub subregion_name: Option<String>,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub iops: Option<u64>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub linked_volumes: Vec<LinkedVolume>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkedVolume {
    pub vm_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadVolumesResponse {
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateVolumeResponse {
    pub volume: Volume,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    pub snapshot_id: String,
    #[serde(default)]
    pub volume_id: Option<String>,
    #[serde(default)]
    pub volume_size: Option<u64>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub progress: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadSnapshotsResponse {
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSnapshotResponse {
    pub snapshot: Snapshot,
}

// ============ Keypairs & public IPs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Keypair {
    pub keypair_name: String,
    #[serde(default)]
    pub keypair_fingerprint: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadKeypairsResponse {
    #[serde(default)]
    pub keypairs: Vec<Keypair>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateKeypairResponse {
    pub keypair: Keypair,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicIp {
    pub public_ip_id: String,
    pub public_ip: String,
    #[serde(default)]
    pub vm_id: Option<String>,
    #[serde(default)]
    pub link_public_ip_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadPublicIpsResponse {
    #[serde(default)]
    pub public_ips: Vec<PublicIp>,
}

/// Body-less acknowledgement (`{"ResponseContext": {...}}`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ack {
    #[serde(default)]
    pub response_context: ResponseContext,
}
