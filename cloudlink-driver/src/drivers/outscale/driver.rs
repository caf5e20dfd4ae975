//! Outscale `ComputeDriver` implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{DriverError, ResourceKind, Result};
use crate::pagination::{Page, collect_pages};
use crate::traits::{ComputeDriver, ErrorContext, ErrorMapper};
use crate::types::{
    AuthScheme, CreateNodeRequest, CreateVolumeRequest, CredentialField, DriverKind,
    DriverMetadata, KeyPair, Node, NodeAuth, NodeImage, NodeLocation, NodeSize, NodeState,
    StorageVolume, StorageVolumeState, VolumeSnapshot, VolumeSnapshotState, extra_from,
};
use crate::utils::datetime::parse_timestamp;

use super::types::{
    CreateKeypairResponse, CreateSnapshotResponse, CreateVmsResponse, CreateVolumeResponse,
    Image, Keypair, ReadImagesResponse, ReadKeypairsResponse, ReadPublicIpsResponse,
    ReadSnapshotsResponse, ReadSubregionsResponse, ReadVmsResponse, ReadVolumesResponse,
    Snapshot, Subregion, Tag, Vm, Volume,
};
use super::{OutscaleNodeDriver, PROVIDER, sizes};

const RESULTS_PER_PAGE: u32 = 1000;
const DEFAULT_DEVICE: &str = "/dev/xvdb";

/// An Outscale public IP (EIP).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutscalePublicIp {
    pub id: String,
    pub ip: String,
    /// VM the address is linked to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
}

fn node_state(state: &str) -> NodeState {
    match state {
        "pending" => NodeState::Pending,
        "running" => NodeState::Running,
        "stopping" | "shutting-down" => NodeState::Stopping,
        "stopped" => NodeState::Stopped,
        "terminated" => NodeState::Terminated,
        "quarantine" => NodeState::Error,
        _ => NodeState::Unknown,
    }
}

fn volume_state(state: &str) -> StorageVolumeState {
    match state {
        "creating" => StorageVolumeState::Creating,
        "available" => StorageVolumeState::Available,
        "in-use" => StorageVolumeState::InUse,
        "deleting" => StorageVolumeState::Deleting,
        "error" => StorageVolumeState::Error,
        _ => StorageVolumeState::Unknown,
    }
}

fn snapshot_state(state: &str) -> VolumeSnapshotState {
    match state {
        "pending/queued" | "in-queue" | "pending" => VolumeSnapshotState::Creating,
        "completed" => VolumeSnapshotState::Available,
        "deleting" => VolumeSnapshotState::Deleting,
        "error" => VolumeSnapshotState::Error,
        _ => VolumeSnapshotState::Unknown,
    }
}

/// ISO country of a region, as far as it is known.
fn region_country(region: &str) -> Option<&'static str> {
    if region.starts_with("eu-") || region.starts_with("cloudgouv-") {
        Some("FR")
    } else if region.starts_with("us-") {
        Some("US")
    } else if region.starts_with("ap-northeast-") {
        Some("JP")
    } else {
        None
    }
}

fn name_tag(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|t| t.key == "Name")
        .map(|t| t.value.as_str())
}

fn tag_map(tags: &[Tag]) -> BTreeMap<&str, &str> {
    tags.iter()
        .map(|t| (t.key.as_str(), t.value.as_str()))
        .collect()
}

/// Pagination body shared by the `Read*` actions.
fn page_body(filters: &Value, token: Option<String>) -> Value {
    let mut body = json!({ "ResultsPerPage": RESULTS_PER_PAGE });
    if !filters.is_null() {
        body["Filters"] = filters.clone();
    }
    if let Some(token) = token {
        body["NextPageToken"] = json!(token);
    }
    body
}

fn next_token(token: Option<String>) -> Option<Option<String>> {
    token.filter(|t| !t.is_empty()).map(Some)
}

impl OutscaleNodeDriver {
    pub(crate) fn convert_node(vm: Vm) -> Node {
        let mut public_ips: Vec<String> = vm.public_ip.iter().cloned().collect();
        let mut private_ips: Vec<String> = vm.private_ip.iter().cloned().collect();
        for nic_ip in vm.nics.iter().flat_map(|n| &n.private_ips) {
            if !private_ips.contains(&nic_ip.private_ip) {
                private_ips.push(nic_ip.private_ip.clone());
            }
            if let Some(link) = &nic_ip.link_public_ip
                && !public_ips.contains(&link.public_ip)
            {
                public_ips.push(link.public_ip.clone());
            }
        }

        let name = name_tag(&vm.tags).unwrap_or(&vm.vm_id).to_string();

        Node {
            extra: extra_from([
                ("vm_type", json!(vm.vm_type)),
                ("keypair_name", json!(vm.keypair_name)),
                ("architecture", json!(vm.architecture)),
                ("security_groups", json!(vm.security_groups)),
                ("tags", json!(tag_map(&vm.tags))),
                ("state", json!(vm.state)),
            ]),
            state: node_state(&vm.state),
            size_id: vm.vm_type,
            image_id: vm.image_id,
            location_id: vm.placement.and_then(|p| p.subregion_name),
            created_at: vm.creation_date.as_deref().and_then(parse_timestamp),
            id: vm.vm_id,
            name,
            public_ips,
            private_ips,
            provider: PROVIDER.to_string(),
        }
    }

    pub(crate) fn convert_image(image: Image) -> NodeImage {
        NodeImage {
            name: image.image_name.clone().unwrap_or_else(|| image.image_id.clone()),
            extra: extra_from([
                ("description", json!(image.description)),
                ("state", json!(image.state)),
                ("architecture", json!(image.architecture)),
                ("account_alias", json!(image.account_alias)),
                ("root_device_type", json!(image.root_device_type)),
                ("creation_date", json!(image.creation_date)),
            ]),
            id: image.image_id,
            provider: PROVIDER.to_string(),
        }
    }

    fn convert_location(&self, subregion: Subregion) -> NodeLocation {
        let region = subregion
            .region_name
            .clone()
            .unwrap_or_else(|| self.region.clone());
        NodeLocation {
            id: subregion.subregion_name.clone(),
            name: subregion.subregion_name,
            country: region_country(&region).map(str::to_string),
            provider: PROVIDER.to_string(),
            extra: extra_from([("region", json!(region)), ("state", json!(subregion.state))]),
        }
    }

    pub(crate) fn convert_volume(volume: Volume) -> StorageVolume {
        let link = volume.linked_volumes.first();
        StorageVolume {
            name: name_tag(&volume.tags)
                .unwrap_or(&volume.volume_id)
                .to_string(),
            size_gb: volume.size,
            state: volume_state(&volume.state),
            attached_to: link.map(|l| l.vm_id.clone()),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("subregion_name", json!(volume.subregion_name)),
                ("volume_type", json!(volume.volume_type)),
                ("iops", json!(volume.iops)),
                ("snapshot_id", json!(volume.snapshot_id)),
                ("creation_date", json!(volume.creation_date)),
                ("device_name", json!(link.and_then(|l| l.device_name.clone()))),
                ("link_state", json!(link.and_then(|l| l.state.clone()))),
                ("tags", json!(tag_map(&volume.tags))),
            ]),
            id: volume.volume_id,
        }
    }

    fn convert_snapshot(snapshot: Snapshot) -> VolumeSnapshot {
        VolumeSnapshot {
            state: snapshot_state(&snapshot.state),
            size_gb: snapshot.volume_size,
            created_at: snapshot.creation_date.as_deref().and_then(parse_timestamp),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("volume_id", json!(snapshot.volume_id)),
                ("progress", json!(snapshot.progress)),
            ]),
            id: snapshot.snapshot_id,
            name: snapshot.description.filter(|d| !d.is_empty()),
        }
    }

    fn convert_key_pair(keypair: Keypair, public_key: Option<String>) -> KeyPair {
        KeyPair {
            name: keypair.keypair_name,
            fingerprint: keypair.keypair_fingerprint,
            public_key,
            private_key: keypair.private_key,
            provider: PROVIDER.to_string(),
            extra: BTreeMap::new(),
        }
    }

    async fn read_vms(&self, filters: Value, ctx: ErrorContext) -> Result<Vec<Vm>> {
        collect_pages(PROVIDER, None, |token| {
            let body = page_body(&filters, token);
            let ctx = ctx.clone();
            async move {
                let resp: ReadVmsResponse = self.request("ReadVms", &body, ctx).await?;
                Ok(Page::new(resp.vms, next_token(resp.next_page_token)))
            }
        })
        .await
    }

    async fn read_images(&self, filters: Value, ctx: ErrorContext) -> Result<Vec<Image>> {
        collect_pages(PROVIDER, None, |token| {
            let body = page_body(&filters, token);
            let ctx = ctx.clone();
            async move {
                let resp: ReadImagesResponse = self.request("ReadImages", &body, ctx).await?;
                Ok(Page::new(resp.images, next_token(resp.next_page_token)))
            }
        })
        .await
    }

    async fn read_volumes(&self, filters: Value) -> Result<Vec<Volume>> {
        collect_pages(PROVIDER, None, |token| {
            let body = page_body(&filters, token);
            async move {
                let resp: ReadVolumesResponse = self
                    .request("ReadVolumes", &body, ErrorContext::resource(ResourceKind::Volume))
                    .await?;
                Ok(Page::new(resp.volumes, next_token(resp.next_page_token)))
            }
        })
        .await
    }

    async fn read_keypairs(&self, filters: Value, ctx: ErrorContext) -> Result<Vec<Keypair>> {
        let body = if filters.is_null() {
            json!({})
        } else {
            json!({ "Filters": filters })
        };
        let resp: ReadKeypairsResponse = self.request("ReadKeypairs", &body, ctx).await?;
        Ok(resp.keypairs)
    }

    /// Create or overwrite tags on any set of resources.
    pub async fn ex_create_tags(&self, resource_ids: &[String], tags: &[(&str, &str)]) -> Result<()> {
        let tags: Vec<Tag> = tags
            .iter()
            .map(|(key, value)| Tag {
                key: (*key).to_string(),
                value: (*value).to_string(),
            })
            .collect();
        self.ack(
            "CreateTags",
            &json!({ "ResourceIds": resource_ids, "Tags": tags }),
            ErrorContext::default(),
        )
        .await
    }

    /// List the account's public IPs.
    pub async fn ex_list_public_ips(&self) -> Result<Vec<OutscalePublicIp>> {
        let resp: ReadPublicIpsResponse = self
            .request("ReadPublicIps", &json!({}), ErrorContext::default())
            .await?;
        Ok(resp
            .public_ips
            .into_iter()
            .map(|ip| OutscalePublicIp {
                id: ip.public_ip_id,
                ip: ip.public_ip,
                node_id: ip.vm_id,
                link_id: ip.link_public_ip_id,
            })
            .collect())
    }

    async fn vm_action(&self, action: &str, node_id: &str) -> Result<()> {
        self.ack(
            action,
            &json!({ "VmIds": [node_id] }),
            ErrorContext::with_id(ResourceKind::Node, node_id),
        )
        .await
    }

    fn invalid_parameter(param: &str, detail: &str) -> DriverError {
        DriverError::InvalidParameter {
            provider: PROVIDER.to_string(),
            param: param.to_string(),
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl ComputeDriver for OutscaleNodeDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: PROVIDER.to_string(),
            name: "Outscale".to_string(),
            kind: DriverKind::Compute,
            auth: AuthScheme::AccessKey,
            required_fields: vec![
                CredentialField::text("accessKeyId", "Access Key"),
                CredentialField::secret("secretAccessKey", "Secret Key"),
            ],
            website: Some("https://www.outscale.com".to_string()),
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let vms = self
            .read_vms(Value::Null, ErrorContext::resource(ResourceKind::Node))
            .await?;
        Ok(vms.into_iter().map(Self::convert_node).collect())
    }

    async fn get_node(&self, node_id: &str) -> Result<Node> {
        self.read_vms(
            json!({ "VmIds": [node_id] }),
            ErrorContext::with_id(ResourceKind::Node, node_id),
        )
        .await?
        .into_iter()
        .next()
        .map(Self::convert_node)
        .ok_or_else(|| DriverError::not_found(PROVIDER, ResourceKind::Node, node_id))
    }

    async fn create_node(&self, req: &CreateNodeRequest) -> Result<Node> {
        let keypair = match &req.auth {
            Some(NodeAuth::SshKey(name)) => Some(name.clone()),
            Some(NodeAuth::Password(_)) => {
                return Err(Self::invalid_parameter(
                    "auth",
                    "Outscale VMs only accept key pair authentication",
                ));
            }
            None => req.ex_str("keypair_name").map(str::to_string),
        };

        let mut body = json!({
            "ImageId": req.image_id,
            "VmType": req.size_id,
            "MinVmsCount": 1,
            "MaxVmsCount": 1,
            "ClientToken": uuid::Uuid::new_v4().to_string(),
        });
        if let Some(keypair) = keypair {
            body["KeypairName"] = json!(keypair);
        }
        if let Some(subregion) = &req.location_id {
            body["Placement"] = json!({ "SubregionName": subregion });
        }
        if let Some(user_data) = req.ex_str("user_data") {
            body["UserData"] = json!(BASE64.encode(user_data));
        }
        if let Some(subnet) = req.ex_str("subnet_id") {
            body["SubnetId"] = json!(subnet);
        }
        if let Some(groups) = req.ex.get("security_group_ids").filter(|v| v.is_array()) {
            body["SecurityGroupIds"] = groups.clone();
        }

        let resp: CreateVmsResponse = self
            .request(
                "CreateVms",
                &body,
                ErrorContext::with_name(ResourceKind::Node, &req.name),
            )
            .await?;
        let Some(mut vm) = resp.vms.into_iter().next() else {
            return Err(self.parse_error("CreateVms returned no VM"));
        };
        log::info!("[{PROVIDER}] Created VM {} ({})", vm.vm_id, req.name);

        self.ex_create_tags(std::slice::from_ref(&vm.vm_id), &[("Name", req.name.as_str())])
            .await?;
        vm.tags.retain(|t| t.key != "Name");
        vm.tags.push(Tag {
            key: "Name".to_string(),
            value: req.name.clone(),
        });

        Ok(Self::convert_node(vm))
    }

    async fn destroy_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("DeleteVms", node_id).await
    }

    async fn reboot_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("RebootVms", node_id).await
    }

    async fn start_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("StartVms", node_id).await
    }

    async fn stop_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("StopVms", node_id).await
    }

    async fn list_images(&self) -> Result<Vec<NodeImage>> {
        let images = self
            .read_images(Value::Null, ErrorContext::resource(ResourceKind::Image))
            .await?;
        Ok(images.into_iter().map(Self::convert_image).collect())
    }

    async fn get_image(&self, image_id: &str) -> Result<NodeImage> {
        self.read_images(
            json!({ "ImageIds": [image_id] }),
            ErrorContext::with_id(ResourceKind::Image, image_id),
        )
        .await?
        .into_iter()
        .next()
        .map(Self::convert_image)
        .ok_or_else(|| DriverError::not_found(PROVIDER, ResourceKind::Image, image_id))
    }

    async fn list_sizes(&self) -> Result<Vec<NodeSize>> {
        Ok(sizes::catalogue())
    }

    async fn list_locations(&self) -> Result<Vec<NodeLocation>> {
        let resp: ReadSubregionsResponse = self
            .request(
                "ReadSubregions",
                &json!({}),
                ErrorContext::resource(ResourceKind::Location),
            )
            .await?;
        Ok(resp
            .subregions
            .into_iter()
            .map(|s| self.convert_location(s))
            .collect())
    }

    async fn list_volumes(&self) -> Result<Vec<StorageVolume>> {
        let volumes = self.read_volumes(Value::Null).await?;
        Ok(volumes.into_iter().map(Self::convert_volume).collect())
    }

    async fn create_volume(&self, req: &CreateVolumeRequest) -> Result<StorageVolume> {
        let subregion = req
            .location_id
            .clone()
            .unwrap_or_else(|| format!("{}a", self.region));
        let mut body = json!({ "Size": req.size_gb, "SubregionName": subregion });
        if let Some(snapshot_id) = &req.snapshot_id {
            body["SnapshotId"] = json!(snapshot_id);
        }
        if let Some(volume_type) = req.ex.get("volume_type").and_then(Value::as_str) {
            body["VolumeType"] = json!(volume_type);
        }
        if let Some(iops) = req.ex.get("iops").and_then(Value::as_u64) {
            body["Iops"] = json!(iops);
        }

        let resp: CreateVolumeResponse = self
            .request(
                "CreateVolume",
                &body,
                ErrorContext::with_name(ResourceKind::Volume, &req.name),
            )
            .await?;
        let mut volume = resp.volume;

        if !req.name.is_empty() {
            self.ex_create_tags(std::slice::from_ref(&volume.volume_id), &[("Name", req.name.as_str())])
                .await?;
            volume.tags.push(Tag {
                key: "Name".to_string(),
                value: req.name.clone(),
            });
        }
        Ok(Self::convert_volume(volume))
    }

    async fn destroy_volume(&self, volume_id: &str) -> Result<()> {
        self.ack(
            "DeleteVolume",
            &json!({ "VolumeId": volume_id }),
            ErrorContext::with_id(ResourceKind::Volume, volume_id),
        )
        .await
    }

    async fn attach_volume(
        &self,
        node_id: &str,
        volume_id: &str,
        device: Option<&str>,
    ) -> Result<()> {
        self.ack(
            "LinkVolume",
            &json!({
                "VmId": node_id,
                "VolumeId": volume_id,
                "DeviceName": device.unwrap_or(DEFAULT_DEVICE),
            }),
            ErrorContext::with_id(ResourceKind::Volume, volume_id),
        )
        .await
    }

    async fn detach_volume(&self, volume_id: &str) -> Result<()> {
        self.ack(
            "UnlinkVolume",
            &json!({ "VolumeId": volume_id }),
            ErrorContext::with_id(ResourceKind::Volume, volume_id),
        )
        .await
    }

    async fn list_volume_snapshots(&self, volume_id: &str) -> Result<Vec<VolumeSnapshot>> {
        let filters = json!({ "VolumeIds": [volume_id] });
        let snapshots: Vec<Snapshot> = collect_pages(PROVIDER, None, |token| {
            let body = page_body(&filters, token);
            async move {
                let resp: ReadSnapshotsResponse = self
                    .request(
                        "ReadSnapshots",
                        &body,
                        ErrorContext::with_id(ResourceKind::Volume, volume_id),
                    )
                    .await?;
                Ok(Page::new(resp.snapshots, next_token(resp.next_page_token)))
            }
        })
        .await?;
        Ok(snapshots.into_iter().map(Self::convert_snapshot).collect())
    }

    async fn create_volume_snapshot(
        &self,
        volume_id: &str,
        name: Option<&str>,
    ) -> Result<VolumeSnapshot> {
        let mut body = json!({ "VolumeId": volume_id });
        if let Some(name) = name {
            body["Description"] = json!(name);
        }
        let resp: CreateSnapshotResponse = self
            .request(
                "CreateSnapshot",
                &body,
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        Ok(Self::convert_snapshot(resp.snapshot))
    }

    async fn destroy_volume_snapshot(&self, snapshot_id: &str) -> Result<()> {
        self.ack(
            "DeleteSnapshot",
            &json!({ "SnapshotId": snapshot_id }),
            ErrorContext::with_id(ResourceKind::Snapshot, snapshot_id),
        )
        .await
    }

    async fn list_key_pairs(&self) -> Result<Vec<KeyPair>> {
        let keypairs = self
            .read_keypairs(Value::Null, ErrorContext::resource(ResourceKind::KeyPair))
            .await?;
        Ok(keypairs
            .into_iter()
            .map(|k| Self::convert_key_pair(k, None))
            .collect())
    }

    async fn get_key_pair(&self, name: &str) -> Result<KeyPair> {
        self.read_keypairs(
            json!({ "KeypairNames": [name] }),
            ErrorContext::with_id(ResourceKind::KeyPair, name),
        )
        .await?
        .into_iter()
        .next()
        .map(|k| Self::convert_key_pair(k, None))
        .ok_or_else(|| DriverError::not_found(PROVIDER, ResourceKind::KeyPair, name))
    }

    async fn create_key_pair(&self, name: &str) -> Result<KeyPair> {
        let resp: CreateKeypairResponse = self
            .request(
                "CreateKeypair",
                &json!({ "KeypairName": name }),
                ErrorContext::with_name(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(resp.keypair, None))
    }

    async fn import_key_pair_from_string(&self, name: &str, public_key: &str) -> Result<KeyPair> {
        let public_key = public_key.trim();
        let resp: CreateKeypairResponse = self
            .request(
                "CreateKeypair",
                &json!({ "KeypairName": name, "PublicKey": BASE64.encode(public_key) }),
                ErrorContext::with_name(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(
            resp.keypair,
            Some(public_key.to_string()),
        ))
    }

    async fn delete_key_pair(&self, name: &str) -> Result<()> {
        self.ack(
            "DeleteKeypair",
            &json!({ "KeypairName": name }),
            ErrorContext::with_id(ResourceKind::KeyPair, name),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_json() -> Value {
        json!({
            "VmId": "i-12345678",
            "State": "running",
            "VmType": "tinav5.c2r4p2",
            "ImageId": "ami-abcdef",
            "Placement": { "SubregionName": "eu-west-2a" },
            "PublicIp": "171.33.1.2",
            "PrivateIp": "10.0.0.5",
            "Nics": [{
                "PrivateIps": [
                    { "PrivateIp": "10.0.0.5", "LinkPublicIp": { "PublicIp": "171.33.1.2" } },
                    { "PrivateIp": "10.0.0.6" }
                ]
            }],
            "KeypairName": "deploy",
            "CreationDate": "2024-01-02T03:04:05.000Z",
            "SecurityGroups": [{ "SecurityGroupId": "sg-1", "SecurityGroupName": "default" }],
            "Tags": [{ "Key": "Name", "Value": "web-1" }, { "Key": "env", "Value": "prod" }]
        })
    }

    #[test]
    fn convert_node_merges_addresses() {
        let vm: Vm = serde_json::from_value(vm_json()).unwrap();
        let node = OutscaleNodeDriver::convert_node(vm);
        assert_eq!(node.id, "i-12345678");
        assert_eq!(node.name, "web-1");
        assert_eq!(node.state, NodeState::Running);
        assert_eq!(node.public_ips, vec!["171.33.1.2"]);
        assert_eq!(node.private_ips, vec!["10.0.0.5", "10.0.0.6"]);
        assert_eq!(node.size_id.as_deref(), Some("tinav5.c2r4p2"));
        assert_eq!(node.location_id.as_deref(), Some("eu-west-2a"));
        assert!(node.created_at.is_some());
        assert_eq!(node.extra["tags"]["env"], json!("prod"));
        assert_eq!(node.extra["security_groups"][0]["SecurityGroupId"], json!("sg-1"));
    }

    #[test]
    fn convert_node_without_name_tag_uses_id() {
        let vm: Vm = serde_json::from_value(json!({ "VmId": "i-1", "State": "quarantine" })).unwrap();
        let node = OutscaleNodeDriver::convert_node(vm);
        assert_eq!(node.name, "i-1");
        assert_eq!(node.state, NodeState::Error);
        assert!(node.public_ips.is_empty());
    }

    #[test]
    fn node_states() {
        assert_eq!(node_state("pending"), NodeState::Pending);
        assert_eq!(node_state("shutting-down"), NodeState::Stopping);
        assert_eq!(node_state("stopped"), NodeState::Stopped);
        assert_eq!(node_state("terminated"), NodeState::Terminated);
        assert_eq!(node_state("weird"), NodeState::Unknown);
    }

    #[test]
    fn convert_volume_reports_attachment() {
        let volume: Volume = serde_json::from_value(json!({
            "VolumeId": "vol-1",
            "Size": 20,
            "State": "in-use",
            "SubregionName": "eu-west-2a",
            "VolumeType": "gp2",
            "LinkedVolumes": [{ "VmId": "i-1", "DeviceName": "/dev/xvdb", "State": "attached" }]
        }))
        .unwrap();
        let volume = OutscaleNodeDriver::convert_volume(volume);
        assert_eq!(volume.name, "vol-1");
        assert_eq!(volume.size_gb, 20);
        assert_eq!(volume.state, StorageVolumeState::InUse);
        assert_eq!(volume.attached_to.as_deref(), Some("i-1"));
        assert_eq!(volume.extra["device_name"], json!("/dev/xvdb"));
    }

    #[test]
    fn convert_snapshot_states() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "SnapshotId": "snap-1",
            "VolumeId": "vol-1",
            "VolumeSize": 20,
            "State": "completed",
            "Description": ""
        }))
        .unwrap();
        let snapshot = OutscaleNodeDriver::convert_snapshot(snapshot);
        assert_eq!(snapshot.state, VolumeSnapshotState::Available);
        assert_eq!(snapshot.name, None);
        assert_eq!(snapshot_state("pending/queued"), VolumeSnapshotState::Creating);
    }

    #[test]
    fn page_body_carries_token_and_filters() {
        let body = page_body(&json!({ "VmIds": ["i-1"] }), Some("tok".to_string()));
        assert_eq!(body["Filters"]["VmIds"][0], json!("i-1"));
        assert_eq!(body["NextPageToken"], json!("tok"));
        let body = page_body(&Value::Null, None);
        assert!(body.get("Filters").is_none());
        assert_eq!(next_token(Some(String::new())), None);
    }

    #[test]
    fn countries() {
        assert_eq!(region_country("eu-west-2"), Some("FR"));
        assert_eq!(region_country("cloudgouv-eu-west-1"), Some("FR"));
        assert_eq!(region_country("us-east-2"), Some("US"));
        assert_eq!(region_country("ap-northeast-1"), Some("JP"));
        assert_eq!(region_country("mars-1"), None);
    }

    #[tokio::test]
    async fn password_auth_is_rejected() {
        let driver = OutscaleNodeDriver::new("AK", "SK").unwrap();
        let req = CreateNodeRequest::new("web", "tinav5.c1r1p2", "ami-1")
            .with_auth(NodeAuth::Password("secret".into()));
        let err = driver.create_node(&req).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidParameter { ref param, .. } if param == "auth"));
    }
}
