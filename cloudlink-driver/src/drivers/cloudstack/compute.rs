//! CloudStack `ComputeDriver` implementation

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::drivers::common::is_private_address;
use crate::error::{DriverError, ResourceKind, Result};
use crate::traits::{ComputeDriver, ErrorContext};
use crate::types::{
    AuthScheme, CreateNodeRequest, CreateVolumeRequest, CredentialField, DriverKind,
    DriverMetadata, Extra, KeyPair, Node, NodeAuth, NodeImage, NodeLocation, NodeSize, NodeState,
    StorageVolume, StorageVolumeState, VolumeSnapshot, VolumeSnapshotState, extra_from,
};
use crate::utils::datetime::parse_timestamp;

use super::types::{
    CsNetwork, CsSnapshot, CsVolume, CsZone, DiskOffering, KeyPairResponse, PublicIpAddress,
    ServiceOffering, SshKeyPair, Template, VirtualMachine,
};
use super::{CloudStackConnection, CloudStackNodeDriver, PROVIDER, Params, params};

const GIB: u64 = 1024 * 1024 * 1024;

/// A guest network visible to the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackNetwork {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    pub extra: Extra,
}

/// A public IP address owned by the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudStackAddress {
    pub id: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    /// VM the address is bound to through static NAT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub extra: Extra,
}

fn node_state(state: &str) -> NodeState {
    match state {
        "Running" => NodeState::Running,
        "Starting" => NodeState::Starting,
        "Stopped" | "Shutdowned" => NodeState::Stopped,
        "Stopping" => NodeState::Stopping,
        "Destroyed" | "Expunging" => NodeState::Terminated,
        "Migrating" => NodeState::Migrating,
        "Error" => NodeState::Error,
        "Creating" => NodeState::Pending,
        _ => NodeState::Unknown,
    }
}

fn volume_state(volume: &CsVolume) -> StorageVolumeState {
    match volume.state.as_str() {
        "Ready" if volume.virtualmachineid.is_some() => StorageVolumeState::InUse,
        "Ready" | "Allocated" | "Uploaded" => StorageVolumeState::Available,
        "Creating" | "Allocating" | "UploadOp" => StorageVolumeState::Creating,
        "Destroy" | "Expunging" | "Expunged" => StorageVolumeState::Deleting,
        "Attaching" => StorageVolumeState::Attaching,
        "Detaching" => StorageVolumeState::Detaching,
        "UploadError" => StorageVolumeState::Error,
        _ => StorageVolumeState::Unknown,
    }
}

fn snapshot_state(state: &str) -> VolumeSnapshotState {
    match state {
        "BackedUp" => VolumeSnapshotState::Available,
        "Creating" | "CreatedOnPrimary" | "BackingUp" | "Allocated" => {
            VolumeSnapshotState::Creating
        }
        "Destroying" | "Destroyed" => VolumeSnapshotState::Deleting,
        "Error" => VolumeSnapshotState::Error,
        _ => VolumeSnapshotState::Unknown,
    }
}

impl CloudStackNodeDriver {
    pub(crate) fn convert_node(vm: VirtualMachine) -> Node {
        let mut public_ips: Vec<String> = vm.publicip.iter().cloned().collect();
        let mut private_ips = Vec::new();
        for ip in vm
            .nic
            .iter()
            .flat_map(|n| n.ipaddress.iter().chain(n.ip6address.iter()))
        {
            let bucket = if is_private_address(ip) {
                &mut private_ips
            } else {
                &mut public_ips
            };
            if !bucket.contains(ip) {
                bucket.push(ip.clone());
            }
        }

        let default_network = vm
            .nic
            .iter()
            .find(|n| n.isdefault)
            .and_then(|n| n.networkid.clone());
        let security_groups: Vec<&str> = vm
            .securitygroup
            .iter()
            .filter_map(|g| g.name.as_deref())
            .collect();

        Node {
            name: vm
                .displayname
                .clone()
                .or_else(|| vm.name.clone())
                .unwrap_or_else(|| vm.id.clone()),
            state: node_state(&vm.state),
            extra: extra_from([
                ("state", json!(vm.state)),
                ("zone_name", json!(vm.zonename)),
                ("size_name", json!(vm.serviceofferingname)),
                ("key_name", json!(vm.keypair)),
                ("password", json!(vm.password)),
                ("hypervisor", json!(vm.hypervisor)),
                ("cpu_number", json!(vm.cpunumber)),
                ("memory_mb", json!(vm.memory)),
                ("default_network_id", json!(default_network)),
                ("security_groups", json!(security_groups)),
            ]),
            created_at: vm.created.as_deref().and_then(parse_timestamp),
            id: vm.id,
            public_ips,
            private_ips,
            size_id: vm.serviceofferingid,
            image_id: vm.templateid,
            location_id: vm.zoneid,
            provider: PROVIDER.to_string(),
        }
    }

    fn convert_image(template: Template) -> NodeImage {
        NodeImage {
            name: template.name.clone().unwrap_or_else(|| template.id.clone()),
            extra: extra_from([
                ("display_text", json!(template.displaytext)),
                ("os_type", json!(template.ostypename)),
                ("zone_id", json!(template.zoneid)),
                ("hypervisor", json!(template.hypervisor)),
                ("format", json!(template.format)),
                ("size", json!(template.size)),
                ("is_ready", json!(template.isready)),
            ]),
            id: template.id,
            provider: PROVIDER.to_string(),
        }
    }

    fn convert_size(offering: ServiceOffering) -> NodeSize {
        NodeSize {
            id: offering.id,
            name: offering.name,
            ram_mb: offering.memory.unwrap_or_default(),
            disk_gb: None,
            vcpus: offering.cpunumber,
            bandwidth: None,
            price: None,
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("display_text", json!(offering.displaytext)),
                ("cpu_speed_mhz", json!(offering.cpuspeed)),
                ("storage_type", json!(offering.storagetype)),
            ]),
        }
    }

    fn convert_location(zone: CsZone) -> NodeLocation {
        NodeLocation {
            id: zone.id,
            name: zone.name,
            country: None,
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("network_type", json!(zone.networktype)),
                ("allocation_state", json!(zone.allocationstate)),
            ]),
        }
    }

    pub(crate) fn convert_volume(volume: CsVolume) -> StorageVolume {
        StorageVolume {
            state: volume_state(&volume),
            name: volume.name.clone().unwrap_or_else(|| volume.id.clone()),
            size_gb: volume.size.unwrap_or_default() / GIB,
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("state", json!(volume.state)),
                ("volume_type", json!(volume.volume_type)),
                ("zone_id", json!(volume.zoneid)),
                ("device_id", json!(volume.deviceid)),
                ("disk_offering_id", json!(volume.diskofferingid)),
                ("created", json!(volume.created)),
            ]),
            attached_to: volume.virtualmachineid,
            id: volume.id,
        }
    }

    fn convert_snapshot(snapshot: CsSnapshot) -> VolumeSnapshot {
        VolumeSnapshot {
            state: snapshot_state(&snapshot.state),
            size_gb: snapshot.virtualsize.map(|b| b / GIB),
            created_at: snapshot.created.as_deref().and_then(parse_timestamp),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("volume_id", json!(snapshot.volumeid)),
                ("interval_type", json!(snapshot.intervaltype)),
            ]),
            id: snapshot.id,
            name: snapshot.name,
        }
    }

    fn convert_key_pair(keypair: SshKeyPair, public_key: Option<String>) -> KeyPair {
        KeyPair {
            name: keypair.name,
            fingerprint: keypair.fingerprint,
            public_key,
            private_key: keypair.privatekey,
            provider: PROVIDER.to_string(),
            extra: Extra::new(),
        }
    }

    async fn vm_action(&self, command: &str, node_id: &str) -> Result<()> {
        self.conn
            .async_request(
                command,
                &params([("id", node_id)]),
                ErrorContext::with_id(ResourceKind::Node, node_id),
            )
            .await?;
        Ok(())
    }

    /// Disk offering for a volume: `ex.disk_offering_id`, else the first custom-size offering.
    async fn disk_offering(&self, ex: &Extra) -> Result<String> {
        if let Some(id) = ex.get("disk_offering_id").and_then(Value::as_str) {
            return Ok(id.to_string());
        }
        let offerings: Vec<DiskOffering> = self
            .conn
            .list_all("listDiskOfferings", &Params::new(), "diskoffering", ErrorContext::default())
            .await?;
        offerings
            .into_iter()
            .find(|o| o.iscustomized)
            .map(|o| {
                log::debug!(
                    "[{PROVIDER}] Using custom disk offering {} ({})",
                    o.id,
                    o.name.as_deref().unwrap_or("-")
                );
                o.id
            })
            .ok_or_else(|| DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "disk_offering_id".to_string(),
                detail: "no custom-size disk offering available".to_string(),
            })
    }

    /// Guest networks of the account.
    pub async fn ex_list_networks(&self) -> Result<Vec<CloudStackNetwork>> {
        let networks: Vec<CsNetwork> = self
            .conn
            .list_all("listNetworks", &Params::new(), "network", ErrorContext::default())
            .await?;
        Ok(networks
            .into_iter()
            .map(|n| CloudStackNetwork {
                name: n.name.clone().unwrap_or_else(|| n.id.clone()),
                zone_id: n.zoneid,
                cidr: n.cidr,
                extra: extra_from([
                    ("display_text", json!(n.displaytext)),
                    ("state", json!(n.state)),
                    ("type", json!(n.network_type)),
                ]),
                id: n.id,
            })
            .collect())
    }

    /// Public IP addresses allocated to the account.
    pub async fn ex_list_public_ips(&self) -> Result<Vec<CloudStackAddress>> {
        let addresses: Vec<PublicIpAddress> = self
            .conn
            .list_all(
                "listPublicIpAddresses",
                &Params::new(),
                "publicipaddress",
                ErrorContext::default(),
            )
            .await?;
        Ok(addresses.into_iter().map(convert_address).collect())
    }

    /// Allocate a public IP in a zone (`associateIpAddress`).
    pub async fn ex_allocate_public_ip(&self, zone_id: &str) -> Result<CloudStackAddress> {
        self.conn.allocate_public_ip(zone_id, None).await
    }

    /// Release a public IP (`disassociateIpAddress`).
    pub async fn ex_release_public_ip(&self, address_id: &str) -> Result<()> {
        self.conn.release_public_ip(address_id).await
    }
}

pub(crate) fn convert_address(ip: PublicIpAddress) -> CloudStackAddress {
    CloudStackAddress {
        id: ip.id,
        address: ip.ipaddress,
        zone_id: ip.zoneid,
        node_id: ip.virtualmachineid,
        extra: extra_from([
            ("is_source_nat", json!(ip.issourcenat)),
            ("is_static_nat", json!(ip.isstaticnat)),
            ("network_id", json!(ip.associatednetworkid)),
        ]),
    }
}

impl CloudStackConnection {
    pub(crate) async fn zone_or_default(&self, location_id: Option<&str>) -> Result<String> {
        if let Some(id) = location_id {
            return Ok(id.to_string());
        }
        let zones: Vec<CsZone> = self
            .list_all("listZones", &Params::new(), "zone", ErrorContext::default())
            .await?;
        zones
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| DriverError::not_found(PROVIDER, ResourceKind::Location, "<default>"))
    }

    pub(crate) async fn allocate_public_ip(
        &self,
        zone_id: &str,
        network_id: Option<&str>,
    ) -> Result<CloudStackAddress> {
        let mut p = params([("zoneid", zone_id)]);
        if let Some(network_id) = network_id {
            p.insert("networkid".to_string(), network_id.to_string());
        }
        let ip: PublicIpAddress = self
            .async_request_as("associateIpAddress", &p, "ipaddress", ErrorContext::default())
            .await?;
        log::info!("[{PROVIDER}] Allocated public IP {} ({})", ip.ipaddress, ip.id);
        Ok(convert_address(ip))
    }

    pub(crate) async fn release_public_ip(&self, address_id: &str) -> Result<()> {
        self.async_request(
            "disassociateIpAddress",
            &params([("id", address_id)]),
            ErrorContext::default(),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ComputeDriver for CloudStackNodeDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: PROVIDER.to_string(),
            name: "CloudStack".to_string(),
            kind: DriverKind::Compute,
            auth: AuthScheme::AccessKey,
            required_fields: vec![
                CredentialField::text("accessKeyId", "API Key"),
                CredentialField::secret("secretAccessKey", "Secret Key")
                    .help("The API URL must be set as the endpoint"),
            ],
            website: Some("https://cloudstack.apache.org".to_string()),
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let vms: Vec<VirtualMachine> = self
            .conn
            .list_all(
                "listVirtualMachines",
                &Params::new(),
                "virtualmachine",
                ErrorContext::resource(ResourceKind::Node),
            )
            .await?;
        Ok(vms.into_iter().map(Self::convert_node).collect())
    }

    async fn get_node(&self, node_id: &str) -> Result<Node> {
        let vms: Vec<VirtualMachine> = self
            .conn
            .list_all(
                "listVirtualMachines",
                &params([("id", node_id)]),
                "virtualmachine",
                ErrorContext::with_id(ResourceKind::Node, node_id),
            )
            .await?;
        vms.into_iter()
            .next()
            .map(Self::convert_node)
            .ok_or_else(|| DriverError::not_found(PROVIDER, ResourceKind::Node, node_id))
    }

    async fn create_node(&self, req: &CreateNodeRequest) -> Result<Node> {
        let zone_id = self.conn.zone_or_default(req.location_id.as_deref()).await?;

        let mut p = params([
            ("serviceofferingid", req.size_id.as_str()),
            ("templateid", req.image_id.as_str()),
            ("zoneid", zone_id.as_str()),
            ("name", req.name.as_str()),
            ("displayname", req.name.as_str()),
        ]);
        match &req.auth {
            Some(NodeAuth::SshKey(key)) => {
                p.insert("keypair".to_string(), key.clone());
            }
            Some(NodeAuth::Password(_)) => {
                return Err(DriverError::InvalidParameter {
                    provider: PROVIDER.to_string(),
                    param: "auth".to_string(),
                    detail: "CloudStack generates VM passwords itself".to_string(),
                });
            }
            None => {}
        }
        if let Some(networks) = req.ex.get("network_ids").and_then(Value::as_array) {
            let ids: Vec<&str> = networks.iter().filter_map(Value::as_str).collect();
            p.insert("networkids".to_string(), ids.join(","));
        }
        if let Some(groups) = req.ex.get("security_groups").and_then(Value::as_array) {
            let names: Vec<&str> = groups.iter().filter_map(Value::as_str).collect();
            p.insert("securitygroupnames".to_string(), names.join(","));
        }
        if let Some(user_data) = req.ex_str("user_data") {
            p.insert("userdata".to_string(), BASE64.encode(user_data));
        }

        let vm: VirtualMachine = self
            .conn
            .async_request_as(
                "deployVirtualMachine",
                &p,
                "virtualmachine",
                ErrorContext::with_name(ResourceKind::Node, &req.name),
            )
            .await?;
        log::info!("[{PROVIDER}] Deployed VM {} ({})", vm.id, req.name);
        Ok(Self::convert_node(vm))
    }

    async fn destroy_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("destroyVirtualMachine", node_id).await
    }

    async fn reboot_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("rebootVirtualMachine", node_id).await
    }

    async fn start_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("startVirtualMachine", node_id).await
    }

    async fn stop_node(&self, node_id: &str) -> Result<()> {
        self.vm_action("stopVirtualMachine", node_id).await
    }

    async fn list_images(&self) -> Result<Vec<NodeImage>> {
        let templates: Vec<Template> = self
            .conn
            .list_all(
                "listTemplates",
                &params([("templatefilter", "executable")]),
                "template",
                ErrorContext::resource(ResourceKind::Image),
            )
            .await?;
        Ok(templates.into_iter().map(Self::convert_image).collect())
    }

    async fn list_sizes(&self) -> Result<Vec<NodeSize>> {
        let offerings: Vec<ServiceOffering> = self
            .conn
            .list_all(
                "listServiceOfferings",
                &Params::new(),
                "serviceoffering",
                ErrorContext::resource(ResourceKind::Size),
            )
            .await?;
        Ok(offerings.into_iter().map(Self::convert_size).collect())
    }

    async fn list_locations(&self) -> Result<Vec<NodeLocation>> {
        let zones: Vec<CsZone> = self
            .conn
            .list_all(
                "listZones",
                &Params::new(),
                "zone",
                ErrorContext::resource(ResourceKind::Location),
            )
            .await?;
        Ok(zones.into_iter().map(Self::convert_location).collect())
    }

    async fn list_volumes(&self) -> Result<Vec<StorageVolume>> {
        let volumes: Vec<CsVolume> = self
            .conn
            .list_all(
                "listVolumes",
                &Params::new(),
                "volume",
                ErrorContext::resource(ResourceKind::Volume),
            )
            .await?;
        Ok(volumes.into_iter().map(Self::convert_volume).collect())
    }

    async fn create_volume(&self, req: &CreateVolumeRequest) -> Result<StorageVolume> {
        let zone_id = self.conn.zone_or_default(req.location_id.as_deref()).await?;
        let mut p = params([("name", req.name.as_str()), ("zoneid", zone_id.as_str())]);

        // A snapshot carries its own size and offering
        if let Some(snapshot_id) = &req.snapshot_id {
            p.insert("snapshotid".to_string(), snapshot_id.clone());
        } else {
            p.insert("diskofferingid".to_string(), self.disk_offering(&req.ex).await?);
            p.insert("size".to_string(), req.size_gb.to_string());
        }

        let volume: CsVolume = self
            .conn
            .async_request_as(
                "createVolume",
                &p,
                "volume",
                ErrorContext::with_name(ResourceKind::Volume, &req.name),
            )
            .await?;
        Ok(Self::convert_volume(volume))
    }

    async fn destroy_volume(&self, volume_id: &str) -> Result<()> {
        self.conn
            .request_ack(
                "deleteVolume",
                &params([("id", volume_id)]),
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
        let mut p = params([("id", volume_id), ("virtualmachineid", node_id)]);
        // CloudStack takes a numeric device slot
        if let Some(slot) = device.and_then(|d| d.trim().parse::<u32>().ok()) {
            p.insert("deviceid".to_string(), slot.to_string());
        }
        self.conn
            .async_request(
                "attachVolume",
                &p,
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        Ok(())
    }

    async fn detach_volume(&self, volume_id: &str) -> Result<()> {
        self.conn
            .async_request(
                "detachVolume",
                &params([("id", volume_id)]),
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        Ok(())
    }

    async fn list_volume_snapshots(&self, volume_id: &str) -> Result<Vec<VolumeSnapshot>> {
        let snapshots: Vec<CsSnapshot> = self
            .conn
            .list_all(
                "listSnapshots",
                &params([("volumeid", volume_id)]),
                "snapshot",
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        Ok(snapshots.into_iter().map(Self::convert_snapshot).collect())
    }

    async fn create_volume_snapshot(
        &self,
        volume_id: &str,
        name: Option<&str>,
    ) -> Result<VolumeSnapshot> {
        let mut p = params([("volumeid", volume_id)]);
        if let Some(name) = name {
            p.insert("name".to_string(), name.to_string());
        }
        let snapshot: CsSnapshot = self
            .conn
            .async_request_as(
                "createSnapshot",
                &p,
                "snapshot",
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        Ok(Self::convert_snapshot(snapshot))
    }

    async fn destroy_volume_snapshot(&self, snapshot_id: &str) -> Result<()> {
        self.conn
            .async_request(
                "deleteSnapshot",
                &params([("id", snapshot_id)]),
                ErrorContext::with_id(ResourceKind::Snapshot, snapshot_id),
            )
            .await?;
        Ok(())
    }

    async fn list_key_pairs(&self) -> Result<Vec<KeyPair>> {
        let keypairs: Vec<SshKeyPair> = self
            .conn
            .list_all(
                "listSSHKeyPairs",
                &Params::new(),
                "sshkeypair",
                ErrorContext::resource(ResourceKind::KeyPair),
            )
            .await?;
        Ok(keypairs
            .into_iter()
            .map(|k| Self::convert_key_pair(k, None))
            .collect())
    }

    async fn get_key_pair(&self, name: &str) -> Result<KeyPair> {
        let keypairs: Vec<SshKeyPair> = self
            .conn
            .list_all(
                "listSSHKeyPairs",
                &params([("name", name)]),
                "sshkeypair",
                ErrorContext::with_id(ResourceKind::KeyPair, name),
            )
            .await?;
        keypairs
            .into_iter()
            .next()
            .map(|k| Self::convert_key_pair(k, None))
            .ok_or_else(|| DriverError::not_found(PROVIDER, ResourceKind::KeyPair, name))
    }

    async fn create_key_pair(&self, name: &str) -> Result<KeyPair> {
        let resp: KeyPairResponse = self
            .conn
            .request(
                "createSSHKeyPair",
                &params([("name", name)]),
                ErrorContext::with_name(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(resp.keypair, None))
    }

    async fn import_key_pair_from_string(&self, name: &str, public_key: &str) -> Result<KeyPair> {
        let public_key = public_key.trim();
        let resp: KeyPairResponse = self
            .conn
            .request(
                "registerSSHKeyPair",
                &params([("name", name), ("publickey", public_key)]),
                ErrorContext::with_name(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(
            resp.keypair,
            Some(public_key.to_string()),
        ))
    }

    async fn delete_key_pair(&self, name: &str) -> Result<()> {
        self.conn
            .request_ack(
                "deleteSSHKeyPair",
                &params([("name", name)]),
                ErrorContext::with_id(ResourceKind::KeyPair, name),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm() -> VirtualMachine {
        serde_json::from_value(json!({
            "id": "vm-1",
            "name": "VM-1a2b",
            "displayname": "web-1",
            "state": "Running",
            "zoneid": "zone-1",
            "zonename": "Paris",
            "templateid": "tpl-1",
            "serviceofferingid": "so-1",
            "serviceofferingname": "Small",
            "nic": [
                { "ipaddress": "10.1.1.5", "networkid": "net-1", "isdefault": true },
                { "ipaddress": "185.19.28.4", "networkid": "net-2", "isdefault": false }
            ],
            "keypair": "deploy",
            "created": "2024-01-02T03:04:05+0100",
            "securitygroup": [{ "name": "default" }]
        }))
        .unwrap()
    }

    #[test]
    fn convert_node_splits_addresses() {
        let node = CloudStackNodeDriver::convert_node(vm());
        assert_eq!(node.name, "web-1");
        assert_eq!(node.state, NodeState::Running);
        assert_eq!(node.private_ips, vec!["10.1.1.5"]);
        assert_eq!(node.public_ips, vec!["185.19.28.4"]);
        assert_eq!(node.location_id.as_deref(), Some("zone-1"));
        assert_eq!(node.extra["default_network_id"], json!("net-1"));
        assert_eq!(node.extra["security_groups"], json!(["default"]));
        assert!(node.created_at.is_some());
        assert!(!node.extra.contains_key("password"));
    }

    #[test]
    fn node_states() {
        assert_eq!(node_state("Starting"), NodeState::Starting);
        assert_eq!(node_state("Shutdowned"), NodeState::Stopped);
        assert_eq!(node_state("Destroyed"), NodeState::Terminated);
        assert_eq!(node_state("Migrating"), NodeState::Migrating);
        assert_eq!(node_state("Mystery"), NodeState::Unknown);
    }

    #[test]
    fn volume_in_use_when_attached() {
        let attached: CsVolume = serde_json::from_value(json!({
            "id": "v-1", "state": "Ready", "size": 21_474_836_480_u64, "virtualmachineid": "vm-1", "type": "DATADISK"
        }))
        .unwrap();
        let volume = CloudStackNodeDriver::convert_volume(attached);
        assert_eq!(volume.state, StorageVolumeState::InUse);
        assert_eq!(volume.size_gb, 20);
        assert_eq!(volume.attached_to.as_deref(), Some("vm-1"));

        let free: CsVolume =
            serde_json::from_value(json!({ "id": "v-2", "state": "Ready" })).unwrap();
        assert_eq!(volume_state(&free), StorageVolumeState::Available);
    }

    #[test]
    fn snapshot_states() {
        assert_eq!(snapshot_state("BackedUp"), VolumeSnapshotState::Available);
        assert_eq!(snapshot_state("BackingUp"), VolumeSnapshotState::Creating);
        assert_eq!(snapshot_state("Destroyed"), VolumeSnapshotState::Deleting);
    }

    #[tokio::test]
    async fn password_auth_is_rejected() {
        let driver = CloudStackNodeDriver::new("AK", "SK", "http://127.0.0.1:9/client/api").unwrap();
        let req = CreateNodeRequest::new("web", "so-1", "tpl-1")
            .with_location("zone-1")
            .with_auth(NodeAuth::Password("pw".into()));
        let err = driver.create_node(&req).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidParameter { ref param, .. } if param == "auth"));
    }
}
