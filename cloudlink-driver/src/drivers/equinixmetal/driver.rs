//! Equinix Metal `ComputeDriver` implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{DriverError, ResourceKind, Result};
use crate::traits::{ComputeDriver, ErrorContext};
use crate::types::{
    AuthScheme, CreateNodeRequest, CreateVolumeRequest, CredentialField, DriverKind,
    DriverMetadata, KeyPair, Node, NodeAuth, NodeImage, NodeLocation, NodeSize, NodeState,
    StorageVolume, StorageVolumeState, VolumeSnapshot, VolumeSnapshotState, extra_from,
};
use crate::utils::datetime::parse_timestamp;

use super::types::{
    Device, Metro, OperatingSystem, Plan, Project, SshKey, StorageSnapshot,
    StorageVolume as MetalVolume,
};
use super::{EquinixMetalNodeDriver, PROVIDER};

const DEFAULT_BILLING_CYCLE: &str = "hourly";
const DEFAULT_STORAGE_PLAN: &str = "storage_1";

/// A project visible to the API token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquinixProject {
    pub id: String,
    pub name: String,
    #[serde(with = "crate::utils::datetime", default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

fn node_state(state: &str) -> NodeState {
    match state {
        "queued" | "provisioning" | "reinstalling" | "post_provisioning" => NodeState::Pending,
        "active" => NodeState::Running,
        "powering_on" => NodeState::Starting,
        "powering_off" => NodeState::Stopping,
        "inactive" => NodeState::Stopped,
        "rebooting" => NodeState::Rebooting,
        "deprovisioning" | "deleted" => NodeState::Terminated,
        "failed" => NodeState::Error,
        _ => NodeState::Unknown,
    }
}

fn volume_state(volume: &MetalVolume) -> StorageVolumeState {
    match volume.state.as_str() {
        "queued" | "provisioning" => StorageVolumeState::Creating,
        "active" if !volume.attachments.is_empty() => StorageVolumeState::InUse,
        "active" => StorageVolumeState::Available,
        "deprovisioning" => StorageVolumeState::Deleting,
        "failed" => StorageVolumeState::Error,
        _ => StorageVolumeState::Unknown,
    }
}

/// `"64GB"` -> 64, `"3.8TB"` -> 3891. Decimal prefixes are read as binary.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_gb(size: &str) -> Option<u64> {
    let size = size.trim().to_ascii_uppercase();
    let (number, factor) = if let Some(n) = size.strip_suffix("TB") {
        (n, 1024.0)
    } else if let Some(n) = size.strip_suffix("GB") {
        (n, 1.0)
    } else {
        return None;
    };
    let value: f64 = number.trim().parse().ok()?;
    (value >= 0.0).then(|| (value * factor) as u64)
}

/// Last path segment of an API href such as `/metal/v1/devices/{id}`.
fn href_id(href: &str) -> &str {
    href.rsplit('/').next().unwrap_or(href)
}

fn device_path(node_id: &str) -> String {
    format!("/devices/{}", urlencoding::encode(node_id))
}

fn storage_path(volume_id: &str) -> String {
    format!("/storage/{}", urlencoding::encode(volume_id))
}

/// `POST /projects/{id}/devices` body.
fn device_body(req: &CreateNodeRequest) -> Result<Value> {
    let Some(metro) = req.location_id.as_deref().or_else(|| req.ex_str("metro")) else {
        return Err(DriverError::InvalidParameter {
            provider: PROVIDER.to_string(),
            param: "location_id".to_string(),
            detail: "a metro code is required".to_string(),
        });
    };

    let mut device = Map::new();
    device.insert("hostname".into(), json!(req.name));
    device.insert("plan".into(), json!(req.size_id));
    device.insert("operating_system".into(), json!(req.image_id));
    device.insert("metro".into(), json!(metro));
    device.insert(
        "billing_cycle".into(),
        json!(req.ex_str("billing_cycle").unwrap_or(DEFAULT_BILLING_CYCLE)),
    );

    match &req.auth {
        // Project and user keys are injected automatically; a named key narrows it
        Some(NodeAuth::SshKey(key_id)) => {
            device.insert("user_ssh_keys".into(), json!([key_id]));
        }
        Some(NodeAuth::Password(_)) => {
            return Err(DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "auth".to_string(),
                detail: "password authentication is not supported, use an SSH key".to_string(),
            });
        }
        None => {}
    }
    if let Some(user_data) = req.ex_str("user_data") {
        device.insert("userdata".into(), json!(user_data));
    }
    if let Some(tags) = req.ex.get("tags").filter(|t| t.is_array()) {
        device.insert("tags".into(), tags.clone());
    }

    Ok(Value::Object(device))
}

impl EquinixMetalNodeDriver {
    pub(crate) fn convert_node(device: Device) -> Node {
        let (public, private): (Vec<_>, Vec<_>) =
            device.ip_addresses.iter().partition(|ip| ip.public);
        let ipv6: Vec<&str> = device
            .ip_addresses
            .iter()
            .filter(|ip| ip.address_family == Some(6))
            .map(|ip| ip.address.as_str())
            .collect();

        Node {
            state: node_state(&device.state),
            public_ips: public.iter().map(|ip| ip.address.clone()).collect(),
            private_ips: private.iter().map(|ip| ip.address.clone()).collect(),
            size_id: device.plan.as_ref().map(|p| p.slug.clone()),
            image_id: device.operating_system.as_ref().map(|os| os.slug.clone()),
            location_id: device
                .metro
                .as_ref()
                .map(|m| m.code.clone())
                .or_else(|| device.facility.as_ref().map(|f| f.code.clone())),
            created_at: device.created_at.as_deref().and_then(parse_timestamp),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("state", json!(device.state)),
                ("billing_cycle", json!(device.billing_cycle)),
                ("tags", json!(device.tags)),
                ("locked", json!(device.locked)),
                ("ipv6", json!(ipv6)),
                ("facility", json!(device.facility.as_ref().map(|f| &f.code))),
                ("project_id", json!(device.project.as_ref().map(|p| href_id(&p.href)))),
                ("root_password", json!(device.root_password)),
            ]),
            id: device.id,
            name: device.hostname,
        }
    }

    fn convert_image(os: OperatingSystem) -> NodeImage {
        NodeImage {
            name: os.name.clone().unwrap_or_else(|| os.slug.clone()),
            extra: extra_from([
                ("uuid", json!(os.id)),
                ("distro", json!(os.distro)),
                ("version", json!(os.version)),
                ("provisionable_on", json!(os.provisionable_on)),
            ]),
            id: os.slug,
            provider: PROVIDER.to_string(),
        }
    }

    fn convert_size(plan: Plan) -> NodeSize {
        let specs = plan.specs.as_ref();
        let ram_mb = specs
            .and_then(|s| s.memory.as_ref())
            .and_then(|m| m.total.as_deref())
            .and_then(parse_gb)
            .map_or(0, |gb| gb * 1024);
        let disk_gb = specs.map(|s| {
            s.drives
                .iter()
                .filter_map(|d| d.size.as_deref().and_then(parse_gb).map(|gb| gb * d.count))
                .sum()
        });
        let vcpus = specs.map(|s| s.cpus.iter().map(|c| c.count).sum());
        let cpu_type = specs.and_then(|s| s.cpus.first()).and_then(|c| c.cpu_type.clone());

        NodeSize {
            name: plan.name.clone().unwrap_or_else(|| plan.slug.clone()),
            ram_mb,
            disk_gb,
            vcpus,
            bandwidth: None,
            price: plan.pricing.and_then(|p| p.hour),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("uuid", json!(plan.id)),
                ("description", json!(plan.description)),
                ("line", json!(plan.line)),
                ("cpu_type", json!(cpu_type)),
            ]),
            id: plan.slug,
        }
    }

    fn convert_location(metro: Metro) -> NodeLocation {
        NodeLocation {
            name: metro.name.clone().unwrap_or_else(|| metro.code.clone()),
            country: metro.country,
            provider: PROVIDER.to_string(),
            extra: extra_from([("uuid", json!(metro.id))]),
            id: metro.code,
        }
    }

    fn convert_volume(volume: MetalVolume) -> StorageVolume {
        StorageVolume {
            state: volume_state(&volume),
            size_gb: volume.size,
            attached_to: volume
                .attachments
                .iter()
                .find_map(|a| a.device.as_ref())
                .map(|d| href_id(&d.href).to_string()),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("description", json!(volume.description)),
                ("facility", json!(volume.facility.as_ref().map(|f| &f.code))),
                (
                    "attachment_ids",
                    json!(volume.attachments.iter().map(|a| &a.id).collect::<Vec<_>>()),
                ),
                ("created_at", json!(volume.created_at)),
            ]),
            name: volume.name.unwrap_or_else(|| volume.id.clone()),
            id: volume.id,
        }
    }

    fn convert_snapshot(snapshot: StorageSnapshot) -> VolumeSnapshot {
        let state = match snapshot.status.as_deref() {
            Some("created" | "active") => VolumeSnapshotState::Available,
            Some("creating" | "queued") => VolumeSnapshotState::Creating,
            Some("deleting") => VolumeSnapshotState::Deleting,
            Some("failed") => VolumeSnapshotState::Error,
            _ => VolumeSnapshotState::Unknown,
        };
        VolumeSnapshot {
            name: None,
            size_gb: snapshot.size,
            state,
            created_at: snapshot.created_at.as_deref().and_then(parse_timestamp),
            provider: PROVIDER.to_string(),
            extra: extra_from([(
                "volume_id",
                json!(snapshot.volume.as_ref().map(|v| href_id(&v.href))),
            )]),
            id: snapshot.id,
        }
    }

    fn convert_key_pair(key: SshKey) -> KeyPair {
        KeyPair {
            name: key.label,
            fingerprint: key.fingerprint,
            public_key: key.key,
            private_key: None,
            provider: PROVIDER.to_string(),
            extra: extra_from([("id", json!(key.id)), ("created_at", json!(key.created_at))]),
        }
    }

    /// Projects visible to the token.
    pub async fn ex_list_projects(&self) -> Result<Vec<EquinixProject>> {
        let projects: Vec<Project> = self
            .list_all("/projects", "projects", ErrorContext::resource(ResourceKind::Project))
            .await?;
        Ok(projects
            .into_iter()
            .map(|p| EquinixProject {
                created_at: p.created_at.as_deref().and_then(parse_timestamp),
                organization: p.organization.map(|o| href_id(&o.href).to_string()),
                id: p.id,
                name: p.name,
            })
            .collect())
    }

    /// Configured project, or every visible project.
    async fn project_ids(&self) -> Result<Vec<String>> {
        match &self.project_id {
            Some(id) => Ok(vec![id.clone()]),
            None => Ok(self
                .ex_list_projects()
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect()),
        }
    }

    /// Project for a create call: `ex.project_id`, then the configured one.
    fn target_project<'a>(&'a self, ex_project: Option<&'a str>) -> Result<&'a str> {
        ex_project
            .or(self.project_id.as_deref())
            .ok_or_else(|| DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "project_id".to_string(),
                detail: "set the project_id driver option or ex.project_id".to_string(),
            })
    }

    /// `item_key` list under `/projects/{id}/{collection}` for every project,
    /// fetched concurrently.
    async fn list_per_project<T>(
        &self,
        collection: &str,
        item_key: &str,
        resource: ResourceKind,
    ) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let projects = self.project_ids().await?;
        log::debug!("[{PROVIDER}] Listing {collection} in {} project(s)", projects.len());

        let per_project = try_join_all(projects.iter().map(|project| {
            let path = format!("/projects/{}/{collection}", urlencoding::encode(project));
            async move {
                self.list_all::<T>(&path, item_key, ErrorContext::resource(resource))
                    .await
            }
        }))
        .await?;
        Ok(per_project.into_iter().flatten().collect())
    }

    async fn device_action(&self, node_id: &str, action: &str) -> Result<()> {
        self.request_empty(
            Method::POST,
            &format!("{}/actions", device_path(node_id)),
            Some(&json!({ "type": action })),
            ErrorContext::with_id(ResourceKind::Node, node_id),
        )
        .await
    }

    async fn volume(&self, volume_id: &str) -> Result<MetalVolume> {
        self.request(
            Method::GET,
            &storage_path(volume_id),
            None,
            ErrorContext::with_id(ResourceKind::Volume, volume_id),
        )
        .await
    }

    /// Delete a snapshot; the API addresses snapshots through their volume.
    pub async fn ex_destroy_volume_snapshot(
        &self,
        volume_id: &str,
        snapshot_id: &str,
    ) -> Result<()> {
        self.request_empty(
            Method::DELETE,
            &format!(
                "{}/snapshots/{}",
                storage_path(volume_id),
                urlencoding::encode(snapshot_id)
            ),
            None,
            ErrorContext::with_id(ResourceKind::Snapshot, snapshot_id),
        )
        .await
    }
}

#[async_trait]
impl ComputeDriver for EquinixMetalNodeDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: PROVIDER.to_string(),
            name: "Equinix Metal".to_string(),
            kind: DriverKind::Compute,
            auth: AuthScheme::ApiToken,
            required_fields: vec![
                CredentialField::secret("apiToken", "API Token")
                    .help("Set the project_id driver option to scope calls to one project"),
            ],
            website: Some("https://deploy.equinix.com".to_string()),
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let devices: Vec<Device> = self
            .list_per_project("devices", "devices", ResourceKind::Node)
            .await?;
        Ok(devices.into_iter().map(Self::convert_node).collect())
    }

    async fn get_node(&self, node_id: &str) -> Result<Node> {
        let device: Device = self
            .request(
                Method::GET,
                &device_path(node_id),
                None,
                ErrorContext::with_id(ResourceKind::Node, node_id),
            )
            .await?;
        Ok(Self::convert_node(device))
    }

    /// `location_id` is a metro code. `ex` options: `project_id`,
    /// `billing_cycle` (default `hourly`), `user_data`, `tags`.
    async fn create_node(&self, req: &CreateNodeRequest) -> Result<Node> {
        let project = self.target_project(req.ex_str("project_id"))?;
        let body = device_body(req)?;
        let device: Device = self
            .request(
                Method::POST,
                &format!("/projects/{}/devices", urlencoding::encode(project)),
                Some(&body),
                ErrorContext::with_name(ResourceKind::Node, &req.name),
            )
            .await?;
        log::info!("[{PROVIDER}] Created device {} ({})", device.id, req.name);
        Ok(Self::convert_node(device))
    }

    async fn destroy_node(&self, node_id: &str) -> Result<()> {
        self.request_empty(
            Method::DELETE,
            &device_path(node_id),
            None,
            ErrorContext::with_id(ResourceKind::Node, node_id),
        )
        .await
    }

    async fn reboot_node(&self, node_id: &str) -> Result<()> {
        self.device_action(node_id, "reboot").await
    }

    async fn start_node(&self, node_id: &str) -> Result<()> {
        self.device_action(node_id, "power_on").await
    }

    async fn stop_node(&self, node_id: &str) -> Result<()> {
        self.device_action(node_id, "power_off").await
    }

    /// Operating systems, keyed by slug.
    async fn list_images(&self) -> Result<Vec<NodeImage>> {
        let systems: Vec<OperatingSystem> = self
            .list_all(
                "/operating-systems",
                "operating_systems",
                ErrorContext::resource(ResourceKind::Image),
            )
            .await?;
        Ok(systems.into_iter().map(Self::convert_image).collect())
    }

    /// Plans, keyed by slug.
    async fn list_sizes(&self) -> Result<Vec<NodeSize>> {
        let plans: Vec<Plan> = self
            .list_all("/plans", "plans", ErrorContext::resource(ResourceKind::Size))
            .await?;
        Ok(plans.into_iter().map(Self::convert_size).collect())
    }

    /// Metros, keyed by code.
    async fn list_locations(&self) -> Result<Vec<NodeLocation>> {
        let metros: Vec<Metro> = self
            .list_all(
                "/locations/metros",
                "metros",
                ErrorContext::resource(ResourceKind::Location),
            )
            .await?;
        Ok(metros.into_iter().map(Self::convert_location).collect())
    }

    async fn list_volumes(&self) -> Result<Vec<StorageVolume>> {
        let volumes: Vec<MetalVolume> = self
            .list_per_project("storage", "volumes", ResourceKind::Volume)
            .await?;
        Ok(volumes.into_iter().map(Self::convert_volume).collect())
    }

    /// `location_id` is a facility code. `ex` options: `project_id`, `plan`
    /// (default `storage_1`).
    async fn create_volume(&self, req: &CreateVolumeRequest) -> Result<StorageVolume> {
        let ex_str = |key: &str| req.ex.get(key).and_then(Value::as_str);
        let project = self.target_project(ex_str("project_id"))?;
        let Some(facility) = req.location_id.as_deref() else {
            return Err(DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "location_id".to_string(),
                detail: "a facility code is required".to_string(),
            });
        };

        let mut body = json!({
            "description": req.name,
            "size": req.size_gb,
            "plan": ex_str("plan").unwrap_or(DEFAULT_STORAGE_PLAN),
            "facility": facility,
        });
        if let Some(snapshot_id) = &req.snapshot_id {
            body["snapshot_id"] = json!(snapshot_id);
        }

        let volume: MetalVolume = self
            .request(
                Method::POST,
                &format!("/projects/{}/storage", urlencoding::encode(project)),
                Some(&body),
                ErrorContext::with_name(ResourceKind::Volume, &req.name),
            )
            .await?;
        Ok(Self::convert_volume(volume))
    }

    async fn destroy_volume(&self, volume_id: &str) -> Result<()> {
        self.request_empty(
            Method::DELETE,
            &storage_path(volume_id),
            None,
            ErrorContext::with_id(ResourceKind::Volume, volume_id),
        )
        .await
    }

    async fn attach_volume(
        &self,
        node_id: &str,
        volume_id: &str,
        _device: Option<&str>,
    ) -> Result<()> {
        self.request_empty(
            Method::POST,
            &format!("{}/attachments", storage_path(volume_id)),
            Some(&json!({ "device_id": node_id })),
            ErrorContext::with_id(ResourceKind::Volume, volume_id),
        )
        .await
    }

    /// Removes every attachment of the volume.
    async fn detach_volume(&self, volume_id: &str) -> Result<()> {
        let volume = self.volume(volume_id).await?;
        for attachment in &volume.attachments {
            self.request_empty(
                Method::DELETE,
                &format!("/storage/attachments/{}", urlencoding::encode(&attachment.id)),
                None,
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        }
        Ok(())
    }

    async fn list_volume_snapshots(&self, volume_id: &str) -> Result<Vec<VolumeSnapshot>> {
        let snapshots: Vec<StorageSnapshot> = self
            .list_all(
                &format!("{}/snapshots", storage_path(volume_id)),
                "snapshots",
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        Ok(snapshots.into_iter().map(Self::convert_snapshot).collect())
    }

    /// Snapshots cannot be named; `name` is ignored.
    async fn create_volume_snapshot(
        &self,
        volume_id: &str,
        _name: Option<&str>,
    ) -> Result<VolumeSnapshot> {
        let snapshot: StorageSnapshot = self
            .request(
                Method::POST,
                &format!("{}/snapshots", storage_path(volume_id)),
                None,
                ErrorContext::with_id(ResourceKind::Volume, volume_id),
            )
            .await?;
        Ok(Self::convert_snapshot(snapshot))
    }

    async fn list_key_pairs(&self) -> Result<Vec<KeyPair>> {
        let keys: Vec<SshKey> = self
            .list_all("/ssh-keys", "ssh_keys", ErrorContext::resource(ResourceKind::KeyPair))
            .await?;
        Ok(keys.into_iter().map(Self::convert_key_pair).collect())
    }

    async fn import_key_pair_from_string(&self, name: &str, public_key: &str) -> Result<KeyPair> {
        let key: SshKey = self
            .request(
                Method::POST,
                "/ssh-keys",
                Some(&json!({ "label": name, "key": public_key.trim() })),
                ErrorContext::with_name(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(key))
    }

    /// Keys are addressed by id; `name` is matched against the label.
    async fn delete_key_pair(&self, name: &str) -> Result<()> {
        let key = self.get_key_pair(name).await?;
        let Some(id) = key.extra.get("id").and_then(Value::as_str) else {
            return Err(DriverError::not_found(PROVIDER, ResourceKind::KeyPair, name));
        };
        self.request_empty(
            Method::DELETE,
            &format!("/ssh-keys/{}", urlencoding::encode(id)),
            None,
            ErrorContext::with_id(ResourceKind::KeyPair, name),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_device() {
        let device: Device = serde_json::from_value(json!({
            "id": "dev-1",
            "hostname": "worker-1",
            "state": "active",
            "created_at": "2024-05-01T08:00:00Z",
            "billing_cycle": "hourly",
            "plan": { "slug": "c3.small.x86" },
            "operating_system": { "slug": "ubuntu_22_04" },
            "metro": { "code": "da" },
            "project": { "href": "/metal/v1/projects/proj-1" },
            "ip_addresses": [
                { "address": "147.75.1.2", "public": true, "address_family": 4 },
                { "address": "2604:1380::1", "public": true, "address_family": 6 },
                { "address": "10.70.1.2", "public": false, "address_family": 4 }
            ]
        }))
        .unwrap();
        let node = EquinixMetalNodeDriver::convert_node(device);
        assert_eq!(node.state, NodeState::Running);
        assert_eq!(node.public_ips, vec!["147.75.1.2", "2604:1380::1"]);
        assert_eq!(node.private_ips, vec!["10.70.1.2"]);
        assert_eq!(node.size_id.as_deref(), Some("c3.small.x86"));
        assert_eq!(node.image_id.as_deref(), Some("ubuntu_22_04"));
        assert_eq!(node.location_id.as_deref(), Some("da"));
        assert_eq!(node.extra["project_id"], json!("proj-1"));
        assert_eq!(node.extra["ipv6"], json!(["2604:1380::1"]));
    }

    #[test]
    fn plan_to_size() {
        let plan: Plan = serde_json::from_value(json!({
            "id": "uuid-1",
            "slug": "m3.large.x86",
            "name": "m3.large.x86",
            "specs": {
                "cpus": [{ "count": 1, "type": "AMD EPYC 7502P" }],
                "memory": { "total": "256GB" },
                "drives": [{ "count": 2, "size": "3.8TB" }, { "count": 2, "size": "240GB" }]
            },
            "pricing": { "hour": 3.1 }
        }))
        .unwrap();
        let size = EquinixMetalNodeDriver::convert_size(plan);
        assert_eq!(size.ram_mb, 256 * 1024);
        assert_eq!(size.disk_gb, Some(2 * 3891 + 2 * 240));
        assert_eq!(size.vcpus, Some(1));
        assert_eq!(size.price, Some(3.1));
        assert_eq!(size.extra["cpu_type"], json!("AMD EPYC 7502P"));
    }

    #[test]
    fn gb_parsing() {
        assert_eq!(parse_gb("64GB"), Some(64));
        assert_eq!(parse_gb("1.92TB"), Some(1966));
        assert_eq!(parse_gb("12 gb"), Some(12));
        assert_eq!(parse_gb("fast"), None);
    }

    #[test]
    fn device_states() {
        assert_eq!(node_state("provisioning"), NodeState::Pending);
        assert_eq!(node_state("inactive"), NodeState::Stopped);
        assert_eq!(node_state("failed"), NodeState::Error);
        assert_eq!(node_state("new_state"), NodeState::Unknown);
    }

    #[test]
    fn body_requires_metro() {
        let req = CreateNodeRequest::new("web", "c3.small.x86", "ubuntu_22_04");
        assert!(matches!(
            device_body(&req),
            Err(DriverError::InvalidParameter { ref param, .. }) if param == "location_id"
        ));

        let body = device_body(&req.clone().with_location("da")).unwrap();
        assert_eq!(body["metro"], json!("da"));
        assert_eq!(body["billing_cycle"], json!("hourly"));
    }

    #[test]
    fn body_rejects_password() {
        let req = CreateNodeRequest::new("web", "c3.small.x86", "ubuntu_22_04")
            .with_location("da")
            .with_auth(NodeAuth::Password("pw".into()));
        assert!(matches!(
            device_body(&req),
            Err(DriverError::InvalidParameter { ref param, .. }) if param == "auth"
        ));
    }

    #[tokio::test]
    async fn create_without_project_is_rejected() {
        let d = EquinixMetalNodeDriver::builder("t")
            .endpoint("http://127.0.0.1:9")
            .build()
            .unwrap();
        let req = CreateNodeRequest::new("web", "c3.small.x86", "ubuntu_22_04").with_location("da");
        let err = d.create_node(&req).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidParameter { ref param, .. } if param == "project_id"));
    }

    #[test]
    fn attached_volume_is_in_use() {
        let volume: MetalVolume = serde_json::from_value(json!({
            "id": "vol-1",
            "size": 100,
            "state": "active",
            "attachments": [{ "id": "att-1", "device": { "href": "/metal/v1/devices/dev-1" } }]
        }))
        .unwrap();
        let converted = EquinixMetalNodeDriver::convert_volume(volume);
        assert_eq!(converted.state, StorageVolumeState::InUse);
        assert_eq!(converted.attached_to.as_deref(), Some("dev-1"));
        assert_eq!(converted.name, "vol-1");
    }
}
