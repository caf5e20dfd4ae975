//! OpenStack `ComputeDriver` implementation
//!
//! Block storage lives in Cinder, a separate service, so the volume and
//! snapshot operations keep their `NotSupported` defaults.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use serde_json::{Map, Value, json};

use crate::drivers::common::is_private_address;
use crate::error::{ResourceKind, Result};
use crate::pagination::{Page, collect_pages};
use crate::traits::{ComputeDriver, ErrorContext};
use crate::types::{
    AuthScheme, CreateNodeRequest, CredentialField, DriverKind, DriverMetadata, KeyPair, Node,
    NodeAuth, NodeImage, NodeLocation, NodeSize, NodeState, extra_from,
};
use crate::utils::datetime::parse_timestamp;

use super::http::{next_marker, with_marker};
use super::types::{
    AvailabilityZoneList, CreatedServerResponse, Flavor, FlavorList, FlavorResponse, Image,
    ImageList, ImageResponse, Keypair, KeypairList, KeypairResponse, MetadataResponse, Server,
    ServerList, ServerResponse,
};
use super::{OpenStackNodeDriver, PROVIDER};

fn node_state(status: &str) -> NodeState {
    match status {
        "ACTIVE" => NodeState::Running,
        "BUILD" | "REBUILD" => NodeState::Pending,
        "REBOOT" | "HARD_REBOOT" => NodeState::Rebooting,
        "DELETED" | "SOFT_DELETED" => NodeState::Terminated,
        "SHUTOFF" | "SHELVED" | "SHELVED_OFFLOADED" => NodeState::Stopped,
        "SUSPENDED" => NodeState::Suspended,
        "PAUSED" => NodeState::Paused,
        "MIGRATING" | "RESIZE" | "VERIFY_RESIZE" | "REVERT_RESIZE" => NodeState::Migrating,
        "ERROR" => NodeState::Error,
        _ => NodeState::Unknown,
    }
}

fn server_path(node_id: &str) -> String {
    format!("/servers/{}", urlencoding::encode(node_id))
}

fn keypair_path(name: &str) -> String {
    format!("/os-keypairs/{}", urlencoding::encode(name))
}

/// `POST /servers` body.
fn server_body(req: &CreateNodeRequest) -> Value {
    let mut server = Map::new();
    server.insert("name".into(), json!(req.name));
    server.insert("imageRef".into(), json!(req.image_id));
    server.insert("flavorRef".into(), json!(req.size_id));

    match &req.auth {
        Some(NodeAuth::SshKey(key_name)) => {
            server.insert("key_name".into(), json!(key_name));
        }
        Some(NodeAuth::Password(password)) => {
            server.insert("adminPass".into(), json!(password));
        }
        None => {}
    }
    if let Some(zone) = &req.location_id {
        server.insert("availability_zone".into(), json!(zone));
    }
    if let Some(networks) = req.ex.get("networks").and_then(Value::as_array) {
        let networks: Vec<Value> = networks
            .iter()
            .filter_map(Value::as_str)
            .map(|uuid| json!({ "uuid": uuid }))
            .collect();
        server.insert("networks".into(), Value::Array(networks));
    }
    if let Some(groups) = req.ex.get("security_groups").and_then(Value::as_array) {
        let groups: Vec<Value> = groups
            .iter()
            .filter_map(Value::as_str)
            .map(|name| json!({ "name": name }))
            .collect();
        server.insert("security_groups".into(), Value::Array(groups));
    }
    if let Some(user_data) = req.ex_str("user_data") {
        server.insert("user_data".into(), json!(BASE64.encode(user_data)));
    }
    if let Some(metadata) = req.ex.get("metadata").filter(|m| m.is_object()) {
        server.insert("metadata".into(), metadata.clone());
    }
    if let Some(config_drive) = req.ex.get("config_drive").and_then(Value::as_bool) {
        server.insert("config_drive".into(), json!(config_drive));
    }

    json!({ "server": server })
}

impl OpenStackNodeDriver {
    pub(crate) fn convert_node(server: Server) -> Node {
        let mut public_ips = Vec::new();
        let mut private_ips = Vec::new();
        let mut addresses = Map::new();

        for (network, entries) in &server.addresses {
            for entry in entries {
                let public = match entry.ip_type.as_deref() {
                    Some("floating") => true,
                    _ => !is_private_address(&entry.addr),
                };
                let bucket = if public { &mut public_ips } else { &mut private_ips };
                if !bucket.contains(&entry.addr) {
                    bucket.push(entry.addr.clone());
                }
            }
            let listed: Vec<Value> = entries
                .iter()
                .map(|e| json!({ "addr": e.addr, "version": e.version, "type": e.ip_type }))
                .collect();
            addresses.insert(network.clone(), Value::Array(listed));
        }
        if let Some(ip) = server.access_ipv4.filter(|ip| !ip.is_empty())
            && !public_ips.contains(&ip)
        {
            public_ips.push(ip);
        }

        let image_id = server
            .image
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);

        Node {
            state: node_state(&server.status),
            public_ips,
            private_ips,
            size_id: server.flavor.and_then(|f| f.id),
            image_id,
            location_id: server.availability_zone,
            created_at: server.created.as_deref().and_then(parse_timestamp),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("status", json!(server.status)),
                ("task_state", json!(server.task_state)),
                ("key_name", json!(server.key_name)),
                ("tenant_id", json!(server.tenant_id)),
                ("metadata", json!(server.metadata)),
                ("addresses", Value::Object(addresses)),
            ]),
            id: server.id,
            name: server.name,
        }
    }

    fn convert_image(image: Image) -> NodeImage {
        NodeImage {
            extra: extra_from([
                ("status", json!(image.status)),
                ("min_disk", json!(image.min_disk)),
                ("min_ram", json!(image.min_ram)),
                ("created", json!(image.created)),
                ("metadata", json!(image.metadata)),
            ]),
            id: image.id,
            name: image.name,
            provider: PROVIDER.to_string(),
        }
    }

    fn convert_size(flavor: Flavor) -> NodeSize {
        NodeSize {
            ram_mb: flavor.ram,
            disk_gb: Some(flavor.disk),
            vcpus: Some(flavor.vcpus),
            bandwidth: None,
            price: None,
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("is_public", json!(flavor.is_public)),
                ("ephemeral_gb", json!(flavor.ephemeral)),
                ("rxtx_factor", json!(flavor.rxtx_factor)),
            ]),
            id: flavor.id,
            name: flavor.name,
        }
    }

    fn convert_key_pair(keypair: Keypair) -> KeyPair {
        KeyPair {
            name: keypair.name,
            fingerprint: keypair.fingerprint,
            public_key: keypair.public_key,
            private_key: keypair.private_key,
            provider: PROVIDER.to_string(),
            extra: extra_from([("type", json!(keypair.key_type))]),
        }
    }

    async fn server_action(&self, node_id: &str, action: Value) -> Result<()> {
        self.request_empty(
            Method::POST,
            &format!("{}/action", server_path(node_id)),
            Some(&action),
            ErrorContext::with_id(ResourceKind::Node, node_id),
        )
        .await
    }

    /// Power-cycle the server instead of asking the guest to reboot.
    pub async fn ex_hard_reboot_node(&self, node_id: &str) -> Result<()> {
        self.server_action(node_id, json!({ "reboot": { "type": "HARD" } }))
            .await
    }

    /// Merge `metadata` into the server's metadata and return the result.
    pub async fn ex_set_metadata(
        &self,
        node_id: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let resp: MetadataResponse = self
            .request(
                Method::POST,
                &format!("{}/metadata", server_path(node_id)),
                Some(&json!({ "metadata": metadata })),
                ErrorContext::with_id(ResourceKind::Node, node_id),
            )
            .await?;
        Ok(resp.metadata)
    }

    /// One flavor by id.
    pub async fn ex_get_size(&self, size_id: &str) -> Result<NodeSize> {
        let resp: FlavorResponse = self
            .request(
                Method::GET,
                &format!("/flavors/{}", urlencoding::encode(size_id)),
                None,
                ErrorContext::with_id(ResourceKind::Size, size_id),
            )
            .await?;
        Ok(Self::convert_size(resp.flavor))
    }
}

#[async_trait]
impl ComputeDriver for OpenStackNodeDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: PROVIDER.to_string(),
            name: "OpenStack".to_string(),
            kind: DriverKind::Compute,
            auth: AuthScheme::Password,
            required_fields: vec![
                CredentialField::text("username", "Username"),
                CredentialField::secret("password", "Password")
                    .help("The Keystone URL must be set as the endpoint"),
                CredentialField::text("project", "Project").optional(),
                CredentialField::text("domain", "Domain")
                    .optional()
                    .help("Defaults to \"Default\""),
            ],
            website: Some("https://www.openstack.org".to_string()),
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let servers = collect_pages(PROVIDER, None, |marker: Option<String>| async move {
            let path = with_marker("/servers/detail", marker.as_deref());
            let page: ServerList = self
                .request(Method::GET, &path, None, ErrorContext::resource(ResourceKind::Node))
                .await?;
            Ok(Page::new(page.servers, next_marker(&page.servers_links)))
        })
        .await?;
        Ok(servers.into_iter().map(Self::convert_node).collect())
    }

    async fn get_node(&self, node_id: &str) -> Result<Node> {
        let resp: ServerResponse = self
            .request(
                Method::GET,
                &server_path(node_id),
                None,
                ErrorContext::with_id(ResourceKind::Node, node_id),
            )
            .await?;
        Ok(Self::convert_node(resp.server))
    }

    /// `ex` options: `networks` (ids), `security_groups` (names), `user_data`,
    /// `metadata` (object), `config_drive` (bool).
    async fn create_node(&self, req: &CreateNodeRequest) -> Result<Node> {
        let created: CreatedServerResponse = self
            .request(
                Method::POST,
                "/servers",
                Some(&server_body(req)),
                ErrorContext::with_name(ResourceKind::Node, &req.name),
            )
            .await?;
        log::info!("[{PROVIDER}] Created server {} ({})", created.server.id, req.name);

        let mut node = self.get_node(&created.server.id).await?;
        if let Some(password) = created.server.admin_pass {
            node.extra.insert("password".to_string(), json!(password));
        }
        Ok(node)
    }

    async fn destroy_node(&self, node_id: &str) -> Result<()> {
        self.request_empty(
            Method::DELETE,
            &server_path(node_id),
            None,
            ErrorContext::with_id(ResourceKind::Node, node_id),
        )
        .await
    }

    async fn reboot_node(&self, node_id: &str) -> Result<()> {
        self.server_action(node_id, json!({ "reboot": { "type": "SOFT" } }))
            .await
    }

    async fn start_node(&self, node_id: &str) -> Result<()> {
        self.server_action(node_id, json!({ "os-start": null })).await
    }

    async fn stop_node(&self, node_id: &str) -> Result<()> {
        self.server_action(node_id, json!({ "os-stop": null })).await
    }

    async fn list_images(&self) -> Result<Vec<NodeImage>> {
        let images = collect_pages(PROVIDER, None, |marker: Option<String>| async move {
            let path = with_marker("/images/detail", marker.as_deref());
            let page: ImageList = self
                .request(Method::GET, &path, None, ErrorContext::resource(ResourceKind::Image))
                .await?;
            Ok(Page::new(page.images, next_marker(&page.images_links)))
        })
        .await?;
        Ok(images.into_iter().map(Self::convert_image).collect())
    }

    async fn get_image(&self, image_id: &str) -> Result<NodeImage> {
        let resp: ImageResponse = self
            .request(
                Method::GET,
                &format!("/images/{}", urlencoding::encode(image_id)),
                None,
                ErrorContext::with_id(ResourceKind::Image, image_id),
            )
            .await?;
        Ok(Self::convert_image(resp.image))
    }

    async fn list_sizes(&self) -> Result<Vec<NodeSize>> {
        let flavors = collect_pages(PROVIDER, None, |marker: Option<String>| async move {
            let path = with_marker("/flavors/detail", marker.as_deref());
            let page: FlavorList = self
                .request(Method::GET, &path, None, ErrorContext::resource(ResourceKind::Size))
                .await?;
            Ok(Page::new(page.flavors, next_marker(&page.flavors_links)))
        })
        .await?;
        Ok(flavors.into_iter().map(Self::convert_size).collect())
    }

    /// Availability zones.
    async fn list_locations(&self) -> Result<Vec<NodeLocation>> {
        let resp: AvailabilityZoneList = self
            .request(
                Method::GET,
                "/os-availability-zone",
                None,
                ErrorContext::resource(ResourceKind::Location),
            )
            .await?;
        Ok(resp
            .zones
            .into_iter()
            .map(|zone| NodeLocation {
                extra: extra_from([
                    ("available", json!(zone.state.map(|s| s.available))),
                    ("region", json!(self.region)),
                ]),
                id: zone.name.clone(),
                name: zone.name,
                country: None,
                provider: PROVIDER.to_string(),
            })
            .collect())
    }

    async fn list_key_pairs(&self) -> Result<Vec<KeyPair>> {
        let resp: KeypairList = self
            .request(
                Method::GET,
                "/os-keypairs",
                None,
                ErrorContext::resource(ResourceKind::KeyPair),
            )
            .await?;
        Ok(resp
            .keypairs
            .into_iter()
            .map(|w| Self::convert_key_pair(w.keypair))
            .collect())
    }

    async fn get_key_pair(&self, name: &str) -> Result<KeyPair> {
        let resp: KeypairResponse = self
            .request(
                Method::GET,
                &keypair_path(name),
                None,
                ErrorContext::with_id(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(resp.keypair))
    }

    async fn create_key_pair(&self, name: &str) -> Result<KeyPair> {
        let resp: KeypairResponse = self
            .request(
                Method::POST,
                "/os-keypairs",
                Some(&json!({ "keypair": { "name": name } })),
                ErrorContext::with_name(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(resp.keypair))
    }

    async fn import_key_pair_from_string(&self, name: &str, public_key: &str) -> Result<KeyPair> {
        let resp: KeypairResponse = self
            .request(
                Method::POST,
                "/os-keypairs",
                Some(&json!({ "keypair": { "name": name, "public_key": public_key.trim() } })),
                ErrorContext::with_name(ResourceKind::KeyPair, name),
            )
            .await?;
        Ok(Self::convert_key_pair(resp.keypair))
    }

    async fn delete_key_pair(&self, name: &str) -> Result<()> {
        self.request_empty(
            Method::DELETE,
            &keypair_path(name),
            None,
            ErrorContext::with_id(ResourceKind::KeyPair, name),
        )
        .await
    }
}
