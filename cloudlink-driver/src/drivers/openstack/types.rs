//! Keystone and Nova wire types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============ Keystone ============

#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct AuthBody<'a> {
    pub identity: Identity<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Identity<'a> {
    pub methods: [&'a str; 1],
    pub password: PasswordMethod<'a>,
}

#[derive(Debug, Serialize)]
pub struct PasswordMethod<'a> {
    pub user: UserRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct UserRef<'a> {
    pub name: &'a str,
    pub domain: NamedRef<'a>,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Scope<'a> {
    pub project: ProjectRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct ProjectRef<'a> {
    pub name: &'a str,
    pub domain: NamedRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct NamedRef<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub expires_at: String,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

/// Keystone error body: `{"error": {"code": 401, "title": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct KeystoneErrorResponse {
    pub error: KeystoneError,
}

#[derive(Debug, Deserialize)]
pub struct KeystoneError {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ============ Nova ============

/// Nova faults are wrapped in a single key naming the fault, e.g.
/// `{"itemNotFound": {"code": 404, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct NovaFault {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerList {
    pub servers: Vec<Server>,
    #[serde(default)]
    pub servers_links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub struct ServerResponse {
    pub server: Server,
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
    #[serde(default)]
    pub flavor: Option<IdRef>,
    /// `""` for servers booted from a volume.
    #[serde(default)]
    pub image: Value,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default, rename = "OS-EXT-AZ:availability_zone")]
    pub availability_zone: Option<String>,
    #[serde(default, rename = "OS-EXT-STS:task_state")]
    pub task_state: Option<String>,
    #[serde(default, rename = "accessIPv4")]
    pub access_ipv4: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServerAddress {
    pub addr: String,
    #[serde(default)]
    pub version: Option<u8>,
    /// `fixed` or `floating`
    #[serde(default, rename = "OS-EXT-IPS:type")]
    pub ip_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// Reply to `POST /servers`: only the id and, without a key pair, the password.
#[derive(Debug, Deserialize)]
pub struct CreatedServerResponse {
    pub server: CreatedServer,
}

#[derive(Debug, Deserialize)]
pub struct CreatedServer {
    pub id: String,
    #[serde(default, rename = "adminPass")]
    pub admin_pass: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FlavorList {
    pub flavors: Vec<Flavor>,
    #[serde(default)]
    pub flavors_links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    /// MiB
    pub ram: u64,
    /// GiB
    #[serde(default)]
    pub disk: u64,
    #[serde(default)]
    pub vcpus: u32,
    #[serde(default, rename = "os-flavor-access:is_public")]
    pub is_public: Option<bool>,
    #[serde(default, rename = "OS-FLV-EXT-DATA:ephemeral")]
    pub ephemeral: Option<u64>,
    #[serde(default)]
    pub rxtx_factor: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ImageList {
    pub images: Vec<Image>,
    #[serde(default)]
    pub images_links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "minDisk")]
    pub min_disk: Option<u64>,
    #[serde(default, rename = "minRam")]
    pub min_ram: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityZoneList {
    #[serde(rename = "availabilityZoneInfo")]
    pub zones: Vec<AvailabilityZone>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityZone {
    #[serde(rename = "zoneName")]
    pub name: String,
    #[serde(default, rename = "zoneState")]
    pub state: Option<ZoneState>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneState {
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct KeypairList {
    pub keypairs: Vec<KeypairWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct KeypairWrapper {
    pub keypair: Keypair,
}

#[derive(Debug, Deserialize)]
pub struct Keypair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageResponse {
    pub image: Image,
}

#[derive(Debug, Deserialize)]
pub struct FlavorResponse {
    pub flavor: Flavor,
}

#[derive(Debug, Deserialize)]
pub struct KeypairResponse {
    pub keypair: Keypair,
}

#[derive(Debug, Deserialize)]
pub struct MetadataResponse {
    pub metadata: BTreeMap<String, String>,
}
