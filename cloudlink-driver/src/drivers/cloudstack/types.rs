//! CloudStack API wire types
//!
//! Field names are the lower-case keys the API returns.

use serde::Deserialize;
use serde_json::Value;

/// Error body: `{"<command>response": {"errorcode": 431, "errortext": "..."}}`
#[derive(Debug, Deserialize)]
pub struct CloudStackErrorBody {
    #[serde(default)]
    pub errorcode: Option<u32>,
    #[serde(default)]
    pub cserrorcode: Option<u32>,
    #[serde(default)]
    pub errortext: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobRef {
    pub jobid: String,
}

#[derive(Debug, Deserialize)]
pub struct AsyncJobResult {
    pub jobstatus: u8,
    #[serde(default)]
    pub jobresult: Option<Value>,
    #[serde(default)]
    pub jobresultcode: Option<i64>,
}

/// Boolean acknowledgement, `success` may be a string or a bool.
#[derive(Debug, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub displaytext: Option<String>,
}

// ============ Virtual machines ============

#[derive(Debug, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub displayname: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zoneid: Option<String>,
    #[serde(default)]
    pub zonename: Option<String>,
    #[serde(default)]
    pub templateid: Option<String>,
    #[serde(default)]
    pub serviceofferingid: Option<String>,
    #[serde(default)]
    pub serviceofferingname: Option<String>,
    #[serde(default)]
    pub nic: Vec<VmNic>,
    #[serde(default)]
    pub publicip: Option<String>,
    #[serde(default)]
    pub keypair: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub hypervisor: Option<String>,
    #[serde(default)]
    pub cpunumber: Option<u32>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub securitygroup: Vec<SecurityGroupRef>,
}

#[derive(Debug, Deserialize)]
pub struct VmNic {
    #[serde(default)]
    pub ipaddress: Option<String>,
    #[serde(default)]
    pub ip6address: Option<String>,
    #[serde(default)]
    pub networkid: Option<String>,
    #[serde(default)]
    pub isdefault: bool,
}

#[derive(Debug, Deserialize)]
pub struct SecurityGroupRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub displaytext: Option<String>,
    #[serde(default)]
    pub ostypename: Option<String>,
    #[serde(default)]
    pub zoneid: Option<String>,
    #[serde(default)]
    pub hypervisor: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub isready: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub displaytext: Option<String>,
    #[serde(default)]
    pub cpunumber: Option<u32>,
    #[serde(default)]
    pub cpuspeed: Option<u32>,
    /// MB
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub storagetype: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CsZone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub networktype: Option<String>,
    #[serde(default)]
    pub allocationstate: Option<String>,
}

// ============ Storage ============

#[derive(Debug, Deserialize)]
pub struct CsVolume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Bytes
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub virtualmachineid: Option<String>,
    #[serde(default, rename = "type")]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub zoneid: Option<String>,
    #[serde(default)]
    pub deviceid: Option<u32>,
    #[serde(default)]
    pub diskofferingid: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiskOffering {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub iscustomized: bool,
}

#[derive(Debug, Deserialize)]
pub struct CsSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub volumeid: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub intervaltype: Option<String>,
    /// Bytes
    #[serde(default)]
    pub virtualsize: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SshKeyPair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub privatekey: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeyPairResponse {
    pub keypair: SshKeyPair,
}

// ============ Networking ============

#[derive(Debug, Deserialize)]
pub struct CsNetwork {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub displaytext: Option<String>,
    #[serde(default)]
    pub zoneid: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default, rename = "type")]
    pub network_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublicIpAddress {
    pub id: String,
    pub ipaddress: String,
    #[serde(default)]
    pub zoneid: Option<String>,
    #[serde(default)]
    pub virtualmachineid: Option<String>,
    #[serde(default)]
    pub issourcenat: bool,
    #[serde(default)]
    pub isstaticnat: bool,
    #[serde(default)]
    pub associatednetworkid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoadBalancerRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub publicip: Option<String>,
    #[serde(default)]
    pub publicipid: Option<String>,
    /// Ports are strings in responses.
    #[serde(default)]
    pub publicport: Option<String>,
    #[serde(default)]
    pub privateport: Option<String>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zoneid: Option<String>,
    #[serde(default)]
    pub networkid: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
