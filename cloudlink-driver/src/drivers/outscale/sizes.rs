//! Outscale VM types
//!
//! OAPI has no sizing endpoint with RAM and core counts per type, so the
//! catalogue is static. Type names follow `tinav{gen}.c{cores}r{ram}p{perf}`.

use serde_json::json;

use crate::types::{NodeSize, extra_from};

use super::PROVIDER;

/// `(vm type, vCPUs, RAM in GiB)`
const VM_TYPES: &[(&str, u32, u64)] = &[
    ("tinav5.c1r1p2", 1, 1),
    ("tinav5.c1r2p2", 1, 2),
    ("tinav5.c2r2p2", 2, 2),
    ("tinav5.c2r4p2", 2, 4),
    ("tinav5.c2r8p2", 2, 8),
    ("tinav5.c4r4p2", 4, 4),
    ("tinav5.c4r8p2", 4, 8),
    ("tinav5.c4r16p2", 4, 16),
    ("tinav5.c8r16p2", 8, 16),
    ("tinav5.c8r32p2", 8, 32),
    ("tinav5.c16r32p2", 16, 32),
    ("tinav5.c16r64p2", 16, 64),
    ("tinav6.c2r4p2", 2, 4),
    ("tinav6.c4r8p2", 4, 8),
    ("tinav6.c8r16p2", 8, 16),
];

/// Performance flavour encoded by the trailing `p{n}`.
fn performance(vm_type: &str) -> Option<&'static str> {
    match vm_type.rsplit_once('p').map(|(_, p)| p) {
        Some("1") => Some("highest"),
        Some("2") => Some("high"),
        Some("3") => Some("medium"),
        _ => None,
    }
}

pub(crate) fn catalogue() -> Vec<NodeSize> {
    VM_TYPES
        .iter()
        .map(|&(id, vcpus, ram_gb)| NodeSize {
            id: id.to_string(),
            name: id.to_string(),
            ram_mb: ram_gb * 1024,
            // Block storage only; the root volume is sized per VM
            disk_gb: None,
            vcpus: Some(vcpus),
            bandwidth: None,
            price: None,
            provider: PROVIDER.to_string(),
            extra: extra_from([("performance", json!(performance(id)))]),
        })
        .collect()
}
