//! Equinix Metal driver against a mock API server
//!
//! ```bash
//! cargo test -p cloudlink-driver --test equinixmetal_test
//! ```

#![cfg(feature = "equinixmetal")]

mod common;

use cloudlink_driver::{
    ComputeDriver, ComputeProvider, CreateNodeRequest, Credentials, DriverConfig, DriverError,
    EquinixMetalNodeDriver, NodeAuth, NodeState, get_compute_driver,
};
use common::{config_for, fixture, fixture_with};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connect(config: DriverConfig) -> Option<Arc<dyn ComputeDriver>> {
    get_compute_driver(ComputeProvider::EquinixMetal)
        .and_then(|f| f.connect(Credentials::api_token("metal-token"), config))
        .ok()
}

async fn mount_devices(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/projects/proj-a/devices"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("equinixmetal", "devices_a_page2")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/proj-a/devices"))
        .and(header("X-Auth-Token", "metal-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture_with(
            "equinixmetal",
            "devices_a_page1",
            &[("{NEXT_HREF}", "/projects/proj-a/devices?page=2&per_page=100")],
        )))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/proj-b/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("equinixmetal", "devices_b")))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_equinix_list_nodes_fans_out_over_projects() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("equinixmetal", "projects")))
        .expect(1)
        .mount(&server)
        .await;
    mount_devices(&server).await;

    let driver = require_some!(connect(config_for(&server)));
    let mut nodes = require_ok!(driver.list_nodes().await);
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["dev-a1", "dev-a2", "dev-b1"]);

    assert_eq!(nodes[0].state, NodeState::Running);
    assert_eq!(nodes[0].public_ips, vec!["147.75.10.1"]);
    assert_eq!(nodes[0].private_ips, vec!["10.70.10.1"]);
    assert_eq!(nodes[0].extra["project_id"], json!("proj-a"));
    assert_eq!(nodes[1].state, NodeState::Pending);
    assert_eq!(nodes[2].state, NodeState::Stopped);
    // No metro: the facility code stands in
    assert_eq!(nodes[2].location_id.as_deref(), Some("am6"));
}

#[tokio::test]
async fn test_equinix_configured_project_skips_fan_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/proj-b/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("equinixmetal", "devices_b")))
        .expect(1)
        .mount(&server)
        .await;

    let config = DriverConfig::builder()
        .endpoint(server.uri())
        .option("project_id", "proj-b")
        .build();
    let driver = require_some!(connect(config));
    let nodes = require_ok!(driver.list_nodes().await);

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, "prod-1");
}

#[tokio::test]
async fn test_equinix_create_node() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/projects/proj-b/devices"))
        .and(body_partial_json(json!({
            "hostname": "web-1",
            "plan": "c3.small.x86",
            "operating_system": "ubuntu_22_04",
            "metro": "da",
            "billing_cycle": "hourly",
            "user_ssh_keys": ["key-1"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "dev-new",
            "hostname": "web-1",
            "state": "queued",
            "plan": { "slug": "c3.small.x86" },
            "metro": { "code": "da" },
            "ip_addresses": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = DriverConfig::builder()
        .endpoint(server.uri())
        .option("project_id", "proj-b")
        .build();
    let driver = require_some!(connect(config));
    let request = CreateNodeRequest::new("web-1", "c3.small.x86", "ubuntu_22_04")
        .with_location("da")
        .with_auth(NodeAuth::SshKey("key-1".to_string()));
    let node = require_ok!(driver.create_node(&request).await);

    assert_eq!(node.id, "dev-new");
    assert_eq!(node.state, NodeState::Pending);
}

#[tokio::test]
async fn test_equinix_duplicate_key_label() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ssh-keys"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "errors": ["Key has already been taken"] })),
        )
        .mount(&server)
        .await;

    let driver = require_some!(connect(config_for(&server)));
    let err = driver
        .import_key_pair_from_string("deploy", "ssh-ed25519 AAAAC3Nza deploy@host")
        .await
        .unwrap_err();

    assert!(
        matches!(err, DriverError::AlreadyExists { ref name, .. } if name == "deploy"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_equinix_list_projects_extension() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("equinixmetal", "projects")))
        .mount(&server)
        .await;

    let driver = require_some!(
        EquinixMetalNodeDriver::builder("metal-token")
            .endpoint(server.uri())
            .build()
            .ok()
    );
    let projects = require_ok!(driver.ex_list_projects().await);

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[1].name, "production");
    assert_eq!(projects[1].organization.as_deref(), Some("org-1"));
    assert!(projects[0].created_at.is_some());
}
