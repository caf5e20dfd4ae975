//! Outscale driver against a mock API server
//!
//! ```bash
//! cargo test -p cloudlink-driver --test outscale_test
//! ```

#![cfg(feature = "outscale")]

mod common;

use cloudlink_driver::{
    ComputeDriver, ComputeProvider, Credentials, DriverError, NodeState, ResourceKind,
    get_compute_driver,
};
use common::{config_for, fixture};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, header_exists, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connect(server: &MockServer) -> Option<Arc<dyn ComputeDriver>> {
    get_compute_driver(ComputeProvider::Outscale)
        .and_then(|f| f.connect(Credentials::access_key("AKTEST", "SKTEST"), config_for(server)))
        .ok()
}

#[tokio::test]
async fn test_outscale_list_nodes_signed_and_paged() {
    let server = MockServer::start().await;

    // Second page first: wiremock picks the first mounted match
    Mock::given(method("POST"))
        .and(path("/api/v1/ReadVms"))
        .and(body_partial_json(json!({ "NextPageToken": "tok-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("outscale", "read_vms_page2")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ReadVms"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(header_exists("x-osc-date"))
        .and(header_regex(
            "authorization",
            r"^OSC4-HMAC-SHA256 Credential=AKTEST/\d{8}/eu-west-2/api/osc4_request, SignedHeaders=content-type;host;x-osc-date, Signature=[0-9a-f]{64}$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("outscale", "read_vms_page1")))
        .expect(1)
        .mount(&server)
        .await;

    let driver = require_some!(connect(&server).await);
    let nodes = require_ok!(driver.list_nodes().await);

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].id, "i-0a1b2c3d");
    assert_eq!(nodes[0].name, "web-1");
    assert_eq!(nodes[0].state, NodeState::Running);
    assert_eq!(nodes[0].public_ips, vec!["171.33.64.10"]);
    assert_eq!(nodes[0].size_id.as_deref(), Some("tinav5.c2r4p2"));
    assert_eq!(nodes[0].location_id.as_deref(), Some("eu-west-2a"));
    assert_eq!(nodes[0].extra["keypair_name"], json!("deploy"));

    // No Name tag: the VM id stands in
    assert_eq!(nodes[1].name, "i-4e5f6a7b");
    assert_eq!(nodes[1].state, NodeState::Stopped);
    assert!(nodes[1].public_ips.is_empty());
}

#[tokio::test]
async fn test_outscale_invalid_resource_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/DeleteVms"))
        .and(body_partial_json(json!({ "VmIds": ["i-deadbeef"] })))
        .respond_with(ResponseTemplate::new(400).set_body_json(fixture("outscale", "invalid_resource")))
        .mount(&server)
        .await;

    let driver = require_some!(connect(&server).await);
    let err = driver.destroy_node("i-deadbeef").await.unwrap_err();

    assert!(
        matches!(
            err,
            DriverError::NotFound { resource: ResourceKind::Node, ref id, .. } if id == "i-deadbeef"
        ),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_outscale_unauthorized_is_invalid_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ReadVms"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "Errors": [{ "Type": "AccessDenied", "Code": "1", "Details": "Authentication failed" }]
        })))
        .mount(&server)
        .await;

    let driver = require_some!(connect(&server).await);
    let err = driver.list_nodes().await.unwrap_err();

    assert!(matches!(err, DriverError::InvalidCredentials { .. }), "unexpected error: {err:?}");
    assert!(err.is_expected());
}

#[tokio::test]
async fn test_outscale_transient_errors_are_not_retried_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/ReadVms"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let driver = require_some!(connect(&server).await);
    let err = driver.list_nodes().await.unwrap_err();

    assert!(matches!(err, DriverError::NetworkError { .. }), "unexpected error: {err:?}");
    assert!(err.is_retryable());
}
