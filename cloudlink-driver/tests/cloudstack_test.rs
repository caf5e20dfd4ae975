//! CloudStack compute and load balancer drivers against a mock API server
//!
//! ```bash
//! cargo test -p cloudlink-driver --test cloudstack_test
//! ```

#![cfg(feature = "cloudstack")]

mod common;

use cloudlink_driver::{
    Algorithm, BalancerState, ComputeDriver, ComputeProvider, CreateBalancerRequest,
    CreateNodeRequest, Credentials, DriverConfig, DriverError, Extra, LoadBalancerDriver,
    LoadBalancerProvider, Member, NodeAuth, NodeState, get_compute_driver,
    get_loadbalancer_driver,
};
use common::fixture;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockBuilder, MockServer, Request, ResponseTemplate};

const API_PATH: &str = "/client/api";

/// Matches requests carrying a non-empty `signature` query parameter.
struct Signed;

impl Match for Signed {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(k, v)| k == "signature" && !v.is_empty())
    }
}

fn config(server: &MockServer) -> DriverConfig {
    DriverConfig::builder()
        .endpoint(format!("{}{API_PATH}", server.uri()))
        .option("job_poll_interval_ms", "10")
        .option("job_timeout_secs", "5")
        .build()
}

async fn compute(server: &MockServer) -> Option<Arc<dyn ComputeDriver>> {
    get_compute_driver(ComputeProvider::CloudStack)
        .and_then(|f| f.connect(Credentials::access_key("AKTEST", "SKTEST"), config(server)))
        .ok()
}

fn balancers(server: &MockServer) -> Option<Arc<dyn LoadBalancerDriver>> {
    get_loadbalancer_driver(LoadBalancerProvider::CloudStack)
        .and_then(|f| f.connect(Credentials::access_key("AKTEST", "SKTEST"), config(server)))
        .ok()
}

fn command(name: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("command", name))
        .and(query_param("apiKey", "AKTEST"))
        .and(query_param("response", "json"))
        .and(Signed)
}

#[tokio::test]
async fn test_cloudstack_create_node_polls_async_job() {
    let server = MockServer::start().await;

    command("deployVirtualMachine")
        .and(query_param("serviceofferingid", "so-small"))
        .and(query_param("templateid", "tpl-ubuntu"))
        .and(query_param("zoneid", "zone-1"))
        .and(query_param("keypair", "deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("cloudstack", "deploy_job")))
        .expect(1)
        .mount(&server)
        .await;

    // Pending twice, then done
    command("queryAsyncJobResult")
        .and(query_param("jobid", "job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("cloudstack", "job_pending")))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    command("queryAsyncJobResult")
        .and(query_param("jobid", "job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("cloudstack", "job_done")))
        .expect(1)
        .mount(&server)
        .await;

    let driver = require_some!(compute(&server).await);
    let request = CreateNodeRequest::new("web-1", "so-small", "tpl-ubuntu")
        .with_location("zone-1")
        .with_auth(NodeAuth::SshKey("deploy".to_string()));
    let node = require_ok!(driver.create_node(&request).await);

    assert_eq!(node.id, "vm-42");
    assert_eq!(node.state, NodeState::Running);
    assert_eq!(node.private_ips, vec!["10.1.1.5"]);
    assert_eq!(node.public_ips, vec!["185.19.28.4"]);
    assert_eq!(node.extra["password"], json!("Xy7pLm2Q"));
    assert_eq!(node.extra["default_network_id"], json!("net-1"));
}

#[tokio::test]
async fn test_cloudstack_failed_job_surfaces_job_error() {
    let server = MockServer::start().await;

    command("deployVirtualMachine")
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("cloudstack", "deploy_job")))
        .mount(&server)
        .await;
    command("queryAsyncJobResult")
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("cloudstack", "job_failed")))
        .mount(&server)
        .await;

    let driver = require_some!(compute(&server).await);
    let request = CreateNodeRequest::new("web-1", "so-small", "tpl-ubuntu").with_location("zone-1");
    let err = driver.create_node(&request).await.unwrap_err();

    match err {
        DriverError::JobFailed { job_id, detail, .. } => {
            assert_eq!(job_id, "job-7");
            assert!(detail.contains("Insufficient capacity"), "detail: {detail}");
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cloudstack_bad_signature_is_invalid_credentials() {
    let server = MockServer::start().await;

    command("listVirtualMachines")
        .respond_with(ResponseTemplate::new(401).set_body_json(fixture("cloudstack", "list_vms_error")))
        .mount(&server)
        .await;

    let driver = require_some!(compute(&server).await);
    let err = driver.list_nodes().await.unwrap_err();

    assert!(matches!(err, DriverError::InvalidCredentials { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_cloudstack_empty_list_is_empty_object() {
    let server = MockServer::start().await;

    command("listVirtualMachines")
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "listvirtualmachinesresponse": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let driver = require_some!(compute(&server).await);
    let nodes = require_ok!(driver.list_nodes().await);
    assert!(nodes.is_empty());
}

#[tokio::test]
async fn test_cloudstack_list_balancers() {
    let server = MockServer::start().await;

    command("listLoadBalancerRules")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "listloadbalancerrulesresponse": {
                "count": 1,
                "loadbalancerrule": [{
                    "id": "lb-1",
                    "name": "frontend",
                    "publicip": "185.19.28.100",
                    "publicipid": "ip-1",
                    "publicport": "80",
                    "privateport": "8080",
                    "algorithm": "roundrobin",
                    "state": "Active",
                    "zoneid": "zone-1",
                    "protocol": "tcp"
                }]
            }
        })))
        .mount(&server)
        .await;

    let driver = require_some!(balancers(&server));
    let balancers = require_ok!(driver.list_balancers().await);

    assert_eq!(balancers.len(), 1);
    let lb = &balancers[0];
    assert_eq!(lb.id, "lb-1");
    assert_eq!(lb.state, BalancerState::Running);
    assert_eq!(lb.port, 80);
    assert_eq!(lb.ip.as_deref(), Some("185.19.28.100"));
    assert_eq!(lb.extra["private_port"], json!(8080));
    assert_eq!(lb.extra["public_ip_id"], json!("ip-1"));
}

// ============ Load balancer lifecycle ============

/// Response of an async command that started `job_id`.
fn job_started(command: &str, job_id: &str) -> ResponseTemplate {
    let mut body = serde_json::Map::new();
    body.insert(
        format!("{}response", command.to_lowercase()),
        json!({ "jobid": job_id }),
    );
    ResponseTemplate::new(200).set_body_json(Value::Object(body))
}

/// Mounts a `queryAsyncJobResult` answer for `job_id`.
async fn mount_job(server: &MockServer, job_id: &str, status: u8, result: Value) {
    command("queryAsyncJobResult")
        .and(query_param("jobid", job_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "queryasyncjobresultresponse": {
                "jobid": job_id,
                "jobstatus": status,
                "jobresult": result
            }
        })))
        .mount(server)
        .await;
}

fn rule_json(public_ip_id: &str, description: Option<&str>) -> Value {
    json!({
        "id": "lb-1",
        "name": "frontend",
        "publicip": "185.19.28.9",
        "publicipid": public_ip_id,
        "publicport": "80",
        "privateport": "8080",
        "algorithm": "roundrobin",
        "state": "Active",
        "zoneid": "zone-1",
        "protocol": "tcp",
        "description": description
    })
}

async fn mount_rule_lookup(server: &MockServer, rule: Value) {
    command("listLoadBalancerRules")
        .and(query_param("id", "lb-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "listloadbalancerrulesresponse": { "count": 1, "loadbalancerrule": [rule] }
        })))
        .mount(server)
        .await;
}

async fn mount_allocation(server: &MockServer) {
    command("associateIpAddress")
        .and(query_param("zoneid", "zone-1"))
        .respond_with(job_started("associateIpAddress", "job-ip"))
        .expect(1)
        .mount(server)
        .await;
    mount_job(
        server,
        "job-ip",
        1,
        json!({ "ipaddress": { "id": "ip-9", "ipaddress": "185.19.28.9", "zoneid": "zone-1" } }),
    )
    .await;
}

fn balancer_request(members: Vec<Member>, ex: Extra) -> CreateBalancerRequest {
    CreateBalancerRequest {
        name: "frontend".to_string(),
        port: 80,
        protocol: "tcp".to_string(),
        algorithm: Algorithm::RoundRobin,
        members,
        ex,
    }
}

fn zone_ex() -> Extra {
    Extra::from([("zone_id".to_string(), json!("zone-1"))])
}

#[tokio::test]
async fn test_cloudstack_balancer_lifecycle_releases_allocated_ip() {
    let server = MockServer::start().await;
    mount_allocation(&server).await;

    command("createLoadBalancerRule")
        .and(query_param("publicipid", "ip-9"))
        .and(query_param("publicport", "80"))
        .and(query_param("privateport", "8080"))
        .and(query_param("algorithm", "roundrobin"))
        .and(query_param("description", "cloudlink:allocated-ip"))
        .respond_with(job_started("createLoadBalancerRule", "job-lb"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(
        &server,
        "job-lb",
        1,
        json!({ "loadbalancer": rule_json("ip-9", Some("cloudlink:allocated-ip")) }),
    )
    .await;

    command("assignToLoadBalancerRule")
        .and(query_param("id", "lb-1"))
        .and(query_param("virtualmachineids", "vm-1,vm-2"))
        .respond_with(job_started("assignToLoadBalancerRule", "job-assign"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-assign", 1, json!({ "success": true })).await;

    let driver = require_some!(balancers(&server));
    let members = vec![
        Member::new("vm-1", Some("10.1.1.5".to_string()), 8080),
        Member::new("vm-2", Some("10.1.1.6".to_string()), 8080),
    ];
    let lb = require_ok!(driver.create_balancer(&balancer_request(members, zone_ex())).await);

    assert_eq!(lb.id, "lb-1");
    assert_eq!(lb.state, BalancerState::Running);
    assert_eq!(lb.extra["owns_public_ip"], json!(true));

    // Tear down: rule first, then the address the driver allocated
    mount_rule_lookup(&server, rule_json("ip-9", Some("cloudlink:allocated-ip"))).await;
    command("deleteLoadBalancerRule")
        .and(query_param("id", "lb-1"))
        .respond_with(job_started("deleteLoadBalancerRule", "job-del"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-del", 1, json!({ "success": true })).await;
    command("disassociateIpAddress")
        .and(query_param("id", "ip-9"))
        .respond_with(job_started("disassociateIpAddress", "job-rel"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-rel", 1, json!({ "success": true })).await;

    require_ok!(driver.destroy_balancer("lb-1").await);
}

#[tokio::test]
async fn test_cloudstack_balancer_keeps_caller_supplied_ip() {
    let server = MockServer::start().await;

    command("associateIpAddress")
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    command("createLoadBalancerRule")
        .and(query_param("publicipid", "my-ip"))
        .respond_with(job_started("createLoadBalancerRule", "job-lb"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-lb", 1, json!({ "loadbalancer": rule_json("my-ip", None) })).await;

    let driver = require_some!(balancers(&server));
    let ex = Extra::from([("public_ip_id".to_string(), json!("my-ip"))]);
    let lb = require_ok!(driver.create_balancer(&balancer_request(vec![], ex)).await);
    assert_eq!(lb.extra["owns_public_ip"], json!(false));

    mount_rule_lookup(&server, rule_json("my-ip", None)).await;
    command("deleteLoadBalancerRule")
        .and(query_param("id", "lb-1"))
        .respond_with(job_started("deleteLoadBalancerRule", "job-del"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-del", 1, json!({ "success": true })).await;
    command("disassociateIpAddress")
        .respond_with(job_started("disassociateIpAddress", "job-rel"))
        .expect(0)
        .mount(&server)
        .await;

    require_ok!(driver.destroy_balancer("lb-1").await);
}

#[tokio::test]
async fn test_cloudstack_failed_rule_releases_allocated_ip() {
    let server = MockServer::start().await;
    mount_allocation(&server).await;

    command("createLoadBalancerRule")
        .respond_with(ResponseTemplate::new(431).set_body_json(json!({
            "createloadbalancerruleresponse": {
                "errorcode": 431,
                "cserrorcode": 4350,
                "errortext": "port in use"
            }
        })))
        .mount(&server)
        .await;
    command("disassociateIpAddress")
        .and(query_param("id", "ip-9"))
        .respond_with(job_started("disassociateIpAddress", "job-rel"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-rel", 1, json!({ "success": true })).await;

    let driver = require_some!(balancers(&server));
    let err = driver
        .create_balancer(&balancer_request(vec![], zone_ex()))
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::InvalidParameter { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_cloudstack_failed_assign_rolls_back_rule_and_ip() {
    let server = MockServer::start().await;
    mount_allocation(&server).await;

    command("createLoadBalancerRule")
        .respond_with(job_started("createLoadBalancerRule", "job-lb"))
        .mount(&server)
        .await;
    mount_job(
        &server,
        "job-lb",
        1,
        json!({ "loadbalancer": rule_json("ip-9", Some("cloudlink:allocated-ip")) }),
    )
    .await;
    command("assignToLoadBalancerRule")
        .respond_with(job_started("assignToLoadBalancerRule", "job-assign"))
        .mount(&server)
        .await;
    mount_job(
        &server,
        "job-assign",
        2,
        json!({ "errorcode": 530, "errortext": "VM vm-1 is not in the network" }),
    )
    .await;

    command("deleteLoadBalancerRule")
        .and(query_param("id", "lb-1"))
        .respond_with(job_started("deleteLoadBalancerRule", "job-del"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-del", 1, json!({ "success": true })).await;
    command("disassociateIpAddress")
        .and(query_param("id", "ip-9"))
        .respond_with(job_started("disassociateIpAddress", "job-rel"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-rel", 1, json!({ "success": true })).await;

    let driver = require_some!(balancers(&server));
    let members = vec![Member::new("vm-1", None, 8080)];
    let err = driver
        .create_balancer(&balancer_request(members, zone_ex()))
        .await
        .unwrap_err();

    match err {
        DriverError::JobFailed { job_id, detail, .. } => {
            assert_eq!(job_id, "job-assign");
            assert!(detail.contains("not in the network"), "detail: {detail}");
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cloudstack_destroy_succeeds_when_release_fails() {
    let server = MockServer::start().await;

    mount_rule_lookup(&server, rule_json("ip-9", Some("cloudlink:allocated-ip"))).await;
    command("deleteLoadBalancerRule")
        .respond_with(job_started("deleteLoadBalancerRule", "job-del"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-del", 1, json!({ "success": true })).await;
    command("disassociateIpAddress")
        .respond_with(ResponseTemplate::new(530).set_body_json(json!({
            "disassociateipaddressresponse": { "errorcode": 530, "errortext": "Internal error" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let driver = require_some!(balancers(&server));
    require_ok!(driver.destroy_balancer("lb-1").await);
}

#[tokio::test]
async fn test_cloudstack_attach_and_detach_member() {
    let server = MockServer::start().await;

    command("assignToLoadBalancerRule")
        .and(query_param("id", "lb-1"))
        .and(query_param("virtualmachineids", "vm-3"))
        .respond_with(job_started("assignToLoadBalancerRule", "job-assign"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-assign", 1, json!({ "success": true })).await;
    command("removeFromLoadBalancerRule")
        .and(query_param("id", "lb-1"))
        .and(query_param("virtualmachineids", "vm-3"))
        .respond_with(job_started("removeFromLoadBalancerRule", "job-remove"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, "job-remove", 1, json!({ "success": true })).await;

    let driver = require_some!(balancers(&server));
    let member = Member::new("vm-3", Some("10.1.1.7".to_string()), 8080);

    let attached = require_ok!(driver.balancer_attach_member("lb-1", &member).await);
    assert_eq!(attached.balancer_id.as_deref(), Some("lb-1"));
    assert_eq!(attached.id, "vm-3");

    require_ok!(driver.balancer_detach_member("lb-1", &attached).await);
}
