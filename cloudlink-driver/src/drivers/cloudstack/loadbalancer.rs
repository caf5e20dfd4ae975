//! CloudStack `LoadBalancerDriver` implementation
//!
//! A balancer is a load balancer rule bound to a public IP. Members are VMs.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{DriverError, ResourceKind, Result};
use crate::traits::{ErrorContext, LoadBalancerDriver};
use crate::types::{
    Algorithm, AuthScheme, BalancerState, CreateBalancerRequest, CredentialField, DriverKind,
    DriverMetadata, LoadBalancer, Member, extra_from,
};

use super::types::{LoadBalancerRule, VirtualMachine};
use super::{CloudStackLbDriver, PROVIDER, Params, params};

const PROTOCOLS: &[&str] = &["tcp", "udp"];

/// Written into the rule description when the driver allocated the rule's
/// public IP. Only such IPs are released with the balancer.
const ALLOCATED_IP_MARKER: &str = "cloudlink:allocated-ip";

fn algorithm_to_value(algorithm: Algorithm) -> Option<&'static str> {
    match algorithm {
        Algorithm::RoundRobin => Some("roundrobin"),
        Algorithm::LeastConnections => Some("leastconn"),
        Algorithm::SourceIp => Some("source"),
        _ => None,
    }
}

fn value_to_algorithm(value: &str) -> Option<Algorithm> {
    match value {
        "roundrobin" => Some(Algorithm::RoundRobin),
        "leastconn" => Some(Algorithm::LeastConnections),
        "source" => Some(Algorithm::SourceIp),
        _ => None,
    }
}

fn balancer_state(state: Option<&str>) -> BalancerState {
    match state {
        Some("Active") => BalancerState::Running,
        Some("Add") => BalancerState::Pending,
        Some("Revoke") => BalancerState::Deleted,
        _ => BalancerState::Unknown,
    }
}

fn parse_port(port: Option<&str>) -> u16 {
    port.and_then(|p| p.trim().parse().ok()).unwrap_or_default()
}

fn owns_public_ip(rule: &LoadBalancerRule) -> bool {
    rule.description
        .as_deref()
        .is_some_and(|d| d.contains(ALLOCATED_IP_MARKER))
}

/// Rule description: the caller's text, plus the marker when the IP is ours.
fn rule_description(described: Option<&str>, allocated: bool) -> Option<String> {
    match (described, allocated) {
        (Some(text), true) => Some(format!("{text} {ALLOCATED_IP_MARKER}")),
        (None, true) => Some(ALLOCATED_IP_MARKER.to_string()),
        (Some(text), false) => Some(text.to_string()),
        (None, false) => None,
    }
}

impl CloudStackLbDriver {
    pub(crate) fn convert_balancer(rule: LoadBalancerRule) -> LoadBalancer {
        LoadBalancer {
            state: balancer_state(rule.state.as_deref()),
            port: parse_port(rule.publicport.as_deref()),
            extra: extra_from([
                ("private_port", json!(parse_port(rule.privateport.as_deref()))),
                ("algorithm", json!(rule.algorithm.as_deref().and_then(value_to_algorithm))),
                ("public_ip_id", json!(rule.publicipid)),
                ("zone_id", json!(rule.zoneid)),
                ("network_id", json!(rule.networkid)),
                ("protocol", json!(rule.protocol)),
                ("owns_public_ip", json!(owns_public_ip(&rule))),
                ("description", json!(rule.description)),
            ]),
            id: rule.id,
            name: rule.name,
            ip: rule.publicip,
            provider: PROVIDER.to_string(),
        }
    }

    async fn rule(&self, balancer_id: &str) -> Result<LoadBalancerRule> {
        let rules: Vec<LoadBalancerRule> = self
            .conn
            .list_all(
                "listLoadBalancerRules",
                &params([("id", balancer_id)]),
                "loadbalancerrule",
                ErrorContext::with_id(ResourceKind::Balancer, balancer_id),
            )
            .await?;
        rules
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::not_found(PROVIDER, ResourceKind::Balancer, balancer_id))
    }

    async fn assign(&self, command: &str, balancer_id: &str, vm_ids: &[&str]) -> Result<()> {
        self.conn
            .async_request(
                command,
                &params([("id", balancer_id), ("virtualmachineids", &vm_ids.join(","))]),
                ErrorContext::with_id(ResourceKind::Balancer, balancer_id),
            )
            .await?;
        Ok(())
    }

    async fn delete_rule(&self, balancer_id: &str) -> Result<()> {
        self.conn
            .async_request(
                "deleteLoadBalancerRule",
                &params([("id", balancer_id)]),
                ErrorContext::with_id(ResourceKind::Balancer, balancer_id),
            )
            .await?;
        Ok(())
    }

    /// Best-effort release once the rule is gone; failures are only logged.
    async fn release_allocated_ip(&self, ip_id: &str) {
        if let Err(e) = self.conn.release_public_ip(ip_id).await {
            log::warn!("[{PROVIDER}] Failed to release public IP {ip_id}: {e}");
        }
    }

    /// Undo a half-created balancer: the rule (if any), then the IP we allocated.
    async fn roll_back(&self, rule_id: Option<&str>, allocated_ip: Option<&str>) {
        if let Some(rule_id) = rule_id
            && let Err(e) = self.delete_rule(rule_id).await
        {
            log::warn!("[{PROVIDER}] Failed to delete load balancer rule {rule_id}: {e}");
        }
        if let Some(ip_id) = allocated_ip {
            self.release_allocated_ip(ip_id).await;
        }
    }
}

#[async_trait]
impl LoadBalancerDriver for CloudStackLbDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: PROVIDER.to_string(),
            name: "CloudStack".to_string(),
            kind: DriverKind::LoadBalancer,
            auth: AuthScheme::AccessKey,
            required_fields: vec![
                CredentialField::text("accessKeyId", "API Key"),
                CredentialField::secret("secretAccessKey", "Secret Key")
                    .help("The API URL must be set as the endpoint"),
            ],
            website: Some("https://cloudstack.apache.org".to_string()),
        }
    }

    fn list_protocols(&self) -> Vec<String> {
        PROTOCOLS.iter().map(|p| (*p).to_string()).collect()
    }

    fn list_supported_algorithms(&self) -> Vec<Algorithm> {
        vec![
            Algorithm::RoundRobin,
            Algorithm::LeastConnections,
            Algorithm::SourceIp,
        ]
    }

    async fn list_balancers(&self) -> Result<Vec<LoadBalancer>> {
        let rules: Vec<LoadBalancerRule> = self
            .conn
            .list_all(
                "listLoadBalancerRules",
                &Params::new(),
                "loadbalancerrule",
                ErrorContext::resource(ResourceKind::Balancer),
            )
            .await?;
        Ok(rules.into_iter().map(Self::convert_balancer).collect())
    }

    async fn get_balancer(&self, balancer_id: &str) -> Result<LoadBalancer> {
        self.rule(balancer_id).await.map(Self::convert_balancer)
    }

    /// `ex.public_ip_id` reuses an address; otherwise one is allocated in
    /// `ex.zone_id` (default: first zone) and `ex.network_id`.
    async fn create_balancer(&self, req: &CreateBalancerRequest) -> Result<LoadBalancer> {
        let Some(algorithm) = algorithm_to_value(req.algorithm) else {
            return Err(DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "algorithm".to_string(),
                detail: format!("{} is not supported", req.algorithm),
            });
        };
        let protocol = req.protocol.to_lowercase();
        if !PROTOCOLS.contains(&protocol.as_str()) {
            return Err(DriverError::InvalidParameter {
                provider: PROVIDER.to_string(),
                param: "protocol".to_string(),
                detail: format!("{} is not supported", req.protocol),
            });
        }

        let ex_str = |key: &str| req.ex.get(key).and_then(Value::as_str);
        let (public_ip_id, allocated) = match ex_str("public_ip_id") {
            Some(id) => (id.to_string(), false),
            None => {
                let zone_id = self.conn.zone_or_default(ex_str("zone_id")).await?;
                let address = self
                    .conn
                    .allocate_public_ip(&zone_id, ex_str("network_id"))
                    .await?;
                (address.id, true)
            }
        };
        let allocated_ip = allocated.then_some(public_ip_id.as_str());

        let private_port = req
            .ex
            .get("private_port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
            .or_else(|| req.members.first().map(|m| m.port))
            .unwrap_or(req.port);

        let mut rule_params = params([
            ("name", req.name.as_str()),
            ("algorithm", algorithm),
            ("publicipid", public_ip_id.as_str()),
            ("publicport", &req.port.to_string()),
            ("privateport", &private_port.to_string()),
            ("protocol", protocol.as_str()),
        ]);
        if let Some(description) = rule_description(ex_str("description"), allocated) {
            rule_params.insert("description".to_string(), description);
        }

        let rule: LoadBalancerRule = match self
            .conn
            .async_request_as(
                "createLoadBalancerRule",
                &rule_params,
                "loadbalancer",
                ErrorContext::with_name(ResourceKind::Balancer, &req.name),
            )
            .await
        {
            Ok(rule) => rule,
            Err(e) => {
                self.roll_back(None, allocated_ip).await;
                return Err(e);
            }
        };
        log::info!("[{PROVIDER}] Created load balancer rule {} ({})", rule.id, req.name);

        if !req.members.is_empty() {
            let ids: Vec<&str> = req.members.iter().map(|m| m.id.as_str()).collect();
            if let Err(e) = self.assign("assignToLoadBalancerRule", &rule.id, &ids).await {
                self.roll_back(Some(rule.id.as_str()), allocated_ip).await;
                return Err(e);
            }
        }

        Ok(Self::convert_balancer(rule))
    }

    /// Deletes the rule, then releases its public IP if `create_balancer`
    /// allocated it. A failed release is logged, not returned.
    async fn destroy_balancer(&self, balancer_id: &str) -> Result<()> {
        let rule = self.rule(balancer_id).await?;
        self.delete_rule(balancer_id).await?;
        if owns_public_ip(&rule)
            && let Some(ip_id) = rule.publicipid.as_deref()
        {
            self.release_allocated_ip(ip_id).await;
        }
        Ok(())
    }

    async fn balancer_list_members(&self, balancer_id: &str) -> Result<Vec<Member>> {
        let rule = self.rule(balancer_id).await?;
        let private_port = parse_port(rule.privateport.as_deref());

        let vms: Vec<VirtualMachine> = self
            .conn
            .list_all(
                "listLoadBalancerRuleInstances",
                &params([("id", balancer_id)]),
                "loadbalancerruleinstance",
                ErrorContext::with_id(ResourceKind::Balancer, balancer_id),
            )
            .await?;

        Ok(vms
            .into_iter()
            .map(|vm| {
                let ip = vm
                    .nic
                    .iter()
                    .find(|n| n.isdefault)
                    .or_else(|| vm.nic.first())
                    .and_then(|n| n.ipaddress.clone());
                Member {
                    extra: extra_from([("name", json!(vm.displayname.or(vm.name)))]),
                    id: vm.id,
                    ip,
                    port: private_port,
                    balancer_id: Some(balancer_id.to_string()),
                }
            })
            .collect())
    }

    async fn balancer_attach_member(&self, balancer_id: &str, member: &Member) -> Result<Member> {
        self.assign("assignToLoadBalancerRule", balancer_id, &[member.id.as_str()])
            .await?;
        Ok(Member {
            balancer_id: Some(balancer_id.to_string()),
            ..member.clone()
        })
    }

    async fn balancer_detach_member(&self, balancer_id: &str, member: &Member) -> Result<()> {
        self.assign("removeFromLoadBalancerRule", balancer_id, &[member.id.as_str()])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_rule() {
        let rule: LoadBalancerRule = serde_json::from_value(json!({
            "id": "lb-1",
            "name": "web",
            "publicip": "185.19.28.10",
            "publicipid": "ip-1",
            "publicport": "80",
            "privateport": "8080",
            "algorithm": "leastconn",
            "state": "Active",
            "zoneid": "zone-1"
        }))
        .unwrap();
        let lb = CloudStackLbDriver::convert_balancer(rule);
        assert_eq!(lb.port, 80);
        assert_eq!(lb.state, BalancerState::Running);
        assert_eq!(lb.ip.as_deref(), Some("185.19.28.10"));
        assert_eq!(lb.extra["private_port"], json!(8080));
        assert_eq!(lb.extra["algorithm"], json!("least_connections"));
        assert_eq!(lb.extra["public_ip_id"], json!("ip-1"));
    }

    #[test]
    fn algorithm_table_round_trips() {
        for algorithm in [
            Algorithm::RoundRobin,
            Algorithm::LeastConnections,
            Algorithm::SourceIp,
        ] {
            let value = algorithm_to_value(algorithm).unwrap();
            assert_eq!(value_to_algorithm(value), Some(algorithm));
        }
        assert_eq!(algorithm_to_value(Algorithm::Random), None);
    }

    #[test]
    fn allocated_ip_marker_in_description() {
        assert_eq!(rule_description(None, false), None);
        assert_eq!(rule_description(Some("web"), false).as_deref(), Some("web"));
        let marked = rule_description(Some("web"), true);
        assert_eq!(marked.as_deref(), Some("web cloudlink:allocated-ip"));

        let mut rule: LoadBalancerRule =
            serde_json::from_value(json!({ "id": "lb-1", "name": "web" })).unwrap();
        assert!(!owns_public_ip(&rule));
        rule.description = marked;
        assert!(owns_public_ip(&rule));
    }

    #[test]
    fn states_and_ports() {
        assert_eq!(balancer_state(Some("Add")), BalancerState::Pending);
        assert_eq!(balancer_state(Some("Revoke")), BalancerState::Deleted);
        assert_eq!(balancer_state(None), BalancerState::Unknown);
        assert_eq!(parse_port(Some(" 443 ")), 443);
        assert_eq!(parse_port(Some("http")), 0);
    }

    #[tokio::test]
    async fn unsupported_algorithm_is_rejected() {
        let driver =
            CloudStackLbDriver::new("AK", "SK", "http://127.0.0.1:9/client/api").unwrap();
        let req = CreateBalancerRequest {
            name: "web".into(),
            port: 80,
            protocol: "tcp".into(),
            algorithm: Algorithm::WeightedRoundRobin,
            members: vec![],
            ex: Default::default(),
        };
        let err = driver.create_balancer(&req).await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidParameter { ref param, .. } if param == "algorithm"));
    }
}
