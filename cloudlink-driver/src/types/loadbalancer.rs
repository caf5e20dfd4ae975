use serde::{Deserialize, Serialize};

use super::Extra;

/// State of a load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalancerState {
    Running,
    Pending,
    Unknown,
    Error,
    Deleted,
}

/// Balancing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    RoundRobin,
    LeastConnections,
    Random,
    WeightedRoundRobin,
    WeightedLeastConnections,
    SourceIp,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::LeastConnections => "least_connections",
            Self::Random => "random",
            Self::WeightedRoundRobin => "weighted_round_robin",
            Self::WeightedLeastConnections => "weighted_least_connections",
            Self::SourceIp => "source_ip",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A load balancer (rule, listener or virtual server, depending on provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    pub state: BalancerState,
    /// Public address the balancer listens on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Public port.
    pub port: u16,
    pub provider: String,
    pub extra: Extra,
}

/// A backend attached to a load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Provider id of the backend (often the node id).
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Backend port.
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancer_id: Option<String>,
    pub extra: Extra,
}

impl Member {
    pub fn new(id: impl Into<String>, ip: Option<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            ip,
            port,
            balancer_id: None,
            extra: Extra::new(),
        }
    }
}

/// Parameters for [`LoadBalancerDriver::create_balancer`](crate::LoadBalancerDriver::create_balancer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBalancerRequest {
    pub name: String,
    /// Public port.
    pub port: u16,
    /// Protocol, one of [`LoadBalancerDriver::list_protocols`](crate::LoadBalancerDriver::list_protocols).
    pub protocol: String,
    pub algorithm: Algorithm,
    /// Initial backends; the first member's port is used as the private port.
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub ex: Extra,
}
