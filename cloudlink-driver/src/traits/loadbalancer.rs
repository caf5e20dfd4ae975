use async_trait::async_trait;

use crate::error::{DriverError, ResourceKind, Result};
use crate::types::{Algorithm, CreateBalancerRequest, DriverMetadata, LoadBalancer, Member, Node};

/// Load balancer driver contract.
#[async_trait]
pub trait LoadBalancerDriver: Send + Sync {
    /// Registry id of the provider.
    fn id(&self) -> &'static str;

    fn metadata() -> DriverMetadata
    where
        Self: Sized;

    /// Protocols accepted by [`create_balancer`](Self::create_balancer).
    fn list_protocols(&self) -> Vec<String>;

    fn list_supported_algorithms(&self) -> Vec<Algorithm>;

    async fn list_balancers(&self) -> Result<Vec<LoadBalancer>>;

    /// Default: scan [`list_balancers`](Self::list_balancers).
    async fn get_balancer(&self, balancer_id: &str) -> Result<LoadBalancer> {
        self.list_balancers()
            .await?
            .into_iter()
            .find(|b| b.id == balancer_id)
            .ok_or_else(|| DriverError::not_found(self.id(), ResourceKind::Balancer, balancer_id))
    }

    async fn create_balancer(&self, req: &CreateBalancerRequest) -> Result<LoadBalancer> {
        let _ = req;
        Err(DriverError::not_supported(self.id(), "create_balancer"))
    }

    async fn destroy_balancer(&self, balancer_id: &str) -> Result<()> {
        let _ = balancer_id;
        Err(DriverError::not_supported(self.id(), "destroy_balancer"))
    }

    async fn balancer_list_members(&self, balancer_id: &str) -> Result<Vec<Member>> {
        let _ = balancer_id;
        Err(DriverError::not_supported(self.id(), "balancer_list_members"))
    }

    async fn balancer_attach_member(&self, balancer_id: &str, member: &Member) -> Result<Member> {
        let _ = (balancer_id, member);
        Err(DriverError::not_supported(self.id(), "balancer_attach_member"))
    }

    async fn balancer_detach_member(&self, balancer_id: &str, member: &Member) -> Result<()> {
        let _ = (balancer_id, member);
        Err(DriverError::not_supported(self.id(), "balancer_detach_member"))
    }

    /// Attach a compute node, using its first public IP and the balancer's port.
    async fn balancer_attach_compute_node(&self, balancer_id: &str, node: &Node) -> Result<Member> {
        let balancer = self.get_balancer(balancer_id).await?;
        let member = Member::new(
            node.id.clone(),
            node.public_ips.first().cloned(),
            balancer.port,
        );
        self.balancer_attach_member(balancer_id, &member).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::types::{AuthScheme, BalancerState, DriverKind, Extra, NodeState};

    #[derive(Default)]
    struct FakeLb {
        attached: Mutex<Vec<Member>>,
    }

    #[async_trait]
    impl LoadBalancerDriver for FakeLb {
        fn id(&self) -> &'static str {
            "fake"
        }

        fn metadata() -> DriverMetadata {
            DriverMetadata {
                id: "fake".into(),
                name: "Fake".into(),
                kind: DriverKind::LoadBalancer,
                auth: AuthScheme::ApiToken,
                required_fields: vec![],
                website: None,
            }
        }

        fn list_protocols(&self) -> Vec<String> {
            vec!["tcp".into()]
        }

        fn list_supported_algorithms(&self) -> Vec<Algorithm> {
            vec![Algorithm::RoundRobin]
        }

        async fn list_balancers(&self) -> Result<Vec<LoadBalancer>> {
            Ok(vec![LoadBalancer {
                id: "lb-1".into(),
                name: "web".into(),
                state: BalancerState::Running,
                ip: Some("198.51.100.7".into()),
                port: 443,
                provider: "fake".into(),
                extra: Extra::new(),
            }])
        }

        async fn balancer_attach_member(&self, balancer_id: &str, member: &Member) -> Result<Member> {
            let mut m = member.clone();
            m.balancer_id = Some(balancer_id.to_string());
            self.attached.lock().unwrap().push(m.clone());
            Ok(m)
        }
    }

    fn node(ips: Vec<String>) -> Node {
        Node {
            id: "vm-9".into(),
            name: "app".into(),
            state: NodeState::Running,
            public_ips: ips,
            private_ips: vec!["10.0.0.9".into()],
            size_id: None,
            image_id: None,
            location_id: None,
            created_at: None,
            provider: "fake".into(),
            extra: Extra::new(),
        }
    }

    #[tokio::test]
    async fn attach_compute_node_uses_balancer_port() {
        let lb = FakeLb::default();
        let member = lb
            .balancer_attach_compute_node("lb-1", &node(vec!["203.0.113.9".into()]))
            .await
            .unwrap();
        assert_eq!(member.id, "vm-9");
        assert_eq!(member.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(member.port, 443);
        assert_eq!(member.balancer_id.as_deref(), Some("lb-1"));
        assert_eq!(lb.attached.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn attach_compute_node_unknown_balancer() {
        let lb = FakeLb::default();
        let err = lb
            .balancer_attach_compute_node("lb-404", &node(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DriverError::NotFound {
                resource: ResourceKind::Balancer,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unimplemented_ops_not_supported() {
        let lb = FakeLb::default();
        assert!(matches!(
            lb.destroy_balancer("lb-1").await,
            Err(DriverError::NotSupported { .. })
        ));
        assert!(matches!(
            lb.balancer_list_members("lb-1").await,
            Err(DriverError::NotSupported { .. })
        ));
    }
}
