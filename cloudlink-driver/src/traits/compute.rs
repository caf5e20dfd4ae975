use async_trait::async_trait;

use crate::error::{DriverError, ResourceKind, Result};
use crate::types::{
    CreateNodeRequest, CreateVolumeRequest, DriverMetadata, KeyPair, Node, NodeImage,
    NodeLocation, NodeSize, NodeState, StorageVolume, VolumeSnapshot, WaitOptions,
};

/// Compute (node) driver contract.
///
/// Every operation except [`id`](Self::id) and [`list_nodes`](Self::list_nodes)
/// has a default body returning [`DriverError::NotSupported`], so a driver only
/// implements what its provider offers. Provider-specific extensions are
/// inherent `ex_*` methods on the concrete driver type.
#[async_trait]
pub trait ComputeDriver: Send + Sync {
    /// Registry id of the provider (e.g. `"outscale"`).
    fn id(&self) -> &'static str;

    /// Static metadata for this driver type.
    ///
    /// Does not need an instance, so it can be called before connecting.
    fn metadata() -> DriverMetadata
    where
        Self: Sized;

    // ============ Nodes ============

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    /// Look up one node. Default: scan [`list_nodes`](Self::list_nodes).
    async fn get_node(&self, node_id: &str) -> Result<Node> {
        self.list_nodes()
            .await?
            .into_iter()
            .find(|n| n.id == node_id)
            .ok_or_else(|| DriverError::not_found(self.id(), ResourceKind::Node, node_id))
    }

    async fn create_node(&self, req: &CreateNodeRequest) -> Result<Node> {
        let _ = req;
        Err(DriverError::not_supported(self.id(), "create_node"))
    }

    async fn destroy_node(&self, node_id: &str) -> Result<()> {
        let _ = node_id;
        Err(DriverError::not_supported(self.id(), "destroy_node"))
    }

    async fn reboot_node(&self, node_id: &str) -> Result<()> {
        let _ = node_id;
        Err(DriverError::not_supported(self.id(), "reboot_node"))
    }

    async fn start_node(&self, node_id: &str) -> Result<()> {
        let _ = node_id;
        Err(DriverError::not_supported(self.id(), "start_node"))
    }

    async fn stop_node(&self, node_id: &str) -> Result<()> {
        let _ = node_id;
        Err(DriverError::not_supported(self.id(), "stop_node"))
    }

    /// Poll [`list_nodes`](Self::list_nodes) until every node in `node_ids` is
    /// running (and, if requested, has a public IP).
    ///
    /// Returns the final state of those nodes, in listing order. Fails with
    /// [`DriverError::Timeout`] when `opts.timeout` elapses first.
    async fn wait_until_running(&self, node_ids: &[String], opts: WaitOptions) -> Result<Vec<Node>> {
        let deadline = tokio::time::Instant::now() + opts.timeout;

        loop {
            let nodes: Vec<Node> = self
                .list_nodes()
                .await?
                .into_iter()
                .filter(|n| node_ids.contains(&n.id))
                .collect();

            let all_present = node_ids.iter().all(|id| nodes.iter().any(|n| &n.id == id));
            let all_ready = nodes.iter().all(|n| {
                n.state == NodeState::Running && (!opts.require_public_ip || !n.public_ips.is_empty())
            });
            if all_present && all_ready {
                return Ok(nodes);
            }

            if tokio::time::Instant::now() + opts.interval > deadline {
                return Err(DriverError::Timeout {
                    provider: self.id().to_string(),
                    detail: format!(
                        "nodes {node_ids:?} not running after {}s",
                        opts.timeout.as_secs()
                    ),
                });
            }
            log::debug!("[{}] waiting for {} node(s) to run", self.id(), node_ids.len());
            tokio::time::sleep(opts.interval).await;
        }
    }

    // ============ Images, sizes, locations ============

    async fn list_images(&self) -> Result<Vec<NodeImage>> {
        Err(DriverError::not_supported(self.id(), "list_images"))
    }

    /// Look up one image. Default: scan [`list_images`](Self::list_images).
    async fn get_image(&self, image_id: &str) -> Result<NodeImage> {
        self.list_images()
            .await?
            .into_iter()
            .find(|i| i.id == image_id)
            .ok_or_else(|| DriverError::not_found(self.id(), ResourceKind::Image, image_id))
    }

    async fn list_sizes(&self) -> Result<Vec<NodeSize>> {
        Err(DriverError::not_supported(self.id(), "list_sizes"))
    }

    async fn list_locations(&self) -> Result<Vec<NodeLocation>> {
        Err(DriverError::not_supported(self.id(), "list_locations"))
    }

    // ============ Block storage ============

    async fn list_volumes(&self) -> Result<Vec<StorageVolume>> {
        Err(DriverError::not_supported(self.id(), "list_volumes"))
    }

    async fn create_volume(&self, req: &CreateVolumeRequest) -> Result<StorageVolume> {
        let _ = req;
        Err(DriverError::not_supported(self.id(), "create_volume"))
    }

    async fn destroy_volume(&self, volume_id: &str) -> Result<()> {
        let _ = volume_id;
        Err(DriverError::not_supported(self.id(), "destroy_volume"))
    }

    /// Attach a volume. `device` is a hint (e.g. `/dev/xvdb`) some providers require.
    async fn attach_volume(
        &self,
        node_id: &str,
        volume_id: &str,
        device: Option<&str>,
    ) -> Result<()> {
        let _ = (node_id, volume_id, device);
        Err(DriverError::not_supported(self.id(), "attach_volume"))
    }

    async fn detach_volume(&self, volume_id: &str) -> Result<()> {
        let _ = volume_id;
        Err(DriverError::not_supported(self.id(), "detach_volume"))
    }

    async fn list_volume_snapshots(&self, volume_id: &str) -> Result<Vec<VolumeSnapshot>> {
        let _ = volume_id;
        Err(DriverError::not_supported(self.id(), "list_volume_snapshots"))
    }

    async fn create_volume_snapshot(
        &self,
        volume_id: &str,
        name: Option<&str>,
    ) -> Result<VolumeSnapshot> {
        let _ = (volume_id, name);
        Err(DriverError::not_supported(self.id(), "create_volume_snapshot"))
    }

    async fn destroy_volume_snapshot(&self, snapshot_id: &str) -> Result<()> {
        let _ = snapshot_id;
        Err(DriverError::not_supported(self.id(), "destroy_volume_snapshot"))
    }

    // ============ Key pairs ============

    async fn list_key_pairs(&self) -> Result<Vec<KeyPair>> {
        Err(DriverError::not_supported(self.id(), "list_key_pairs"))
    }

    /// Look up one key pair. Default: scan [`list_key_pairs`](Self::list_key_pairs).
    async fn get_key_pair(&self, name: &str) -> Result<KeyPair> {
        self.list_key_pairs()
            .await?
            .into_iter()
            .find(|k| k.name == name)
            .ok_or_else(|| DriverError::not_found(self.id(), ResourceKind::KeyPair, name))
    }

    /// Have the provider generate a key pair. The private key is only returned here.
    async fn create_key_pair(&self, name: &str) -> Result<KeyPair> {
        let _ = name;
        Err(DriverError::not_supported(self.id(), "create_key_pair"))
    }

    /// Register an existing OpenSSH public key.
    async fn import_key_pair_from_string(&self, name: &str, public_key: &str) -> Result<KeyPair> {
        let _ = (name, public_key);
        Err(DriverError::not_supported(
            self.id(),
            "import_key_pair_from_string",
        ))
    }

    async fn delete_key_pair(&self, name: &str) -> Result<()> {
        let _ = name;
        Err(DriverError::not_supported(self.id(), "delete_key_pair"))
    }
}
