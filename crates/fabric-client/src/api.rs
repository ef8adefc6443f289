//! The [`FabricApi`] trait: one method per fabric-manager endpoint.

use async_trait::async_trait;

use crate::error::FabricResult;
use crate::models::{
    DocumentLinks, EnforcementTask, Port, PortPolicy, PortPolicyRequest, Switch, Vlan,
    VlanRequest, VniBlock, VniBlockPatch, VniBlockRequest, VniPartition, VniPartitionRequest,
};

/// Typed access to the fabric-management API.
///
/// Implementations perform I/O only; ordering, validation and retries belong
/// to the caller. Methods returning documents decode the response body, and
/// any non-success status surfaces as [`crate::FabricError::Api`].
#[async_trait]
pub trait FabricApi: Send + Sync {
    /// Refreshes credentials before a reconciliation cycle.
    ///
    /// Implementations without authentication keep the default no-op.
    async fn authenticate(&self) -> FabricResult<()> {
        Ok(())
    }

    /// Lists switch names (last segment of each switch link).
    async fn list_switches(&self) -> FabricResult<Vec<String>>;

    /// Fetches one switch document.
    async fn get_switch(&self, name: &str) -> FabricResult<Switch>;

    /// Fetches one port document.
    async fn get_port(&self, name: &str) -> FabricResult<Port>;

    /// Replaces the policy link list of a port.
    async fn set_port_policy_links(&self, name: &str, links: Vec<String>) -> FabricResult<()>;

    /// Lists VNI partition links.
    async fn list_vni_partitions(&self) -> FabricResult<DocumentLinks>;

    /// Fetches one VNI partition.
    async fn get_vni_partition(&self, name: &str) -> FabricResult<VniPartition>;

    /// Creates a VNI partition.
    async fn create_vni_partition(&self, request: &VniPartitionRequest)
        -> FabricResult<VniPartition>;

    /// Patches an existing VNI partition.
    async fn patch_vni_partition(
        &self,
        name: &str,
        request: &VniPartitionRequest,
    ) -> FabricResult<VniPartition>;

    /// Deletes a VNI partition.
    async fn delete_vni_partition(&self, name: &str) -> FabricResult<()>;

    /// Lists VNI block links.
    async fn list_vni_blocks(&self) -> FabricResult<DocumentLinks>;

    /// Creates a VNI block; the response carries the enforcement task link.
    async fn create_vni_block(&self, request: &VniBlockRequest) -> FabricResult<VniBlock>;

    /// Patches an existing VNI block; the response carries a new enforcement task link.
    async fn patch_vni_block(&self, name: &str, patch: &VniBlockPatch) -> FabricResult<VniBlock>;

    /// Deletes a VNI block.
    async fn delete_vni_block(&self, name: &str) -> FabricResult<()>;

    /// Fetches an enforcement task by its full link.
    async fn get_enforcement_task(&self, link: &str) -> FabricResult<EnforcementTask>;

    /// Lists VLAN links.
    async fn list_vlans(&self) -> FabricResult<DocumentLinks>;

    /// Fetches one VLAN.
    async fn get_vlan(&self, id: u16) -> FabricResult<Vlan>;

    /// Creates a VLAN.
    async fn create_vlan(&self, request: &VlanRequest) -> FabricResult<Vlan>;

    /// Deletes a VLAN.
    async fn delete_vlan(&self, id: u16) -> FabricResult<()>;

    /// Fetches one port policy by name.
    async fn get_port_policy(&self, name: &str) -> FabricResult<PortPolicy>;

    /// Creates a port policy.
    async fn create_port_policy(&self, request: &PortPolicyRequest) -> FabricResult<PortPolicy>;

    /// Deletes a port policy by its link.
    async fn delete_port_policy(&self, link: &str) -> FabricResult<()>;
}
