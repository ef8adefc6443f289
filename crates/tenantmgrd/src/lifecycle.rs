//! Resource lifecycle for one tenant on the fabric.
//!
//! A tenant owns four kinds of fabric resources:
//!
//! 1. a VNI partition named after the tenant,
//! 2. a VNI block `"{tenant}-{block}"` carved out of that partition,
//! 3. a VLAN named after the tenant,
//! 4. a port policy `/fabric/port-policies/{tenant}` pointing at the VLAN and
//!    prepended to the policy links of each of the tenant's edge ports.
//!
//! Creation order follows the dependencies (partition before block, VLAN
//! before policy before attachment). Teardown runs them backwards through a
//! [`TeardownPlan`], whose step order is fixed when the plan is built. Every
//! step tolerates work already done by an earlier, interrupted cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use fabric_client::links::{
    policy_name_from_link, port_policy_link, vlan_id_from_link, vlan_link, vni_block_name,
};
use fabric_client::models::VLAN_STATUS_ONLINE;
use fabric_client::{
    FabricApi, FabricResult, PortPolicyRequest, VlanRequest, VniBlockPatch,
    VniBlockRequest, VniPartition, VniPartitionRequest,
};
use fabric_orch_common::{BackoffPolicy, CycleContext};
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheEntry;
use crate::enforcement::{EnforcementOutcome, EnforcementTracker};
use crate::error::{TenantMgrError, TenantMgrResult};
use crate::topology::{EdgePortSet, TopologyResolver};
use crate::types::{ComputeTenant, NetworkTenant};
use crate::validation::validate_vni_request;
use crate::vlan_alloc::VlanAllocator;

/// VLAN id → VLAN name, as observed on the fabric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanInventory {
    names: BTreeMap<u16, String>,
}

impl VlanInventory {
    pub fn insert(&mut self, id: u16, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn remove(&mut self, id: u16) {
        self.names.remove(&id);
    }

    /// Ids of every VLAN named `name`, lowest first.
    pub fn ids_named(&self, name: &str) -> Vec<u16> {
        self.names
            .iter()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every observed id, lowest first.
    pub fn ids(&self) -> Vec<u16> {
        self.names.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The VLAN a tenant holds after [`LifecycleManager::provision_vlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantVlan {
    pub id: u16,
    /// False if an existing VLAN named after the tenant was reused.
    pub created: bool,
}

/// One step of a teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownStep {
    DeleteVniBlock(String),
    DeleteVniPartition(String),
    /// Remove the tenant's policy link from every edge port carrying it.
    DetachPortPolicy(String),
    DeletePortPolicy(String),
    DeleteVlan(u16),
}

/// Ordered teardown of a tenant's resources.
///
/// Plans can only be built through the constructors below, which emit the
/// VNI block before its partition and detach a port policy before deleting
/// it, and delete the policy before the VLAN it references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownPlan {
    steps: Vec<TeardownStep>,
}

impl TeardownPlan {
    /// Full teardown: VNI block and partition, then every listed VLAN.
    ///
    /// An empty tenant name yields an empty plan. A missing block name skips
    /// the VNI steps.
    pub fn for_tenant(tenant_name: &str, block_name: Option<&str>, vlan_ids: &[u16]) -> Self {
        let mut plan = Self::default();
        if tenant_name.is_empty() {
            warn!("Tenant name is empty, nothing to tear down");
            return plan;
        }
        plan.push_vni(tenant_name, block_name);
        plan.push_vlans(tenant_name, vlan_ids);
        plan
    }

    /// VLAN-only teardown, used when a tenant's edge ports change.
    pub fn for_vlans(tenant_name: &str, vlan_ids: &[u16]) -> Self {
        let mut plan = Self::default();
        if !tenant_name.is_empty() {
            plan.push_vlans(tenant_name, vlan_ids);
        }
        plan
    }

    fn push_vni(&mut self, tenant_name: &str, block_name: Option<&str>) {
        match block_name.filter(|b| !b.is_empty()) {
            Some(block) => {
                self.steps
                    .push(TeardownStep::DeleteVniBlock(vni_block_name(tenant_name, block)));
                self.steps
                    .push(TeardownStep::DeleteVniPartition(tenant_name.to_string()));
            }
            None => warn!(
                tenant = %tenant_name,
                "VNI block name is empty, skipping VNI block and partition deletion"
            ),
        }
    }

    fn push_vlans(&mut self, tenant_name: &str, vlan_ids: &[u16]) {
        if vlan_ids.is_empty() {
            return;
        }
        self.steps
            .push(TeardownStep::DetachPortPolicy(tenant_name.to_string()));
        self.steps
            .push(TeardownStep::DeletePortPolicy(port_policy_link(tenant_name)));
        self.steps
            .extend(vlan_ids.iter().map(|id| TeardownStep::DeleteVlan(*id)));
    }

    pub fn steps(&self) -> &[TeardownStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Result of [`LifecycleManager::update_tenant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing relevant changed.
    Unchanged,
    /// Partition and block were patched in place.
    Patched {
        enforcement: EnforcementOutcome,
        vlan_replaced: bool,
    },
    /// Patching failed; everything was torn down and created again.
    Recreated,
}

/// Returns true if `current` names a different node set than `cached`.
pub fn node_set_changed(cached: &[String], current: &[String]) -> bool {
    cached.len() != current.len() || current.iter().any(|x| !cached.contains(x))
}

fn ignore_not_found(result: FabricResult<()>, what: &str) -> TenantMgrResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(resource = %what, "Already deleted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Creates, updates and tears down a tenant's fabric resources.
pub struct LifecycleManager {
    fabric: Arc<dyn FabricApi>,
    topology: TopologyResolver,
    tracker: EnforcementTracker,
    vlans: Arc<VlanAllocator>,
}

impl LifecycleManager {
    pub fn new(
        fabric: Arc<dyn FabricApi>,
        enforcement: BackoffPolicy,
        vlans: Arc<VlanAllocator>,
    ) -> Self {
        Self {
            topology: TopologyResolver::new(fabric.clone()),
            tracker: EnforcementTracker::new(fabric.clone(), enforcement),
            fabric,
            vlans,
        }
    }

    pub fn topology(&self) -> &TopologyResolver {
        &self.topology
    }

    /// Resolves the edge ports of a node set.
    pub async fn resolve_edge_ports(&self, xnames: &[String]) -> TenantMgrResult<EdgePortSet> {
        Ok(self.topology.resolve(xnames).await?)
    }

    // ===== VNI partition and block =====

    /// Validates the request and creates the tenant's VNI partition.
    #[instrument(skip(self, network, edges), fields(ports = edges.len()))]
    pub async fn create_vni_partition(
        &self,
        tenant_name: &str,
        network: &NetworkTenant,
        edges: &EdgePortSet,
    ) -> TenantMgrResult<VniPartition> {
        validate_vni_request(
            network.vni_partition.vni_count,
            &network.vni_partition.vni_ranges,
        )?;

        let request = VniPartitionRequest {
            partition_name: tenant_name.to_string(),
            vni_count: network.vni_partition.vni_count,
            vni_ranges: network.vni_partition.vni_ranges.clone(),
            edge_port_dfas: edges.dfas.clone(),
        };
        let partition = self.fabric.create_vni_partition(&request).await?;
        info!(
            tenant = %tenant_name,
            link = %partition.document_self_link,
            "Created VNI partition"
        );
        Ok(partition)
    }

    /// Fetches the tenant's VNI partition.
    pub async fn get_vni_partition(&self, tenant_name: &str) -> TenantMgrResult<VniPartition> {
        Ok(self.fabric.get_vni_partition(tenant_name).await?)
    }

    /// Creates the tenant's VNI block inside `partition` and waits for its
    /// enforcement.
    ///
    /// Failed or timed-out enforcement is reported in the outcome; only
    /// fabric errors, a missing task link and cancellation are errors.
    #[instrument(skip(self, partition, edges, ctx), fields(ports = edges.len()))]
    pub async fn create_vni_block(
        &self,
        tenant_name: &str,
        partition: &VniPartition,
        block: &str,
        edges: &EdgePortSet,
        ctx: &CycleContext,
    ) -> TenantMgrResult<EnforcementOutcome> {
        if block.is_empty() {
            return Err(TenantMgrError::missing_block_name(tenant_name));
        }
        let name = vni_block_name(tenant_name, block);
        let request = VniBlockRequest {
            vni_block_name: name.clone(),
            partition_name: tenant_name.to_string(),
            vni_ranges: partition.vni_ranges.clone(),
            port_dfas: edges.dfas.clone(),
        };
        let created = self.fabric.create_vni_block(&request).await?;
        info!(tenant = %tenant_name, block = %name, "Created VNI block");

        self.wait_enforcement(&name, &created.enforcement_task_service_link, ctx)
            .await
    }

    /// Deletes the tenant's VNI block `block`, if it still exists.
    #[instrument(skip(self))]
    pub async fn delete_vni_block(&self, tenant_name: &str, block: &str) -> TenantMgrResult<()> {
        let name = vni_block_name(tenant_name, block);
        ignore_not_found(self.fabric.delete_vni_block(&name).await, &name)?;
        info!(block = %name, "Deleted VNI block");
        Ok(())
    }

    async fn wait_enforcement(
        &self,
        block: &str,
        link: &str,
        ctx: &CycleContext,
    ) -> TenantMgrResult<EnforcementOutcome> {
        let outcome = self.tracker.wait(block, link, ctx).await?;
        if !outcome.is_success() {
            // Not fatal: the block exists and the fabric keeps enforcing it.
            warn!(block = %block, outcome = ?outcome, "Continuing without confirmed enforcement");
        }
        Ok(outcome)
    }

    // ===== VLAN, port policy and attachment =====

    /// Reads every VLAN on the fabric.
    pub async fn vlan_inventory(&self) -> TenantMgrResult<VlanInventory> {
        let mut inventory = VlanInventory::default();
        for link in self.fabric.list_vlans().await?.document_links {
            let id = vlan_id_from_link(&link)?;
            let vlan = self.fabric.get_vlan(id).await?;
            inventory.insert(id, vlan.name);
        }
        Ok(inventory)
    }

    /// Gives the tenant a VLAN, then creates its port policy and attaches the
    /// policy to `edges`.
    ///
    /// A VLAN already named after the tenant is reused, so a cycle racing
    /// another one, or resuming one that stopped after the VLAN was created,
    /// does not allocate a second id.
    #[instrument(skip(self, edges), fields(ports = edges.len()))]
    pub async fn provision_vlan(
        &self,
        tenant_name: &str,
        edges: &EdgePortSet,
    ) -> TenantMgrResult<TenantVlan> {
        let vlan = {
            let mut bitmap = self.vlans.lock().await;
            let inventory = self.vlan_inventory().await?;
            bitmap.resync(inventory.ids());
            match inventory.ids_named(tenant_name).first() {
                Some(&id) => {
                    debug!(tenant = %tenant_name, vlan = id, "Reusing tenant VLAN");
                    TenantVlan { id, created: false }
                }
                None => {
                    let id = bitmap.allocate()?;
                    let request = VlanRequest {
                        id,
                        name: tenant_name.to_string(),
                        status: VLAN_STATUS_ONLINE.to_string(),
                    };
                    if let Err(e) = self.fabric.create_vlan(&request).await {
                        bitmap.release(id);
                        return Err(e.into());
                    }
                    info!(tenant = %tenant_name, vlan = id, "Created VLAN");
                    TenantVlan { id, created: true }
                }
            }
        };

        self.apply_port_policy(tenant_name, vlan.id, edges).await?;
        Ok(vlan)
    }

    /// Makes sure the tenant's port policy exists for VLAN `id` and is
    /// attached to every port in `edges`.
    ///
    /// Safe to repeat: an existing policy is kept and ports already carrying
    /// it are skipped. Returns the number of ports patched.
    pub async fn apply_port_policy(
        &self,
        tenant_name: &str,
        id: u16,
        edges: &EdgePortSet,
    ) -> TenantMgrResult<usize> {
        let policy_link = match self.fabric.get_port_policy(tenant_name).await {
            Ok(_) => port_policy_link(tenant_name),
            Err(e) if e.is_not_found() => self.create_port_policy(tenant_name, id).await?,
            Err(e) => return Err(e.into()),
        };

        let patched = self.attach_port_policy(&policy_link, &edges.ports).await?;
        if patched > 0 {
            info!(
                tenant = %tenant_name,
                ports = patched,
                "Applied VLAN port policy to edge ports"
            );
        }
        Ok(patched)
    }

    async fn create_port_policy(&self, tenant_name: &str, id: u16) -> TenantMgrResult<String> {
        let request = PortPolicyRequest {
            allowed_vlans: vec![vlan_link(id)],
            native_vlan_id: vlan_link(id),
            is_untagged_allowed: true,
            document_self_link: tenant_name.to_string(),
        };
        match self.fabric.create_port_policy(&request).await {
            Ok(policy) => {
                let link = if policy.document_self_link.is_empty() {
                    port_policy_link(tenant_name)
                } else {
                    policy.document_self_link
                };
                info!(tenant = %tenant_name, policy = %link, "Created VLAN port policy");
                Ok(link)
            }
            Err(e) if e.is_conflict() => {
                debug!(tenant = %tenant_name, "Port policy already exists");
                Ok(port_policy_link(tenant_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Prepends `policy_link` to each port's policy links.
    ///
    /// Ports that already carry the link are left alone. Returns the number
    /// of ports patched.
    pub async fn attach_port_policy(
        &self,
        policy_link: &str,
        ports: &[String],
    ) -> TenantMgrResult<usize> {
        let mut patched = 0;
        for name in ports {
            let port = self.fabric.get_port(name).await?;
            if port.port_policy_links.iter().any(|l| l == policy_link) {
                debug!(port = %name, policy = %policy_link, "Port policy already applied");
                continue;
            }
            let mut links = Vec::with_capacity(port.port_policy_links.len() + 1);
            links.push(policy_link.to_string());
            links.extend(port.port_policy_links);
            self.fabric.set_port_policy_links(name, links).await?;
            patched += 1;
        }
        Ok(patched)
    }

    /// Removes every link to the tenant's port policy from every edge port.
    ///
    /// Returns the number of ports patched.
    pub async fn detach_port_policy(&self, tenant_name: &str) -> TenantMgrResult<usize> {
        let mut patched = 0;
        for edge in self.topology.edge_ports().await? {
            let keep: Vec<String> = edge
                .policy_links
                .iter()
                .filter(|l| policy_name_from_link(l) != Some(tenant_name))
                .cloned()
                .collect();
            if keep.len() == edge.policy_links.len() {
                continue;
            }
            self.fabric.set_port_policy_links(&edge.port, keep).await?;
            debug!(port = %edge.port, tenant = %tenant_name, "Removed port policy from edge port");
            patched += 1;
        }
        Ok(patched)
    }

    // ===== Update =====

    /// Applies a changed compute or network tenant to existing resources.
    ///
    /// No-op unless the node set or the network tenant generation changed.
    /// A failed partition patch is compensated by tearing everything down
    /// and creating it again.
    #[instrument(skip_all, fields(tenant = %tenant.tenant_name))]
    pub async fn update_tenant(
        &self,
        tenant: &ComputeTenant,
        network: &NetworkTenant,
        cached: &CacheEntry,
        ctx: &CycleContext,
    ) -> TenantMgrResult<UpdateOutcome> {
        let tenant_name = tenant.tenant_name.as_str();
        let xnames = tenant.xnames();
        let nodes_changed = node_set_changed(&cached.xnames, &xnames);
        let network_changed = cached
            .network_generation
            .is_some_and(|g| g != network.generation);

        if !nodes_changed && !network_changed {
            debug!("Node set and network tenant unchanged, nothing to update");
            return Ok(UpdateOutcome::Unchanged);
        }
        if network.vni_block_name.is_empty() {
            return Err(TenantMgrError::missing_block_name(tenant_name));
        }
        validate_vni_request(
            network.vni_partition.vni_count,
            &network.vni_partition.vni_ranges,
        )?;

        info!(nodes_changed, network_changed, "Updating tenant");
        let edges = self.resolve_edge_ports(&xnames).await?;

        let request = VniPartitionRequest {
            partition_name: tenant_name.to_string(),
            vni_count: network.vni_partition.vni_count,
            vni_ranges: network.vni_partition.vni_ranges.clone(),
            edge_port_dfas: edges.dfas.clone(),
        };
        if let Err(e) = self.fabric.patch_vni_partition(tenant_name, &request).await {
            warn!(error = %e, "Cannot update VNI partition, recreating tenant resources");
            self.recreate(tenant_name, network, cached, &edges, ctx).await?;
            return Ok(UpdateOutcome::Recreated);
        }
        info!("Updated VNI partition");

        let block = vni_block_name(tenant_name, &network.vni_block_name);
        let patch = VniBlockPatch {
            port_dfas: edges.dfas.clone(),
            vni_ranges: network.vni_partition.vni_ranges.clone(),
        };
        let patched = self.fabric.patch_vni_block(&block, &patch).await?;
        info!(block = %block, "Updated VNI block");
        let enforcement = self
            .wait_enforcement(&block, &patched.enforcement_task_service_link, ctx)
            .await?;

        if nodes_changed {
            info!("Tenant nodes changed, replacing VLAN");
            let ids = self.vlan_inventory().await?.ids_named(tenant_name);
            self.execute(&TeardownPlan::for_vlans(tenant_name, &ids))
                .await?;
            let vlan = self.provision_vlan(tenant_name, &edges).await?;
            info!(vlan = vlan.id, "Replaced VLAN");
        }

        Ok(UpdateOutcome::Patched {
            enforcement,
            vlan_replaced: nodes_changed,
        })
    }

    async fn recreate(
        &self,
        tenant_name: &str,
        network: &NetworkTenant,
        cached: &CacheEntry,
        edges: &EdgePortSet,
        ctx: &CycleContext,
    ) -> TenantMgrResult<()> {
        // The block may have been created under the previously cached name.
        let old_block = cached
            .vni_block_name
            .as_deref()
            .unwrap_or(&network.vni_block_name);
        let ids = self.vlan_inventory().await?.ids_named(tenant_name);
        self.execute(&TeardownPlan::for_tenant(tenant_name, Some(old_block), &ids))
            .await?;

        let partition = self.create_vni_partition(tenant_name, network, edges).await?;
        self.create_vni_block(tenant_name, &partition, &network.vni_block_name, edges, ctx)
            .await?;
        self.provision_vlan(tenant_name, edges).await?;
        Ok(())
    }

    // ===== Teardown =====

    /// Tears down every resource of a deleted tenant.
    #[instrument(skip(self))]
    pub async fn delete_tenant(
        &self,
        tenant_name: &str,
        block_name: Option<&str>,
    ) -> TenantMgrResult<()> {
        if tenant_name.is_empty() {
            warn!("Cannot delete tenant resources, tenant name is empty");
            return Ok(());
        }
        let ids = self.vlan_inventory().await?.ids_named(tenant_name);
        let plan = TeardownPlan::for_tenant(tenant_name, block_name, &ids);
        self.execute(&plan).await?;
        info!(tenant = %tenant_name, "Deleted tenant fabric resources");
        Ok(())
    }

    /// Runs a teardown plan in order; resources already gone are skipped.
    pub async fn execute(&self, plan: &TeardownPlan) -> TenantMgrResult<()> {
        for step in plan.steps() {
            debug!(step = ?step, "Teardown step");
            match step {
                TeardownStep::DeleteVniBlock(name) => {
                    ignore_not_found(self.fabric.delete_vni_block(name).await, name)?;
                    info!(block = %name, "Deleted VNI block");
                }
                TeardownStep::DeleteVniPartition(name) => {
                    ignore_not_found(self.fabric.delete_vni_partition(name).await, name)?;
                    info!(partition = %name, "Deleted VNI partition");
                }
                TeardownStep::DetachPortPolicy(tenant_name) => {
                    let ports = self.detach_port_policy(tenant_name).await?;
                    info!(tenant = %tenant_name, ports, "Detached port policy");
                }
                TeardownStep::DeletePortPolicy(link) => {
                    ignore_not_found(self.fabric.delete_port_policy(link).await, link)?;
                    info!(policy = %link, "Deleted port policy");
                }
                TeardownStep::DeleteVlan(id) => {
                    ignore_not_found(self.fabric.delete_vlan(*id).await, &vlan_link(*id))?;
                    self.vlans.lock().await.release(*id);
                    info!(vlan = *id, "Deleted VLAN");
                }
            }
        }
        Ok(())
    }
}
