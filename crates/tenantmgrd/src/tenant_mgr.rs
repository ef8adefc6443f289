//! TenantMgr - convergence engine for compute and network tenants
//!
//! One [`Reconciler::reconcile`] call is one cycle:
//!
//! 1. Read every compute and network tenant, plus the VNI partitions, VNI
//!    blocks and VLANs currently on the fabric
//! 2. Seed the [`TenantCache`] from the observed tenants on the first cycle
//! 3. For each compute tenant with a matching network tenant, create whatever
//!    is missing (partition, VLAN, block) or apply an update when the tenant
//!    changed since it was cached
//! 4. Tear down cached tenants whose compute tenant is gone
//!
//! Any failure aborts the cycle; the next trigger picks up where it stopped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fabric_client::links::{last_segment, vni_block_name};
use fabric_client::FabricApi;
use fabric_orch_common::{Action, BackoffPolicy, CycleContext, Reconciler, Trigger};
use tracing::{debug, info, instrument};

use crate::cache::{CacheEntry, TenantCache};
use crate::error::{TenantMgrError, TenantMgrResult};
use crate::lifecycle::{LifecycleManager, UpdateOutcome, VlanInventory};
use crate::spec_store::SpecStore;
use crate::topology::EdgePortSet;
use crate::types::{ComputeTenant, NetworkTenant};
use crate::vlan_alloc::{VlanAllocator, DEFAULT_MAX_VLAN_ID, DEFAULT_MIN_VLAN_ID};

/// Default delay before a converged tenant set is revisited.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Tunables of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub resync_interval: Duration,
    pub enforcement: BackoffPolicy,
    pub vlan_min: u16,
    pub vlan_max: u16,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            enforcement: BackoffPolicy::default(),
            vlan_min: DEFAULT_MIN_VLAN_ID,
            vlan_max: DEFAULT_MAX_VLAN_ID,
        }
    }
}

/// Counters of one cycle, logged when it completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub tenants: usize,
    pub unmatched: usize,
    pub partitions_created: usize,
    pub vlans_created: usize,
    pub blocks_created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Fabric state read at the start of a cycle and kept current by it.
#[derive(Debug, Default)]
struct Observed {
    partitions: HashSet<String>,
    blocks: HashSet<String>,
    vlans: VlanInventory,
}

fn find_network<'a>(networks: &'a [NetworkTenant], tenant_name: &str) -> Option<&'a NetworkTenant> {
    networks.iter().find(|n| n.tenant_name == tenant_name)
}

/// Convergence engine.
pub struct TenantMgr {
    store: Arc<dyn SpecStore>,
    fabric: Arc<dyn FabricApi>,
    lifecycle: LifecycleManager,
    cache: Arc<TenantCache>,
    resync_interval: Duration,
}

impl TenantMgr {
    /// Creates an engine with an empty cache.
    pub fn new(
        store: Arc<dyn SpecStore>,
        fabric: Arc<dyn FabricApi>,
        settings: &EngineSettings,
    ) -> TenantMgrResult<Self> {
        let vlans = Arc::new(VlanAllocator::new(settings.vlan_min, settings.vlan_max)?);
        Ok(Self {
            lifecycle: LifecycleManager::new(fabric.clone(), settings.enforcement.clone(), vlans),
            store,
            fabric,
            cache: Arc::new(TenantCache::new()),
            resync_interval: settings.resync_interval,
        })
    }

    /// Replaces the tenant cache, e.g. to share it between engines.
    pub fn with_cache(mut self, cache: Arc<TenantCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<TenantCache> {
        &self.cache
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Runs one cycle and returns its counters.
    pub async fn converge(
        &self,
        trigger: &Trigger,
        ctx: &CycleContext,
    ) -> TenantMgrResult<CycleStats> {
        self.fabric.authenticate().await?;

        let compute = self.store.list_compute_tenants().await?;
        let networks = self.store.list_network_tenants().await?;
        let mut observed = self.observe().await?;

        let seeded = self.cache.seed_once(
            compute
                .iter()
                .map(|t| (t, find_network(&networks, &t.tenant_name))),
        );
        if seeded {
            info!(tenants = self.cache.len(), "Seeded tenant cache");
        }

        let mut stats = CycleStats {
            tenants: compute.len(),
            ..Default::default()
        };
        for tenant in &compute {
            Self::check_cancelled(ctx)?;
            self.converge_tenant(tenant, &networks, &mut observed, ctx, &mut stats)
                .await?;
        }

        let keys = match trigger.key() {
            Some(key) => vec![key.to_string()],
            None => self.cache.keys(),
        };
        for key in keys {
            Self::check_cancelled(ctx)?;
            if self.sweep_deleted(&key, &networks).await? {
                stats.deleted += 1;
            }
        }

        info!(
            tenants = stats.tenants,
            unmatched = stats.unmatched,
            partitions_created = stats.partitions_created,
            vlans_created = stats.vlans_created,
            blocks_created = stats.blocks_created,
            updated = stats.updated,
            deleted = stats.deleted,
            "Tenants converged"
        );
        Ok(stats)
    }

    fn check_cancelled(ctx: &CycleContext) -> TenantMgrResult<()> {
        if ctx.is_cancelled() || ctx.is_expired() {
            return Err(TenantMgrError::Cancelled);
        }
        Ok(())
    }

    async fn observe(&self) -> TenantMgrResult<Observed> {
        let partitions = self
            .fabric
            .list_vni_partitions()
            .await?
            .document_links
            .iter()
            .map(|l| last_segment(l).to_string())
            .collect();
        let blocks = self
            .fabric
            .list_vni_blocks()
            .await?
            .document_links
            .iter()
            .map(|l| last_segment(l).to_string())
            .collect();
        let vlans = self.lifecycle.vlan_inventory().await?;
        debug!(vlans = vlans.len(), "Observed fabric state");
        Ok(Observed {
            partitions,
            blocks,
            vlans,
        })
    }

    /// Resolves the tenant's edge ports on first use within a cycle.
    async fn edges<'a>(
        &self,
        slot: &'a mut Option<EdgePortSet>,
        xnames: &[String],
    ) -> TenantMgrResult<&'a EdgePortSet> {
        if slot.is_none() {
            *slot = Some(self.lifecycle.resolve_edge_ports(xnames).await?);
        }
        Ok(slot.get_or_insert_with(EdgePortSet::default))
    }

    #[instrument(skip_all, fields(tenant = %tenant.tenant_name))]
    async fn converge_tenant(
        &self,
        tenant: &ComputeTenant,
        networks: &[NetworkTenant],
        observed: &mut Observed,
        ctx: &CycleContext,
        stats: &mut CycleStats,
    ) -> TenantMgrResult<()> {
        let tenant_name = tenant.tenant_name.as_str();
        let Some(network) = find_network(networks, tenant_name) else {
            info!("No network tenant for compute tenant, skipping");
            stats.unmatched += 1;
            return Ok(());
        };

        let xnames = tenant.xnames();
        let mut edges = None;
        let block = vni_block_name(tenant_name, &network.vni_block_name);
        let partition_existed = observed.partitions.contains(tenant_name);
        let block_existed = observed.blocks.contains(&block);
        let existing_vlan = observed.vlans.ids_named(tenant_name).first().copied();

        if !partition_existed {
            let ports = self.edges(&mut edges, &xnames).await?;
            match self
                .lifecycle
                .create_vni_partition(tenant_name, network, ports)
                .await
            {
                Ok(_) => stats.partitions_created += 1,
                Err(e) if e.is_conflict() => debug!("VNI partition already exists"),
                Err(e) => return Err(e),
            }
            observed.partitions.insert(tenant_name.to_string());
            self.cache
                .insert(&tenant.name, CacheEntry::observe(tenant, Some(network)));
        }

        if existing_vlan.is_none() {
            let ports = self.edges(&mut edges, &xnames).await?;
            let vlan = self.lifecycle.provision_vlan(tenant_name, ports).await?;
            observed.vlans.insert(vlan.id, tenant_name);
            if vlan.created {
                stats.vlans_created += 1;
            }
        }

        if !block_existed {
            self.retire_renamed_block(tenant, network, observed).await?;
            let partition = self.lifecycle.get_vni_partition(tenant_name).await?;
            let ports = self.edges(&mut edges, &xnames).await?;
            match self
                .lifecycle
                .create_vni_block(tenant_name, &partition, &network.vni_block_name, ports, ctx)
                .await
            {
                Ok(_) => stats.blocks_created += 1,
                Err(e) if e.is_conflict() => debug!(block = %block, "VNI block already exists"),
                Err(e) => return Err(e),
            }
            observed.blocks.insert(block);
        }

        let mut vlan_replaced = false;
        if partition_existed && block_existed {
            match self.cache.get(&tenant.name) {
                None => {
                    info!("Adopting existing fabric resources as baseline");
                    self.cache
                        .insert(&tenant.name, CacheEntry::observe(tenant, Some(network)));
                }
                Some(entry)
                    if entry.generation != tenant.generation
                        || entry
                            .network_generation
                            .is_some_and(|g| g != network.generation) =>
                {
                    let outcome = self
                        .lifecycle
                        .update_tenant(tenant, network, &entry, ctx)
                        .await?;
                    info!(outcome = ?outcome, "Tenant updated");
                    vlan_replaced = matches!(
                        outcome,
                        UpdateOutcome::Recreated
                            | UpdateOutcome::Patched {
                                vlan_replaced: true,
                                ..
                            }
                    );
                    self.cache
                        .insert(&tenant.name, CacheEntry::observe(tenant, Some(network)));
                    stats.updated += 1;
                }
                Some(entry) if entry.network_generation.is_none() => {
                    self.cache
                        .insert(&tenant.name, CacheEntry::observe(tenant, Some(network)));
                }
                Some(_) => {}
            }
        }

        // An earlier cycle may have stopped between the VLAN and its policy.
        if let Some(id) = existing_vlan.filter(|_| !vlan_replaced) {
            let ports = self.edges(&mut edges, &xnames).await?;
            self.lifecycle.apply_port_policy(tenant_name, id, ports).await?;
        }

        if !self.cache.contains(&tenant.name) {
            self.cache
                .insert(&tenant.name, CacheEntry::observe(tenant, Some(network)));
        }
        Ok(())
    }

    /// Deletes the block created under the tenant's previous `vniBlockName`
    /// and records the new name in the cache.
    ///
    /// A partition can only be deleted once all of its blocks are gone, so a
    /// renamed block left behind would block teardown.
    async fn retire_renamed_block(
        &self,
        tenant: &ComputeTenant,
        network: &NetworkTenant,
        observed: &mut Observed,
    ) -> TenantMgrResult<()> {
        if network.vni_block_name.is_empty() {
            return Ok(());
        }
        let Some(mut entry) = self.cache.get(&tenant.name) else {
            return Ok(());
        };
        let Some(old) = entry
            .vni_block_name
            .clone()
            .filter(|b| !b.is_empty() && *b != network.vni_block_name)
        else {
            return Ok(());
        };

        if observed
            .blocks
            .remove(&vni_block_name(&tenant.tenant_name, &old))
        {
            info!(old = %old, new = %network.vni_block_name, "VNI block renamed");
            self.lifecycle
                .delete_vni_block(&tenant.tenant_name, &old)
                .await?;
        }
        entry.vni_block_name = Some(network.vni_block_name.clone());
        self.cache.insert(&tenant.name, entry);
        Ok(())
    }

    /// Tears down the tenant cached under `key` if its compute tenant is gone.
    ///
    /// Returns true if a teardown ran.
    async fn sweep_deleted(&self, key: &str, networks: &[NetworkTenant]) -> TenantMgrResult<bool> {
        let Some(entry) = self.cache.get(key) else {
            return Ok(false);
        };
        if self.store.get_compute_tenant(key).await?.is_some() {
            return Ok(false);
        }

        let block = find_network(networks, &entry.tenant_name)
            .map(|n| n.vni_block_name.clone())
            .or(entry.vni_block_name);
        info!(key = %key, tenant = %entry.tenant_name, "Compute tenant deleted, tearing down");
        self.lifecycle
            .delete_tenant(&entry.tenant_name, block.as_deref())
            .await?;
        self.cache.remove(key);
        Ok(true)
    }
}

#[async_trait]
impl Reconciler for TenantMgr {
    type Error = TenantMgrError;

    fn name(&self) -> &str {
        "tenantmgrd"
    }

    async fn reconcile(&self, trigger: &Trigger, ctx: &CycleContext) -> TenantMgrResult<Action> {
        self.converge(trigger, ctx).await?;
        Ok(Action::Requeue(self.resync_interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_client::fake::{FabricOp, FakeFabric};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use crate::types::{ResourceGroup, VniPartitionSpec};

    #[derive(Default)]
    struct Store {
        compute: Mutex<Vec<ComputeTenant>>,
        network: Mutex<Vec<NetworkTenant>>,
    }

    #[async_trait]
    impl SpecStore for Store {
        async fn list_compute_tenants(&self) -> TenantMgrResult<Vec<ComputeTenant>> {
            Ok(self.compute.lock().clone())
        }

        async fn list_network_tenants(&self) -> TenantMgrResult<Vec<NetworkTenant>> {
            Ok(self.network.lock().clone())
        }
    }

    fn setup() -> (Arc<Store>, Arc<FakeFabric>, TenantMgr) {
        let fabric = Arc::new(FakeFabric::new());
        fabric.add_switch("sw0", 0, 1);
        fabric.add_edge_port("sw0", 1, "p1", "x1h0");
        fabric.add_edge_port("sw0", 2, "p2", "x2h0");

        let store = Arc::new(Store::default());
        store.compute.lock().push(ComputeTenant {
            name: "t1".to_string(),
            tenant_name: "t1".to_string(),
            resource_groups: vec![ResourceGroup {
                group_type: "compute".to_string(),
                xnames: vec!["x1".to_string(), "x2".to_string()],
            }],
            generation: 1,
        });
        store.network.lock().push(NetworkTenant {
            name: "t1-net".to_string(),
            tenant_name: "t1".to_string(),
            vni_partition: VniPartitionSpec {
                vni_count: 5,
                vni_ranges: vec!["10-20".to_string()],
            },
            vni_block_name: "blk".to_string(),
            generation: 1,
        });

        let settings = EngineSettings {
            resync_interval: Duration::from_secs(30),
            enforcement: BackoffPolicy::with_max_attempts(3),
            ..Default::default()
        };
        let mgr = TenantMgr::new(store.clone(), fabric.clone(), &settings).unwrap();
        (store, fabric, mgr)
    }

    #[tokio::test]
    async fn test_first_cycle_creates_everything() {
        let (_store, fabric, mgr) = setup();

        let stats = mgr
            .converge(&Trigger::Resync, &CycleContext::new())
            .await
            .unwrap();
        assert_eq!(
            stats,
            CycleStats {
                tenants: 1,
                partitions_created: 1,
                vlans_created: 1,
                blocks_created: 1,
                ..Default::default()
            }
        );
        assert_eq!(
            fabric.journal(),
            vec![
                FabricOp::CreatePartition("t1".to_string()),
                FabricOp::CreateVlan(1),
                FabricOp::CreatePortPolicy("t1".to_string()),
                FabricOp::SetPortPolicyLinks {
                    port: "p1".to_string(),
                    links: vec!["/fabric/port-policies/t1".to_string()]
                },
                FabricOp::SetPortPolicyLinks {
                    port: "p2".to_string(),
                    links: vec!["/fabric/port-policies/t1".to_string()]
                },
                FabricOp::CreateBlock("t1-blk".to_string()),
            ]
        );
        assert_eq!(fabric.auth_calls(), 1);
        assert!(mgr.cache().contains("t1"));
    }

    #[tokio::test]
    async fn test_requeues_after_interval() {
        let (_store, _fabric, mgr) = setup();
        let action = mgr
            .reconcile(&Trigger::Resync, &CycleContext::new())
            .await
            .unwrap();
        assert_eq!(action, Action::Requeue(Duration::from_secs(30)));
        assert_eq!(mgr.name(), "tenantmgrd");
    }

    #[tokio::test]
    async fn test_object_trigger_sweeps_deleted_tenant() {
        let (store, fabric, mgr) = setup();
        mgr.converge(&Trigger::Resync, &CycleContext::new())
            .await
            .unwrap();

        store.compute.lock().clear();
        let stats = mgr
            .converge(&Trigger::object("t1"), &CycleContext::new())
            .await
            .unwrap();
        assert_eq!(stats.deleted, 1);
        assert!(fabric.partition("t1").is_none());
        assert!(fabric.block("t1-blk").is_none());
        assert!(fabric.vlans_named("t1").is_empty());
        assert!(mgr.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_cycle() {
        let (_store, fabric, mgr) = setup();
        let ctx = CycleContext::new();
        ctx.cancel();

        let err = mgr.converge(&Trigger::Resync, &ctx).await.unwrap_err();
        assert!(matches!(err, TenantMgrError::Cancelled));
        assert!(fabric.journal().is_empty());
    }

    #[tokio::test]
    async fn test_adopts_provisioned_tenant_without_update() {
        let (_store, fabric, mgr) = setup();
        mgr.converge(&Trigger::Resync, &CycleContext::new())
            .await
            .unwrap();

        let restarted = TenantMgr::new(
            mgr.store.clone(),
            fabric.clone(),
            &EngineSettings::default(),
        )
        .unwrap();
        fabric.clear_journal();
        restarted
            .converge(&Trigger::Resync, &CycleContext::new())
            .await
            .unwrap();
        assert!(fabric.journal().is_empty());
        assert_eq!(restarted.cache().get("t1").unwrap().generation, 1);
    }
}
