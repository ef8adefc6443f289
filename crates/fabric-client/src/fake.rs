//! In-memory fabric manager for tests.
//!
//! [`FakeFabric`] implements [`FabricApi`] over plain maps and records every
//! successful mutation in a journal, so tests can assert on both the final
//! fabric state and the order in which it was reached. It also enforces the
//! referential rules of the real fabric: a partition cannot be deleted while a
//! block uses it, a port policy cannot be deleted while a port carries it, and
//! a VLAN cannot be deleted while a policy references it.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::FabricApi;
use crate::error::{FabricError, FabricResult};
use crate::links::{
    last_segment, member_path, policy_name_from_link, port_policy_link, vlan_link, PORTS_PATH,
    SWITCHES_PATH, VLANS_PATH, VNI_BLOCKS_PATH, VNI_PARTITIONS_PATH,
};
use crate::models::{
    DocumentLinks, EdgePort, EnforcementTask, Port, PortPolicy, PortPolicyRequest, Switch,
    TaskInfo, Vlan, VlanRequest, VniBlock, VniBlockPatch, VniBlockRequest, VniPartition,
    VniPartitionRequest, STAGE_FINISHED, VLAN_STATUS_ONLINE,
};

/// Collection under which fake enforcement tasks are published.
pub const ENFORCEMENT_TASKS_PATH: &str = "/fabric/vni/enforcement-tasks";

/// A successful mutation recorded by [`FakeFabric`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FabricOp {
    CreatePartition(String),
    PatchPartition(String),
    DeletePartition(String),
    CreateBlock(String),
    PatchBlock(String),
    DeleteBlock(String),
    CreateVlan(u16),
    DeleteVlan(u16),
    CreatePortPolicy(String),
    DeletePortPolicy(String),
    SetPortPolicyLinks { port: String, links: Vec<String> },
}

impl FabricOp {
    /// Returns true for port policy-link replacements.
    pub fn is_port_patch(&self) -> bool {
        matches!(self, FabricOp::SetPortPolicyLinks { .. })
    }

    /// Returns true for VLAN, port-policy and port mutations.
    pub fn touches_vlan(&self) -> bool {
        matches!(
            self,
            FabricOp::CreateVlan(_)
                | FabricOp::DeleteVlan(_)
                | FabricOp::CreatePortPolicy(_)
                | FabricOp::DeletePortPolicy(_)
                | FabricOp::SetPortPolicyLinks { .. }
        )
    }
}

/// Endpoints that can be made to fail with an injected HTTP 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Authenticate,
    ListSwitches,
    CreatePartition,
    PatchPartition,
    DeletePartition,
    CreateBlock,
    PatchBlock,
    DeleteBlock,
    CreateVlan,
    DeleteVlan,
    CreatePortPolicy,
    DeletePortPolicy,
    SetPortPolicyLinks,
}

#[derive(Debug, Default)]
struct State {
    switches: BTreeMap<String, Switch>,
    ports: BTreeMap<String, Port>,
    partitions: BTreeMap<String, VniPartition>,
    blocks: BTreeMap<String, VniBlock>,
    vlans: BTreeMap<u16, Vlan>,
    policies: BTreeMap<String, PortPolicy>,
    tasks: HashMap<String, VecDeque<String>>,
    task_script: Vec<String>,
    next_task: u64,
    failures: HashSet<FailPoint>,
    journal: Vec<FabricOp>,
    auth_calls: usize,
    task_polls: usize,
}

impl State {
    fn check(&self, point: FailPoint, method: &str, path: &str) -> FabricResult<()> {
        if self.failures.contains(&point) {
            return Err(FabricError::api(method, path, 500, "injected failure"));
        }
        Ok(())
    }

    fn new_task(&mut self) -> String {
        self.next_task += 1;
        let link = member_path(ENFORCEMENT_TASKS_PATH, &self.next_task.to_string());
        let stages: VecDeque<String> = if self.task_script.is_empty() {
            VecDeque::from([STAGE_FINISHED.to_string()])
        } else {
            self.task_script.iter().cloned().collect()
        };
        self.tasks.insert(link.clone(), stages);
        link
    }
}

/// In-memory [`FabricApi`] implementation.
#[derive(Debug, Default)]
pub struct FakeFabric {
    state: Mutex<State>,
}

impl FakeFabric {
    /// Creates an empty fabric whose enforcement tasks finish on first poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a switch without edge ports.
    pub fn add_switch(&self, name: &str, grp_id: u32, swc_num: u32) {
        let mut state = self.state.lock();
        state.switches.insert(
            name.to_string(),
            Switch {
                grp_id,
                swc_num,
                display_name: name.to_string(),
                edge_ports: Vec::new(),
                document_self_link: member_path(SWITCHES_PATH, name),
            },
        );
    }

    /// Adds an edge port to an existing switch and publishes its port document.
    ///
    /// `dst_port` is the peer descriptor, i.e. the node xname followed by a
    /// two character suffix.
    pub fn add_edge_port(&self, switch: &str, port_num: u32, conn_port: &str, dst_port: &str) {
        let mut state = self.state.lock();
        let Some(sw) = state.switches.get_mut(switch) else {
            panic!("add_edge_port: unknown switch {}", switch);
        };
        sw.edge_ports.push(EdgePort {
            port_num,
            conn_port: conn_port.to_string(),
        });
        state.ports.insert(
            conn_port.to_string(),
            Port {
                switch_link: member_path(SWITCHES_PATH, switch),
                port_number: port_num,
                conn_port: conn_port.to_string(),
                dst_port: dst_port.to_string(),
                port_policy_links: Vec::new(),
                document_self_link: member_path(PORTS_PATH, conn_port),
            },
        );
    }

    /// Preloads a VLAN that the controller did not create (not journaled).
    pub fn insert_vlan(&self, id: u16, name: &str) {
        self.state.lock().vlans.insert(
            id,
            Vlan {
                id,
                name: name.to_string(),
                status: VLAN_STATUS_ONLINE.to_string(),
                document_self_link: vlan_link(id),
            },
        );
    }

    /// Preloads policy links on a port (not journaled).
    pub fn set_port_links(&self, port: &str, links: &[&str]) {
        if let Some(p) = self.state.lock().ports.get_mut(port) {
            p.port_policy_links = links.iter().map(|l| l.to_string()).collect();
        }
    }

    /// Stage sequence reported by enforcement tasks created from now on.
    ///
    /// Each poll consumes one stage; the last stage is reported forever.
    pub fn set_task_stages(&self, stages: &[&str]) {
        self.state.lock().task_script = stages.iter().map(|s| s.to_string()).collect();
    }

    /// Makes an endpoint fail with HTTP 500 until [`FakeFabric::clear_failure`].
    pub fn fail_on(&self, point: FailPoint) {
        self.state.lock().failures.insert(point);
    }

    pub fn clear_failure(&self, point: FailPoint) {
        self.state.lock().failures.remove(&point);
    }

    /// Snapshot of the mutation journal.
    pub fn journal(&self) -> Vec<FabricOp> {
        self.state.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    pub fn partition(&self, name: &str) -> Option<VniPartition> {
        self.state.lock().partitions.get(name).cloned()
    }

    pub fn block(&self, name: &str) -> Option<VniBlock> {
        self.state.lock().blocks.get(name).cloned()
    }

    pub fn vlans(&self) -> Vec<Vlan> {
        self.state.lock().vlans.values().cloned().collect()
    }

    /// VLANs whose name equals the given tenant.
    pub fn vlans_named(&self, name: &str) -> Vec<Vlan> {
        self.state
            .lock()
            .vlans
            .values()
            .filter(|v| v.name == name)
            .cloned()
            .collect()
    }

    pub fn policy(&self, name: &str) -> Option<PortPolicy> {
        self.state.lock().policies.get(name).cloned()
    }

    pub fn port(&self, name: &str) -> Option<Port> {
        self.state.lock().ports.get(name).cloned()
    }

    /// Number of times [`FabricApi::authenticate`] was called.
    pub fn auth_calls(&self) -> usize {
        self.state.lock().auth_calls
    }

    /// Number of enforcement task polls served.
    pub fn task_polls(&self) -> usize {
        self.state.lock().task_polls
    }
}

fn links_of<'a>(links: impl Iterator<Item = &'a str>) -> DocumentLinks {
    let document_links: Vec<String> = links.map(|l| l.to_string()).collect();
    DocumentLinks {
        document_count: document_links.len() as u64,
        document_links,
    }
}

#[async_trait]
impl FabricApi for FakeFabric {
    async fn authenticate(&self) -> FabricResult<()> {
        let mut state = self.state.lock();
        state.check(FailPoint::Authenticate, "POST", "/token")?;
        state.auth_calls += 1;
        Ok(())
    }

    async fn list_switches(&self) -> FabricResult<Vec<String>> {
        let state = self.state.lock();
        state.check(FailPoint::ListSwitches, "GET", SWITCHES_PATH)?;
        Ok(state.switches.keys().cloned().collect())
    }

    async fn get_switch(&self, name: &str) -> FabricResult<Switch> {
        let path = member_path(SWITCHES_PATH, name);
        self.state
            .lock()
            .switches
            .get(name)
            .cloned()
            .ok_or_else(|| FabricError::not_found("GET", path))
    }

    async fn get_port(&self, name: &str) -> FabricResult<Port> {
        let path = member_path(PORTS_PATH, name);
        self.state
            .lock()
            .ports
            .get(name)
            .cloned()
            .ok_or_else(|| FabricError::not_found("GET", path))
    }

    async fn set_port_policy_links(&self, name: &str, links: Vec<String>) -> FabricResult<()> {
        let path = member_path(PORTS_PATH, name);
        let mut state = self.state.lock();
        state.check(FailPoint::SetPortPolicyLinks, "PATCH", &path)?;
        let port = state
            .ports
            .get_mut(name)
            .ok_or_else(|| FabricError::not_found("PATCH", path))?;
        port.port_policy_links = links.clone();
        state.journal.push(FabricOp::SetPortPolicyLinks {
            port: name.to_string(),
            links,
        });
        Ok(())
    }

    async fn list_vni_partitions(&self) -> FabricResult<DocumentLinks> {
        let state = self.state.lock();
        Ok(links_of(
            state
                .partitions
                .values()
                .map(|p| p.document_self_link.as_str()),
        ))
    }

    async fn get_vni_partition(&self, name: &str) -> FabricResult<VniPartition> {
        let path = member_path(VNI_PARTITIONS_PATH, name);
        self.state
            .lock()
            .partitions
            .get(name)
            .cloned()
            .ok_or_else(|| FabricError::not_found("GET", path))
    }

    async fn create_vni_partition(
        &self,
        request: &VniPartitionRequest,
    ) -> FabricResult<VniPartition> {
        let mut state = self.state.lock();
        state.check(FailPoint::CreatePartition, "POST", VNI_PARTITIONS_PATH)?;
        let name = request.partition_name.clone();
        if name.is_empty() {
            return Err(FabricError::api(
                "POST",
                VNI_PARTITIONS_PATH,
                400,
                "partitionName is required",
            ));
        }
        if state.partitions.contains_key(&name) {
            return Err(FabricError::api(
                "POST",
                VNI_PARTITIONS_PATH,
                409,
                format!("partition {} already exists", name),
            ));
        }
        let partition = VniPartition {
            partition_name: name.clone(),
            vni_count: request.vni_count,
            vni_ranges: request.vni_ranges.clone(),
            edge_port_dfa: request.edge_port_dfas.clone(),
            document_self_link: member_path(VNI_PARTITIONS_PATH, &name),
        };
        state.partitions.insert(name.clone(), partition.clone());
        state.journal.push(FabricOp::CreatePartition(name));
        Ok(partition)
    }

    async fn patch_vni_partition(
        &self,
        name: &str,
        request: &VniPartitionRequest,
    ) -> FabricResult<VniPartition> {
        let path = member_path(VNI_PARTITIONS_PATH, name);
        let mut state = self.state.lock();
        state.check(FailPoint::PatchPartition, "PATCH", &path)?;
        let partition = state
            .partitions
            .get_mut(name)
            .ok_or_else(|| FabricError::not_found("PATCH", path))?;
        if request.vni_count != 0 {
            partition.vni_count = request.vni_count;
        }
        if !request.vni_ranges.is_empty() {
            partition.vni_ranges = request.vni_ranges.clone();
        }
        if !request.edge_port_dfas.is_empty() {
            partition.edge_port_dfa = request.edge_port_dfas.clone();
        }
        let updated = partition.clone();
        state.journal.push(FabricOp::PatchPartition(name.to_string()));
        Ok(updated)
    }

    async fn delete_vni_partition(&self, name: &str) -> FabricResult<()> {
        let path = member_path(VNI_PARTITIONS_PATH, name);
        let mut state = self.state.lock();
        state.check(FailPoint::DeletePartition, "DELETE", &path)?;
        if !state.partitions.contains_key(name) {
            return Err(FabricError::not_found("DELETE", path));
        }
        if state.blocks.values().any(|b| b.partition_name == name) {
            return Err(FabricError::api(
                "DELETE",
                path,
                409,
                format!("partition {} still has VNI blocks", name),
            ));
        }
        state.partitions.remove(name);
        state.journal.push(FabricOp::DeletePartition(name.to_string()));
        Ok(())
    }

    async fn list_vni_blocks(&self) -> FabricResult<DocumentLinks> {
        let state = self.state.lock();
        Ok(links_of(
            state.blocks.values().map(|b| b.document_self_link.as_str()),
        ))
    }

    async fn create_vni_block(&self, request: &VniBlockRequest) -> FabricResult<VniBlock> {
        let mut state = self.state.lock();
        state.check(FailPoint::CreateBlock, "POST", VNI_BLOCKS_PATH)?;
        let name = request.vni_block_name.clone();
        if !state.partitions.contains_key(&request.partition_name) {
            return Err(FabricError::api(
                "POST",
                VNI_BLOCKS_PATH,
                400,
                format!("partition {} does not exist", request.partition_name),
            ));
        }
        if state.blocks.contains_key(&name) {
            return Err(FabricError::api(
                "POST",
                VNI_BLOCKS_PATH,
                409,
                format!("VNI block {} already exists", name),
            ));
        }
        let block = VniBlock {
            vni_block_name: name.clone(),
            partition_name: request.partition_name.clone(),
            vni_ranges: request.vni_ranges.clone(),
            port_dfas: request.port_dfas.clone(),
            enforcement_task_service_link: state.new_task(),
            document_self_link: member_path(VNI_BLOCKS_PATH, &name),
        };
        state.blocks.insert(name.clone(), block.clone());
        state.journal.push(FabricOp::CreateBlock(name));
        Ok(block)
    }

    async fn patch_vni_block(&self, name: &str, patch: &VniBlockPatch) -> FabricResult<VniBlock> {
        let path = member_path(VNI_BLOCKS_PATH, name);
        let mut state = self.state.lock();
        state.check(FailPoint::PatchBlock, "PATCH", &path)?;
        if !state.blocks.contains_key(name) {
            return Err(FabricError::not_found("PATCH", path));
        }
        let task = state.new_task();
        let block = state
            .blocks
            .get_mut(name)
            .ok_or_else(|| FabricError::not_found("PATCH", member_path(VNI_BLOCKS_PATH, name)))?;
        block.port_dfas = patch.port_dfas.clone();
        block.vni_ranges = patch.vni_ranges.clone();
        block.enforcement_task_service_link = task;
        let updated = block.clone();
        state.journal.push(FabricOp::PatchBlock(name.to_string()));
        Ok(updated)
    }

    async fn delete_vni_block(&self, name: &str) -> FabricResult<()> {
        let path = member_path(VNI_BLOCKS_PATH, name);
        let mut state = self.state.lock();
        state.check(FailPoint::DeleteBlock, "DELETE", &path)?;
        if state.blocks.remove(name).is_none() {
            return Err(FabricError::not_found("DELETE", path));
        }
        state.journal.push(FabricOp::DeleteBlock(name.to_string()));
        Ok(())
    }

    async fn get_enforcement_task(&self, link: &str) -> FabricResult<EnforcementTask> {
        let mut state = self.state.lock();
        state.task_polls += 1;
        let stages = state
            .tasks
            .get_mut(link)
            .ok_or_else(|| FabricError::not_found("GET", link))?;
        let stage = if stages.len() > 1 {
            stages.pop_front().unwrap_or_default()
        } else {
            stages.front().cloned().unwrap_or_default()
        };
        Ok(EnforcementTask {
            task_info: TaskInfo {
                stage,
                is_direct: false,
            },
            sub_stage: String::new(),
            document_self_link: link.to_string(),
        })
    }

    async fn list_vlans(&self) -> FabricResult<DocumentLinks> {
        let state = self.state.lock();
        Ok(links_of(
            state.vlans.values().map(|v| v.document_self_link.as_str()),
        ))
    }

    async fn get_vlan(&self, id: u16) -> FabricResult<Vlan> {
        self.state
            .lock()
            .vlans
            .get(&id)
            .cloned()
            .ok_or_else(|| FabricError::not_found("GET", vlan_link(id)))
    }

    async fn create_vlan(&self, request: &VlanRequest) -> FabricResult<Vlan> {
        let mut state = self.state.lock();
        state.check(FailPoint::CreateVlan, "POST", VLANS_PATH)?;
        if state.vlans.contains_key(&request.id) {
            return Err(FabricError::api(
                "POST",
                VLANS_PATH,
                409,
                format!("VLAN {} already exists", request.id),
            ));
        }
        let vlan = Vlan {
            id: request.id,
            name: request.name.clone(),
            status: request.status.clone(),
            document_self_link: vlan_link(request.id),
        };
        state.vlans.insert(request.id, vlan.clone());
        state.journal.push(FabricOp::CreateVlan(request.id));
        Ok(vlan)
    }

    async fn delete_vlan(&self, id: u16) -> FabricResult<()> {
        let path = vlan_link(id);
        let mut state = self.state.lock();
        state.check(FailPoint::DeleteVlan, "DELETE", &path)?;
        if !state.vlans.contains_key(&id) {
            return Err(FabricError::not_found("DELETE", path));
        }
        if state
            .policies
            .values()
            .any(|p| p.native_vlan_id == path || p.allowed_vlans.contains(&path))
        {
            return Err(FabricError::api(
                "DELETE",
                path,
                409,
                format!("VLAN {} is referenced by a port policy", id),
            ));
        }
        state.vlans.remove(&id);
        state.journal.push(FabricOp::DeleteVlan(id));
        Ok(())
    }

    async fn get_port_policy(&self, name: &str) -> FabricResult<PortPolicy> {
        self.state
            .lock()
            .policies
            .get(name)
            .cloned()
            .ok_or_else(|| FabricError::not_found("GET", port_policy_link(name)))
    }

    async fn create_port_policy(&self, request: &PortPolicyRequest) -> FabricResult<PortPolicy> {
        let mut state = self.state.lock();
        let link = port_policy_link(&request.document_self_link);
        state.check(FailPoint::CreatePortPolicy, "POST", &link)?;
        if state.policies.contains_key(&request.document_self_link) {
            return Err(FabricError::api(
                "POST",
                link,
                409,
                format!("port policy {} already exists", request.document_self_link),
            ));
        }
        let policy = PortPolicy {
            allowed_vlans: request.allowed_vlans.clone(),
            native_vlan_id: request.native_vlan_id.clone(),
            is_untagged_allowed: request.is_untagged_allowed,
            document_self_link: link,
        };
        state
            .policies
            .insert(request.document_self_link.clone(), policy.clone());
        state
            .journal
            .push(FabricOp::CreatePortPolicy(request.document_self_link.clone()));
        Ok(policy)
    }

    async fn delete_port_policy(&self, link: &str) -> FabricResult<()> {
        let name = policy_name_from_link(link)
            .unwrap_or_else(|| last_segment(link))
            .to_string();
        let path = port_policy_link(&name);
        let mut state = self.state.lock();
        state.check(FailPoint::DeletePortPolicy, "DELETE", &path)?;
        if !state.policies.contains_key(&name) {
            return Err(FabricError::not_found("DELETE", path));
        }
        if state
            .ports
            .values()
            .any(|p| p.port_policy_links.contains(&path))
        {
            return Err(FabricError::api(
                "DELETE",
                path,
                409,
                format!("port policy {} is still attached", name),
            ));
        }
        state.policies.remove(&name);
        state.journal.push(FabricOp::DeletePortPolicy(name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STAGE_FAILED;

    fn fabric_with_partition() -> FakeFabric {
        let fabric = FakeFabric::new();
        fabric.state.lock().partitions.insert(
            "t1".to_string(),
            VniPartition {
                partition_name: "t1".to_string(),
                document_self_link: member_path(VNI_PARTITIONS_PATH, "t1"),
                ..Default::default()
            },
        );
        fabric
    }

    #[tokio::test]
    async fn test_partition_delete_blocked_by_block() {
        let fabric = fabric_with_partition();
        fabric
            .create_vni_block(&VniBlockRequest {
                vni_block_name: "t1-blk".to_string(),
                partition_name: "t1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = fabric.delete_vni_partition("t1").await.unwrap_err();
        assert_eq!(err.status(), Some(409));

        fabric.delete_vni_block("t1-blk").await.unwrap();
        fabric.delete_vni_partition("t1").await.unwrap();
        assert_eq!(
            fabric.journal(),
            vec![
                FabricOp::CreateBlock("t1-blk".to_string()),
                FabricOp::DeleteBlock("t1-blk".to_string()),
                FabricOp::DeletePartition("t1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_block_requires_partition() {
        let fabric = FakeFabric::new();
        let err = fabric
            .create_vni_block(&VniBlockRequest {
                vni_block_name: "t1-blk".to_string(),
                partition_name: "t1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(fabric.journal().is_empty());
    }

    #[tokio::test]
    async fn test_task_stage_script() {
        let fabric = fabric_with_partition();
        fabric.set_task_stages(&["STARTED", STAGE_FAILED]);
        let block = fabric
            .create_vni_block(&VniBlockRequest {
                vni_block_name: "t1-blk".to_string(),
                partition_name: "t1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let link = block.enforcement_task_service_link;

        let mut stages = Vec::new();
        for _ in 0..3 {
            let task = fabric.get_enforcement_task(&link).await.unwrap();
            stages.push(task.task_info.stage);
        }
        assert_eq!(stages, vec!["STARTED", STAGE_FAILED, STAGE_FAILED]);
        assert_eq!(fabric.task_polls(), 3);
    }

    #[tokio::test]
    async fn test_vlan_delete_blocked_by_policy() {
        let fabric = FakeFabric::new();
        fabric.add_switch("sw1", 0, 0);
        fabric.add_edge_port("sw1", 1, "p1", "x1h0");
        fabric
            .create_vlan(&VlanRequest {
                id: 1,
                name: "t1".to_string(),
                status: "ONLINE".to_string(),
            })
            .await
            .unwrap();
        fabric
            .create_port_policy(&PortPolicyRequest {
                allowed_vlans: vec![vlan_link(1)],
                native_vlan_id: vlan_link(1),
                is_untagged_allowed: true,
                document_self_link: "t1".to_string(),
            })
            .await
            .unwrap();
        fabric
            .set_port_policy_links("p1", vec![port_policy_link("t1")])
            .await
            .unwrap();

        assert_eq!(fabric.delete_vlan(1).await.unwrap_err().status(), Some(409));
        assert_eq!(
            fabric
                .delete_port_policy("/fabric/port-policies/t1")
                .await
                .unwrap_err()
                .status(),
            Some(409)
        );

        fabric.set_port_policy_links("p1", vec![]).await.unwrap();
        fabric
            .delete_port_policy("/fabric/port-policies/t1")
            .await
            .unwrap();
        fabric.delete_vlan(1).await.unwrap();
        assert!(fabric.vlans().is_empty());
    }

    #[tokio::test]
    async fn test_fail_point() {
        let fabric = fabric_with_partition();
        fabric.fail_on(FailPoint::PatchPartition);
        let err = fabric
            .patch_vni_partition("t1", &VniPartitionRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));

        fabric.clear_failure(FailPoint::PatchPartition);
        fabric
            .patch_vni_partition("t1", &VniPartitionRequest::default())
            .await
            .unwrap();
    }
}
