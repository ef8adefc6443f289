//! Convergence integration tests
//!
//! Drives the engine against the in-memory fabric through create, update
//! and enforcement scenarios.

use std::time::Duration;

use fabric_client::fake::{FabricOp, FailPoint};
use fabric_client::models::{STAGE_FAILED, STAGE_FINISHED, VLAN_STATUS_ONLINE};
use fabric_orch_common::{BackoffPolicy, CycleContext, Trigger};
use pretty_assertions::assert_eq;
use tenantmgr_test::{
    tenant_fixtures::{compute_tenant, network_tenant, t1_compute, t1_network},
    topology_fixtures::{PORT_X1, PORT_X2, PORT_X3, PORT_X4},
    TenantTestEnv,
};
use tenantmgrd::topology::calculate_edge_port_dfa;
use tenantmgrd::{EngineSettings, TenantMgrError};

const T1_POLICY: &str = "/fabric/port-policies/t1";

fn t1_env() -> TenantTestEnv {
    let env = TenantTestEnv::new();
    env.store.upsert_compute(t1_compute());
    env.store.upsert_network(t1_network());
    env
}

/// Scenario:
/// 1. Tenant t1 on x1, x2 with 5 VNIs in 10-20 and block "blk"
/// 2. One cycle creates partition, VLAN, port policy and block
#[tokio::test]
async fn test_t1_end_to_end() {
    let env = t1_env();

    let stats = env.cycle().await.unwrap();
    assert_eq!(stats.partitions_created, 1);
    assert_eq!(stats.vlans_created, 1);
    assert_eq!(stats.blocks_created, 1);

    let dfas = vec![
        calculate_edge_port_dfa(0, 1, 1),
        calculate_edge_port_dfa(0, 1, 2),
    ];

    let partition = env.fabric.partition("t1").unwrap();
    assert_eq!(partition.vni_count, 5);
    assert_eq!(partition.vni_ranges, vec!["10-20"]);
    assert_eq!(partition.edge_port_dfa, dfas);

    let block = env.fabric.block("t1-blk").unwrap();
    assert_eq!(block.partition_name, "t1");
    assert_eq!(block.vni_ranges, vec!["10-20"]);
    assert_eq!(block.port_dfas, dfas);

    let vlans = env.fabric.vlans_named("t1");
    assert_eq!(vlans.len(), 1);
    assert_eq!(vlans[0].id, 1);
    assert_eq!(vlans[0].status, VLAN_STATUS_ONLINE);

    let policy = env.fabric.policy("t1").unwrap();
    assert_eq!(policy.native_vlan_id, "/fabric/vlans/1");
    assert_eq!(policy.allowed_vlans, vec!["/fabric/vlans/1"]);
    assert!(policy.is_untagged_allowed);

    for port in [PORT_X1, PORT_X2] {
        assert_eq!(
            env.fabric.port(port).unwrap().port_policy_links,
            vec![T1_POLICY]
        );
    }
    for port in [PORT_X3, PORT_X4] {
        assert!(env.fabric.port(port).unwrap().port_policy_links.is_empty());
    }

    let verifier = env.verifier();
    verifier
        .assert_before(
            &FabricOp::CreatePartition("t1".to_string()),
            &FabricOp::CreateBlock("t1-blk".to_string()),
        )
        .unwrap();
    verifier
        .assert_before(
            &FabricOp::CreateVlan(1),
            &FabricOp::CreatePortPolicy("t1".to_string()),
        )
        .unwrap();
    verifier.assert_no_duplicate_creates().unwrap();
}

#[tokio::test]
async fn test_converged_tenant_is_idempotent() {
    let env = t1_env();
    env.cycle().await.unwrap();
    env.fabric.clear_journal();

    for _ in 0..3 {
        let stats = env.cycle().await.unwrap();
        assert_eq!(stats.updated, 0);
    }
    env.verifier().assert_no_mutations().unwrap();
}

/// Scenario:
/// 1. Converge t1
/// 2. Change the VNI ranges to 30-40, same nodes
/// 3. Partition and block are patched; the VLAN is untouched
#[tokio::test]
async fn test_vni_ranges_change_patches_in_place() {
    let env = t1_env();
    env.cycle().await.unwrap();
    env.fabric.clear_journal();

    env.store
        .upsert_network(network_tenant("t1", "blk", 5, &["30-40"], 2));
    let stats = env.cycle().await.unwrap();
    assert_eq!(stats.updated, 1);

    assert_eq!(
        env.fabric.journal(),
        vec![
            FabricOp::PatchPartition("t1".to_string()),
            FabricOp::PatchBlock("t1-blk".to_string()),
        ]
    );
    env.verifier().assert_none(FabricOp::touches_vlan).unwrap();
    assert_eq!(env.fabric.partition("t1").unwrap().vni_ranges, vec!["30-40"]);
    assert_eq!(env.fabric.block("t1-blk").unwrap().vni_ranges, vec!["30-40"]);
    assert_eq!(env.fabric.vlans_named("t1").len(), 1);
}

#[tokio::test]
async fn test_generation_bump_without_node_change_is_noop() {
    let env = t1_env();
    env.cycle().await.unwrap();
    env.fabric.clear_journal();

    env.store
        .upsert_compute(compute_tenant("t1", &["x2", "x1"], 2));
    let stats = env.cycle().await.unwrap();
    assert_eq!(stats.updated, 1);
    env.verifier().assert_no_mutations().unwrap();
    assert_eq!(env.mgr.cache().get("t1").unwrap().generation, 2);
}

/// Scenario:
/// 1. Converge t1 on x1, x2
/// 2. Move t1 to x1, x3
/// 3. Block gets the new DFAs; the VLAN policy moves from x2's port to x3's
#[tokio::test]
async fn test_node_change_replaces_vlan() {
    let env = t1_env();
    env.cycle().await.unwrap();
    env.fabric.clear_journal();

    env.store
        .upsert_compute(compute_tenant("t1", &["x1", "x3"], 2));
    env.cycle().await.unwrap();

    let dfas = vec![
        calculate_edge_port_dfa(0, 1, 1),
        calculate_edge_port_dfa(1, 2, 3),
    ];
    assert_eq!(env.fabric.partition("t1").unwrap().edge_port_dfa, dfas);
    assert_eq!(env.fabric.block("t1-blk").unwrap().port_dfas, dfas);

    let verifier = env.verifier();
    verifier
        .assert_before(
            &FabricOp::PatchBlock("t1-blk".to_string()),
            &FabricOp::DeleteVlan(1),
        )
        .unwrap();
    verifier
        .assert_before(&FabricOp::DeleteVlan(1), &FabricOp::CreateVlan(1))
        .unwrap();

    assert_eq!(env.fabric.vlans_named("t1").len(), 1);
    assert_eq!(
        env.fabric.port(PORT_X1).unwrap().port_policy_links,
        vec![T1_POLICY]
    );
    assert!(env.fabric.port(PORT_X2).unwrap().port_policy_links.is_empty());
    assert_eq!(
        env.fabric.port(PORT_X3).unwrap().port_policy_links,
        vec![T1_POLICY]
    );
}

/// Scenario:
/// 1. Converge t1
/// 2. Partition PATCH fails while adding x4
/// 3. Everything is torn down and created again with the new node set
#[tokio::test]
async fn test_partition_patch_failure_compensates() {
    let env = t1_env();
    env.cycle().await.unwrap();
    env.fabric.clear_journal();
    env.fabric.fail_on(FailPoint::PatchPartition);

    env.store
        .upsert_compute(compute_tenant("t1", &["x1", "x2", "x4"], 2));
    env.cycle().await.unwrap();

    let verifier = env.verifier();
    let delete_block = FabricOp::DeleteBlock("t1-blk".to_string());
    let delete_partition = FabricOp::DeletePartition("t1".to_string());
    let create_partition = FabricOp::CreatePartition("t1".to_string());
    let create_block = FabricOp::CreateBlock("t1-blk".to_string());
    verifier.assert_before(&delete_block, &delete_partition).unwrap();
    verifier
        .assert_before(&delete_partition, &FabricOp::DeleteVlan(1))
        .unwrap();
    verifier
        .assert_before(&FabricOp::DeleteVlan(1), &create_partition)
        .unwrap();
    verifier.assert_before(&create_partition, &create_block).unwrap();
    verifier.assert_none(|op| matches!(op, FabricOp::PatchBlock(_))).unwrap();

    assert_eq!(env.fabric.partition("t1").unwrap().edge_port_dfa.len(), 3);
    assert_eq!(env.fabric.vlans_named("t1").len(), 1);
    assert_eq!(
        env.fabric.port(PORT_X4).unwrap().port_policy_links,
        vec![T1_POLICY]
    );

    // The recreated tenant is the new baseline.
    env.fabric.clear_failure(FailPoint::PatchPartition);
    env.fabric.clear_journal();
    env.cycle().await.unwrap();
    env.verifier().assert_no_mutations().unwrap();
}

#[tokio::test]
async fn test_unmatched_tenants_produce_no_mutations() {
    let env = TenantTestEnv::new();
    env.store.upsert_compute(t1_compute());
    env.store
        .upsert_network(network_tenant("t9", "blk", 5, &["10-20"], 1));

    let stats = env.cycle().await.unwrap();
    assert_eq!(stats.unmatched, 1);
    env.verifier().assert_no_mutations().unwrap();
    assert!(env.fabric.vlans().is_empty());
}

#[tokio::test]
async fn test_tenants_get_distinct_vlans() {
    let env = t1_env();
    env.fabric.insert_vlan(1, "mgmt");
    env.store
        .upsert_compute(compute_tenant("t2", &["x3", "x4"], 1));
    env.store
        .upsert_network(network_tenant("t2", "b2", 10, &["100-200"], 1));

    env.cycle().await.unwrap();

    assert_eq!(env.fabric.vlans_named("t1")[0].id, 2);
    assert_eq!(env.fabric.vlans_named("t2")[0].id, 3);
    assert!(env.fabric.block("t2-b2").is_some());
    assert_eq!(
        env.fabric.port(PORT_X3).unwrap().port_policy_links,
        vec!["/fabric/port-policies/t2"]
    );
}

/// Scenario:
/// 1. Cycles for t1 and t2 run concurrently on one engine
/// 2. Enforcement polling makes each cycle yield while the other proceeds
/// 3. Both succeed, the tenants get different VLANs and both are cached
#[tokio::test]
async fn test_concurrent_cycles_share_allocator_and_cache() {
    let env = t1_env();
    env.fabric.set_task_stages(&["RUNNING", STAGE_FINISHED]);
    env.store
        .upsert_compute(compute_tenant("t2", &["x3", "x4"], 1));
    env.store
        .upsert_network(network_tenant("t2", "b2", 10, &["100-200"], 1));

    let ctx = CycleContext::new();
    let trigger1 = Trigger::object("t1");
    let trigger2 = Trigger::object("t2");
    let (t1, t2) = tokio::join!(
        env.mgr.converge(&trigger1, &ctx),
        env.mgr.converge(&trigger2, &ctx),
    );
    t1.unwrap();
    t2.unwrap();

    let t1_vlans = env.fabric.vlans_named("t1");
    let t2_vlans = env.fabric.vlans_named("t2");
    assert_eq!(t1_vlans.len(), 1);
    assert_eq!(t2_vlans.len(), 1);
    assert_ne!(t1_vlans[0].id, t2_vlans[0].id);

    assert!(env.mgr.cache().contains("t1"));
    assert!(env.mgr.cache().contains("t2"));
    assert!(env.fabric.block("t1-blk").is_some());
    assert!(env.fabric.block("t2-b2").is_some());
    assert_eq!(
        env.fabric.port(PORT_X3).unwrap().port_policy_links,
        vec!["/fabric/port-policies/t2"]
    );
    env.verifier().assert_no_duplicate_creates().unwrap();
}

#[tokio::test]
async fn test_invalid_vni_request_aborts_before_mutation() {
    let env = TenantTestEnv::new();
    env.store.upsert_compute(t1_compute());
    env.store
        .upsert_network(network_tenant("t1", "blk", 5, &["20-10"], 1));

    let err = env.cycle().await.unwrap_err();
    assert!(matches!(err, TenantMgrError::Validation(_)));
    assert_eq!(err.to_string(), "VNI range is invalid: [20-10]");
    env.verifier().assert_no_mutations().unwrap();
}

#[tokio::test]
async fn test_spec_store_failure_aborts_cycle() {
    let env = t1_env();
    env.store.set_unavailable(true);

    let err = env.cycle().await.unwrap_err();
    assert!(err.is_retryable());
    env.verifier().assert_no_mutations().unwrap();

    env.store.set_unavailable(false);
    env.cycle().await.unwrap();
    assert!(env.fabric.block("t1-blk").is_some());
}

#[tokio::test]
async fn test_failed_enforcement_does_not_abort() {
    let env = t1_env();
    env.fabric.set_task_stages(&[STAGE_FAILED]);

    env.cycle().await.unwrap();
    assert!(env.fabric.block("t1-blk").is_some());
    assert_eq!(env.fabric.vlans_named("t1").len(), 1);
    assert_eq!(env.fabric.task_polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_enforcement_does_not_abort() {
    let env = t1_env();
    env.fabric.set_task_stages(&["STARTED"]);

    env.cycle().await.unwrap();
    assert!(env.fabric.block("t1-blk").is_some());
    assert_eq!(env.fabric.task_polls(), 5);
}

/// Scenario:
/// 1. Enforcement never finishes and polling is unbounded
/// 2. The cycle deadline cancels the wait
/// 3. The next cycle resumes without recreating anything
#[tokio::test(start_paused = true)]
async fn test_cycle_deadline_interrupts_enforcement_wait() {
    let env = TenantTestEnv::with_settings(EngineSettings {
        enforcement: BackoffPolicy {
            max_attempts: 0,
            timeout: None,
            ..Default::default()
        },
        ..Default::default()
    });
    env.store.upsert_compute(t1_compute());
    env.store.upsert_network(t1_network());
    env.fabric.set_task_stages(&["STARTED"]);

    let ctx = CycleContext::with_timeout(Duration::from_secs(5));
    let err = env.cycle_with(&Trigger::Resync, &ctx).await.unwrap_err();
    assert!(matches!(err, TenantMgrError::Cancelled));
    assert!(env.fabric.block("t1-blk").is_some());

    env.fabric.clear_journal();
    env.cycle().await.unwrap();
    env.verifier().assert_no_mutations().unwrap();
}
