//! Deletion ordering tests
//!
//! A deleted compute tenant is torn down block before partition, and port
//! policy detachment before policy deletion before VLAN deletion.

use fabric_client::fake::{FabricOp, FailPoint};
use fabric_orch_common::{CycleContext, Trigger};
use pretty_assertions::assert_eq;
use tenantmgr_test::{
    tenant_fixtures::{compute_tenant, network_tenant, t1_compute, t1_network},
    topology_fixtures::{PORT_X1, PORT_X2, PORT_X3},
    TenantTestEnv,
};

const QOS_POLICY: &str = "/fabric/port-policies/qos";

async fn converged_t1() -> TenantTestEnv {
    let env = TenantTestEnv::new();
    env.store.upsert_compute(t1_compute());
    env.store.upsert_network(t1_network());
    env.cycle().await.unwrap();
    env.fabric.clear_journal();
    env
}

#[tokio::test]
async fn test_teardown_order() {
    let env = converged_t1().await;
    env.store.remove_compute("t1");

    let stats = env
        .cycle_with(&Trigger::object("t1"), &CycleContext::new())
        .await
        .unwrap();
    assert_eq!(stats.deleted, 1);

    assert_eq!(
        env.fabric.journal(),
        vec![
            FabricOp::DeleteBlock("t1-blk".to_string()),
            FabricOp::DeletePartition("t1".to_string()),
            FabricOp::SetPortPolicyLinks {
                port: PORT_X1.to_string(),
                links: vec![]
            },
            FabricOp::SetPortPolicyLinks {
                port: PORT_X2.to_string(),
                links: vec![]
            },
            FabricOp::DeletePortPolicy("t1".to_string()),
            FabricOp::DeleteVlan(1),
        ]
    );
    assert!(env.mgr.cache().get("t1").is_none());
}

#[tokio::test]
async fn test_resync_sweeps_every_cached_tenant() {
    let env = converged_t1().await;
    env.store.remove_compute("t1");

    env.cycle().await.unwrap();
    assert!(env.fabric.partition("t1").is_none());
    assert!(env.fabric.policy("t1").is_none());
    assert!(env.fabric.vlans().is_empty());
}

#[tokio::test]
async fn test_block_name_from_cache_when_network_tenant_is_gone() {
    let env = converged_t1().await;
    env.store.remove_compute("t1");
    env.store.remove_network("t1-net");

    env.cycle().await.unwrap();
    let verifier = env.verifier();
    verifier
        .assert_before(
            &FabricOp::DeleteBlock("t1-blk".to_string()),
            &FabricOp::DeletePartition("t1".to_string()),
        )
        .unwrap();
    assert!(env.fabric.block("t1-blk").is_none());
}

#[tokio::test]
async fn test_detach_keeps_foreign_policies() {
    let env = TenantTestEnv::new();
    env.fabric.set_port_links(PORT_X1, &[QOS_POLICY]);
    env.store.upsert_compute(t1_compute());
    env.store.upsert_network(t1_network());
    env.cycle().await.unwrap();
    assert_eq!(
        env.fabric.port(PORT_X1).unwrap().port_policy_links,
        vec!["/fabric/port-policies/t1", QOS_POLICY]
    );

    env.store.remove_compute("t1");
    env.cycle().await.unwrap();
    assert_eq!(
        env.fabric.port(PORT_X1).unwrap().port_policy_links,
        vec![QOS_POLICY]
    );
}

/// Scenario:
/// 1. VLAN deletion fails after block, partition and policy are gone
/// 2. The cache entry survives, so the next cycle finishes the teardown
/// 3. Already-deleted resources are skipped
#[tokio::test]
async fn test_interrupted_teardown_resumes() {
    let env = converged_t1().await;
    env.store.remove_compute("t1");
    env.fabric.fail_on(FailPoint::DeleteVlan);

    assert!(env.cycle().await.is_err());
    assert!(env.fabric.partition("t1").is_none());
    assert!(env.fabric.policy("t1").is_none());
    assert_eq!(env.fabric.vlans_named("t1").len(), 1);
    assert!(env.mgr.cache().contains("t1"));

    env.fabric.clear_failure(FailPoint::DeleteVlan);
    env.fabric.clear_journal();
    env.cycle().await.unwrap();

    assert_eq!(env.fabric.journal(), vec![FabricOp::DeleteVlan(1)]);
    assert!(env.mgr.cache().is_empty());
}

#[tokio::test]
async fn test_other_tenants_untouched() {
    let env = TenantTestEnv::new();
    env.store.upsert_compute(t1_compute());
    env.store.upsert_network(t1_network());
    env.store
        .upsert_compute(compute_tenant("t2", &["x3"], 1));
    env.store
        .upsert_network(network_tenant("t2", "b2", 5, &["30-40"], 1));
    env.cycle().await.unwrap();

    env.store.remove_compute("t1");
    env.cycle().await.unwrap();

    assert!(env.fabric.partition("t2").is_some());
    assert!(env.fabric.block("t2-b2").is_some());
    assert_eq!(env.fabric.vlans_named("t2").len(), 1);
    assert_eq!(
        env.fabric.port(PORT_X3).unwrap().port_policy_links,
        vec!["/fabric/port-policies/t2"]
    );
    assert!(env.mgr.cache().contains("t2"));
}
