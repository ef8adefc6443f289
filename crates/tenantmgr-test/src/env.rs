//! Engine wired to an in-memory fabric and spec store

use std::sync::Arc;
use std::time::Duration;

use fabric_client::fake::FakeFabric;
use fabric_orch_common::{BackoffPolicy, CycleContext, Trigger};
use tenantmgrd::{CycleStats, EngineSettings, TenantMgr, TenantMgrResult};

use crate::fixtures::topology_fixtures::two_switch_fabric;
use crate::store::InMemorySpecStore;
use crate::verification::JournalVerifier;

/// Test environment: fake fabric, editable specs and the engine under test.
pub struct TenantTestEnv {
    pub fabric: Arc<FakeFabric>,
    pub store: Arc<InMemorySpecStore>,
    pub mgr: TenantMgr,
}

impl TenantTestEnv {
    /// Two-switch fabric with a short, attempt-bounded enforcement poll.
    pub fn new() -> Self {
        Self::with_settings(EngineSettings {
            enforcement: BackoffPolicy {
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(100),
                multiplier: 2.0,
                max_attempts: 5,
                timeout: None,
            },
            ..Default::default()
        })
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let fabric = Arc::new(two_switch_fabric());
        let store = Arc::new(InMemorySpecStore::new());
        let mgr = TenantMgr::new(store.clone(), fabric.clone(), &settings)
            .unwrap_or_else(|e| panic!("invalid engine settings: {}", e));
        Self { fabric, store, mgr }
    }

    /// Runs one resync cycle.
    pub async fn cycle(&self) -> TenantMgrResult<CycleStats> {
        self.cycle_with(&Trigger::Resync, &CycleContext::new())
            .await
    }

    /// Runs one cycle for a trigger and context.
    pub async fn cycle_with(
        &self,
        trigger: &Trigger,
        ctx: &CycleContext,
    ) -> TenantMgrResult<CycleStats> {
        self.mgr.converge(trigger, ctx).await
    }

    /// Snapshot of the fabric mutation journal.
    pub fn verifier(&self) -> JournalVerifier {
        JournalVerifier::new(self.fabric.journal())
    }
}

impl Default for TenantTestEnv {
    fn default() -> Self {
        Self::new()
    }
}
