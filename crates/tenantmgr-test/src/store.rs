//! In-memory tenant spec store

use async_trait::async_trait;
use parking_lot::Mutex;
use tenantmgrd::{ComputeTenant, NetworkTenant, SpecStore, TenantMgrError, TenantMgrResult};

#[derive(Debug, Default)]
struct Specs {
    compute: Vec<ComputeTenant>,
    network: Vec<NetworkTenant>,
    unavailable: bool,
}

/// Spec store that tests edit directly between cycles.
///
/// Upserts replace an existing tenant with the same `name`, keeping list
/// order stable.
#[derive(Debug, Default)]
pub struct InMemorySpecStore {
    specs: Mutex<Specs>,
}

impl InMemorySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a compute tenant
    pub fn upsert_compute(&self, tenant: ComputeTenant) {
        let mut specs = self.specs.lock();
        match specs.compute.iter_mut().find(|t| t.name == tenant.name) {
            Some(existing) => *existing = tenant,
            None => specs.compute.push(tenant),
        }
    }

    /// Adds or replaces a network tenant
    pub fn upsert_network(&self, tenant: NetworkTenant) {
        let mut specs = self.specs.lock();
        match specs.network.iter_mut().find(|t| t.name == tenant.name) {
            Some(existing) => *existing = tenant,
            None => specs.network.push(tenant),
        }
    }

    /// Removes a compute tenant; returns true if it existed
    pub fn remove_compute(&self, name: &str) -> bool {
        let mut specs = self.specs.lock();
        let before = specs.compute.len();
        specs.compute.retain(|t| t.name != name);
        specs.compute.len() != before
    }

    /// Removes a network tenant; returns true if it existed
    pub fn remove_network(&self, name: &str) -> bool {
        let mut specs = self.specs.lock();
        let before = specs.network.len();
        specs.network.retain(|t| t.name != name);
        specs.network.len() != before
    }

    /// Makes every read fail until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.specs.lock().unavailable = unavailable;
    }

    fn check(specs: &Specs) -> TenantMgrResult<()> {
        if specs.unavailable {
            return Err(TenantMgrError::spec_store("spec store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SpecStore for InMemorySpecStore {
    async fn list_compute_tenants(&self) -> TenantMgrResult<Vec<ComputeTenant>> {
        let specs = self.specs.lock();
        Self::check(&specs)?;
        Ok(specs.compute.clone())
    }

    async fn list_network_tenants(&self) -> TenantMgrResult<Vec<NetworkTenant>> {
        let specs = self.specs.lock();
        Self::check(&specs)?;
        Ok(specs.network.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::tenant_fixtures::compute_tenant;

    #[tokio::test]
    async fn test_upsert_replaces_by_name() {
        let store = InMemorySpecStore::new();
        store.upsert_compute(compute_tenant("t1", &["x1"], 1));
        store.upsert_compute(compute_tenant("t2", &["x2"], 1));
        store.upsert_compute(compute_tenant("t1", &["x1", "x3"], 2));

        let tenants = store.list_compute_tenants().await.unwrap();
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].generation, 2);
        assert_eq!(tenants[1].name, "t2");
    }

    #[tokio::test]
    async fn test_remove_and_get() {
        let store = InMemorySpecStore::new();
        store.upsert_compute(compute_tenant("t1", &["x1"], 1));
        assert!(store.get_compute_tenant("t1").await.unwrap().is_some());
        assert!(store.remove_compute("t1"));
        assert!(!store.remove_compute("t1"));
        assert!(store.get_compute_tenant("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = InMemorySpecStore::new();
        store.set_unavailable(true);
        assert!(store.list_network_tenants().await.is_err());
        store.set_unavailable(false);
        assert!(store.list_network_tenants().await.unwrap().is_empty());
    }
}
