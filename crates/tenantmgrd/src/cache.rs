//! Volatile per-tenant memory of what the controller last converged.
//!
//! The cache only lives as long as the process. After a restart it is
//! reseeded from the observed compute tenants on the first cycle, which makes
//! it approximate: a change made while the controller was down is taken as
//! the new baseline rather than replayed as an update.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::{ComputeTenant, NetworkTenant};

/// What the controller last saw for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    pub tenant_name: String,
    pub generation: i64,
    pub xnames: Vec<String>,
    /// Generation of the matching network tenant, once one was converged.
    pub network_generation: Option<i64>,
    /// Short block name, kept so teardown still works once the network
    /// tenant itself is gone.
    pub vni_block_name: Option<String>,
}

impl CacheEntry {
    /// Entry for a compute tenant, optionally with its network tenant.
    pub fn observe(tenant: &ComputeTenant, network: Option<&NetworkTenant>) -> Self {
        Self {
            tenant_name: tenant.tenant_name.clone(),
            generation: tenant.generation,
            xnames: tenant.xnames(),
            network_generation: network.map(|n| n.generation),
            vni_block_name: network.map(|n| n.vni_block_name.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    seeded: bool,
    entries: HashMap<String, CacheEntry>,
}

/// Tenant key → [`CacheEntry`], shared by concurrent cycles.
#[derive(Debug, Default)]
pub struct TenantCache {
    inner: Mutex<Inner>,
}

impl TenantCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds entries from the observed tenants, once per process.
    ///
    /// Returns false if the cache had already been seeded.
    pub fn seed_once<'a>(
        &self,
        tenants: impl IntoIterator<Item = (&'a ComputeTenant, Option<&'a NetworkTenant>)>,
    ) -> bool {
        let mut inner = self.inner.lock();
        if inner.seeded {
            return false;
        }
        for (tenant, network) in tenants {
            inner
                .entries
                .insert(tenant.name.clone(), CacheEntry::observe(tenant, network));
        }
        inner.seeded = true;
        true
    }

    pub fn is_seeded(&self) -> bool {
        self.inner.lock().seeded
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, entry: CacheEntry) {
        self.inner.lock().entries.insert(key.into(), entry);
    }

    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        self.inner.lock().entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Snapshot of all cached keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
