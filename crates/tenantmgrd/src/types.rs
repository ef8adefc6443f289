//! Desired-state tenant descriptors, as read from a [`crate::spec_store::SpecStore`].

use serde::{Deserialize, Serialize};

/// A group of physical nodes assigned to a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceGroup {
    /// Group type, e.g. "compute" or "application" (informational).
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub group_type: String,
    /// Physical node identifiers.
    pub xnames: Vec<String>,
}

/// Compute-tenant descriptor: which nodes belong to a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputeTenant {
    /// Object key of the tenant document.
    pub name: String,
    /// Tenant identity; names every fabric resource of the tenant.
    pub tenant_name: String,
    pub resource_groups: Vec<ResourceGroup>,
    /// Change counter, bumped on every spec edit.
    pub generation: i64,
}

impl ComputeTenant {
    /// All node ids of the tenant, concatenated across resource groups.
    pub fn xnames(&self) -> Vec<String> {
        self.resource_groups
            .iter()
            .flat_map(|g| g.xnames.iter().cloned())
            .collect()
    }
}

/// Requested VNI allocation of a network tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VniPartitionSpec {
    pub vni_count: i64,
    /// Inclusive `"start-end"` ranges; empty means unspecified.
    pub vni_ranges: Vec<String>,
}

/// Network-tenant descriptor: the VNI allocation wanted for a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkTenant {
    /// Object key of the tenant document.
    pub name: String,
    /// Matched by value against [`ComputeTenant::tenant_name`].
    pub tenant_name: String,
    pub vni_partition: VniPartitionSpec,
    /// Short block name; the fabric block is `"{tenant_name}-{vni_block_name}"`.
    pub vni_block_name: String,
    pub generation: i64,
}
