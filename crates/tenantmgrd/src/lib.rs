//! tenantmgrd - fabric tenant convergence controller
//!
//! Converges compute tenants (which nodes belong to a tenant) and network
//! tenants (which VNIs a tenant may use) into fabric resources: a VNI
//! partition, an enforced VNI block, and a VLAN with a port policy applied
//! to the tenant's edge ports.

pub mod cache;
pub mod config;
pub mod enforcement;
pub mod error;
pub mod lifecycle;
pub mod spec_store;
pub mod tenant_mgr;
pub mod topology;
pub mod types;
pub mod validation;
pub mod vlan_alloc;

pub use cache::{CacheEntry, TenantCache};
pub use config::TenantMgrConfig;
pub use enforcement::{EnforcementOutcome, EnforcementTracker};
pub use error::{TenantMgrError, TenantMgrResult};
pub use lifecycle::{
    LifecycleManager, TeardownPlan, TeardownStep, TenantVlan, UpdateOutcome, VlanInventory,
};
pub use spec_store::{FileSpecStore, SpecDocument, SpecStore};
pub use tenant_mgr::{CycleStats, EngineSettings, TenantMgr};
pub use topology::{EdgePortSet, TopologyResolver};
pub use types::{ComputeTenant, NetworkTenant, ResourceGroup, VniPartitionSpec};
pub use validation::{validate_vni_request, VniValidationError};
pub use vlan_alloc::{VlanAllocator, VlanBitmap};
