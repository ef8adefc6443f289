//! Test fixtures for tenants and fabric topology
//!
//! Provides reusable specs and a small two-switch fabric.

use fabric_client::fake::FakeFabric;

/// Tenant spec fixtures
pub mod tenant_fixtures {
    use tenantmgrd::{ComputeTenant, NetworkTenant, ResourceGroup, VniPartitionSpec};

    /// Compute tenant whose name and tenant name are both `name`
    pub fn compute_tenant(name: &str, xnames: &[&str], generation: i64) -> ComputeTenant {
        ComputeTenant {
            name: name.to_string(),
            tenant_name: name.to_string(),
            resource_groups: vec![ResourceGroup {
                group_type: "compute".to_string(),
                xnames: xnames.iter().map(|x| x.to_string()).collect(),
            }],
            generation,
        }
    }

    /// Network tenant `{tenant}-net` for `tenant`
    pub fn network_tenant(
        tenant: &str,
        block: &str,
        vni_count: i64,
        ranges: &[&str],
        generation: i64,
    ) -> NetworkTenant {
        NetworkTenant {
            name: format!("{}-net", tenant),
            tenant_name: tenant.to_string(),
            vni_partition: VniPartitionSpec {
                vni_count,
                vni_ranges: ranges.iter().map(|r| r.to_string()).collect(),
            },
            vni_block_name: block.to_string(),
            generation,
        }
    }

    /// Tenant `t1` on nodes x1 and x2
    pub fn t1_compute() -> ComputeTenant {
        compute_tenant("t1", &["x1", "x2"], 1)
    }

    /// Network tenant for `t1`: 5 VNIs in 10-20, block `blk`
    pub fn t1_network() -> NetworkTenant {
        network_tenant("t1", "blk", 5, &["10-20"], 1)
    }
}

/// Fabric topology fixtures
pub mod topology_fixtures {
    use super::*;

    /// First switch: group 0, switch 1
    pub const SWITCH_A: &str = "x1000c0r1b0";
    /// Second switch: group 1, switch 2
    pub const SWITCH_B: &str = "x1000c0r2b0";

    /// Edge port cabled to x1 (switch A, port 1)
    pub const PORT_X1: &str = "x1000c0r1j1p0";
    /// Edge port cabled to x2 (switch A, port 2)
    pub const PORT_X2: &str = "x1000c0r1j2p0";
    /// Edge port cabled to x3 (switch B, port 3)
    pub const PORT_X3: &str = "x1000c0r2j3p0";
    /// Edge port cabled to x4 (switch B, port 4)
    pub const PORT_X4: &str = "x1000c0r2j4p0";

    /// Two switches with nodes x1..x4 on one edge port each
    pub fn two_switch_fabric() -> FakeFabric {
        let fabric = FakeFabric::new();
        fabric.add_switch(SWITCH_A, 0, 1);
        fabric.add_edge_port(SWITCH_A, 1, PORT_X1, "x1h0");
        fabric.add_edge_port(SWITCH_A, 2, PORT_X2, "x2h0");
        fabric.add_switch(SWITCH_B, 1, 2);
        fabric.add_edge_port(SWITCH_B, 3, PORT_X3, "x3h0");
        fabric.add_edge_port(SWITCH_B, 4, PORT_X4, "x4h0");
        fabric
    }
}
