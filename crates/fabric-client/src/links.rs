//! Resource paths and document-link helpers.
//!
//! The fabric manager addresses every document by a self link such as
//! `/fabric/vlans/3` or `/fabric/port-policies/tenant-a`. List endpoints return
//! those links, so most lookups start by taking the last path segment.

use crate::error::{FabricError, FabricResult};

/// Switch collection.
pub const SWITCHES_PATH: &str = "/fabric/switches";

/// Port collection.
pub const PORTS_PATH: &str = "/fabric/ports";

/// VNI partition collection.
pub const VNI_PARTITIONS_PATH: &str = "/fabric/vni/partitions";

/// VNI block collection.
pub const VNI_BLOCKS_PATH: &str = "/fabric/vni/blocks";

/// VLAN collection.
pub const VLANS_PATH: &str = "/fabric/vlans";

/// Port policy collection.
pub const PORT_POLICIES_PATH: &str = "/fabric/port-policies";

/// Returns the last non-empty path segment of a document link.
///
/// ```
/// use fabric_client::links::last_segment;
///
/// assert_eq!(last_segment("/fabric/switches/x3000c0r15b0"), "x3000c0r15b0");
/// assert_eq!(last_segment("/fabric/vlans/7/"), "7");
/// assert_eq!(last_segment("plain"), "plain");
/// ```
pub fn last_segment(link: &str) -> &str {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Joins a collection path and a member key.
pub fn member_path(collection: &str, key: &str) -> String {
    format!("{}/{}", collection, key)
}

/// Link of the VLAN document with the given id.
pub fn vlan_link(id: u16) -> String {
    member_path(VLANS_PATH, &id.to_string())
}

/// Parses the numeric id out of a VLAN link.
pub fn vlan_id_from_link(link: &str) -> FabricResult<u16> {
    last_segment(link)
        .parse()
        .map_err(|_| FabricError::invalid_link(link, "VLAN link does not end in a numeric id"))
}

/// Link of the port policy named after a tenant.
pub fn port_policy_link(name: &str) -> String {
    member_path(PORT_POLICIES_PATH, name)
}

/// Name segment of a port-policy link, if the link points into the
/// port-policy collection.
pub fn policy_name_from_link(link: &str) -> Option<&str> {
    let rest = link.strip_prefix(PORT_POLICIES_PATH)?.strip_prefix('/')?;
    rest.split('/').next().filter(|name| !name.is_empty())
}

/// Fabric-side name of a tenant's VNI block.
pub fn vni_block_name(tenant_name: &str, block_name: &str) -> String {
    format!("{}-{}", tenant_name, block_name)
}
