//! Topology resolution: node ids to edge ports and edge-port DFAs.
//!
//! The fabric does not index ports by the node they connect to, so every
//! lookup walks switches → edge ports → port documents and compares each
//! port's peer descriptor against the requested node ids.

use std::sync::Arc;

use fabric_client::{FabricApi, FabricResult};
use tracing::{debug, instrument};

/// Computes the DFA of an edge port from its position in the dragonfly.
///
/// ```
/// use tenantmgrd::topology::calculate_edge_port_dfa;
///
/// assert_eq!(calculate_edge_port_dfa(1, 2, 3), (1 << 23) | (2 << 18) | (3 << 12));
/// ```
pub fn calculate_edge_port_dfa(group_id: u32, switch_id: u32, port_id: u32) -> u32 {
    (group_id << 23) | (switch_id << 18) | (port_id << 12)
}

/// Node id a port is cabled to: the peer descriptor without its two
/// character suffix. Descriptors shorter than that identify no node.
pub fn node_of_dst_port(dst_port: &str) -> Option<&str> {
    let len = dst_port.len();
    if len < 2 {
        return None;
    }
    dst_port.get(..len - 2)
}

/// Edge ports matched for a set of nodes.
///
/// `dfas[i]` is the DFA of `ports[i]`. Both follow switch enumeration order
/// and are not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgePortSet {
    pub dfas: Vec<u32>,
    pub ports: Vec<String>,
}

impl EdgePortSet {
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }
}

/// An edge port with the policy links currently applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePortInfo {
    pub switch: String,
    pub port: String,
    pub policy_links: Vec<String>,
}

/// Maps nodes to edge ports by scanning the fabric.
#[derive(Clone)]
pub struct TopologyResolver {
    fabric: Arc<dyn FabricApi>,
}

impl TopologyResolver {
    pub fn new(fabric: Arc<dyn FabricApi>) -> Self {
        Self { fabric }
    }

    /// Resolves the edge ports (and their DFAs) cabled to any of `xnames`.
    #[instrument(skip(self, xnames), fields(nodes = xnames.len()))]
    pub async fn resolve(&self, xnames: &[String]) -> FabricResult<EdgePortSet> {
        let mut set = EdgePortSet::default();

        for switch_name in self.fabric.list_switches().await? {
            let switch = self.fabric.get_switch(&switch_name).await?;

            for edge in &switch.edge_ports {
                let port = self.fabric.get_port(&edge.conn_port).await?;
                let Some(node) = node_of_dst_port(&port.dst_port) else {
                    continue;
                };

                for xname in xnames.iter().filter(|x| x.as_str() == node) {
                    debug!(port = %edge.conn_port, xname = %xname, "Edge port found");
                    set.dfas.push(calculate_edge_port_dfa(
                        switch.grp_id,
                        switch.swc_num,
                        edge.port_num,
                    ));
                    set.ports.push(edge.conn_port.clone());
                }
            }
        }

        debug!(ports = set.len(), "Resolved edge ports");
        Ok(set)
    }

    /// Lists every edge port of the fabric with its current policy links.
    pub async fn edge_ports(&self) -> FabricResult<Vec<EdgePortInfo>> {
        let mut ports = Vec::new();
        for switch_name in self.fabric.list_switches().await? {
            let switch = self.fabric.get_switch(&switch_name).await?;
            for edge in &switch.edge_ports {
                let port = self.fabric.get_port(&edge.conn_port).await?;
                ports.push(EdgePortInfo {
                    switch: switch_name.clone(),
                    port: edge.conn_port.clone(),
                    policy_links: port.port_policy_links,
                });
            }
        }
        Ok(ports)
    }
}
