//! Request and response documents of the fabric-management API.
//!
//! Field names follow the wire format exactly (mostly camelCase, with a few
//! snake_case exceptions such as `conn_port`). Response documents default any
//! missing field so that partial documents still decode.

use serde::{Deserialize, Serialize};

/// Enforcement stage reported once a task completed successfully.
pub const STAGE_FINISHED: &str = "FINISHED";

/// Enforcement stage reported once a task gave up.
pub const STAGE_FAILED: &str = "FAILED";

/// Status given to VLANs created by the controller.
pub const VLAN_STATUS_ONLINE: &str = "ONLINE";

/// Collection document returned by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentLinks {
    /// Links to the member documents, e.g. `/fabric/vlans/3`.
    pub document_links: Vec<String>,
    /// Number of member documents.
    pub document_count: u64,
}

/// Switch document (`GET /fabric/switches/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Switch {
    /// Dragonfly group of the switch.
    pub grp_id: u32,
    /// Switch number inside the group.
    pub swc_num: u32,
    /// Display name.
    pub display_name: String,
    /// Ports that connect to compute nodes.
    pub edge_ports: Vec<EdgePort>,
    /// Self link.
    pub document_self_link: String,
}

/// Edge port entry embedded in a switch document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgePort {
    /// Port number on the switch.
    #[serde(rename = "portNum")]
    pub port_num: u32,
    /// Name of the port document (`/fabric/ports/{conn_port}`).
    pub conn_port: String,
}

/// Port document (`GET /fabric/ports/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    #[serde(rename = "switchLink")]
    pub switch_link: String,
    #[serde(rename = "portNumber")]
    pub port_number: u32,
    pub conn_port: String,
    /// Peer descriptor: node xname followed by a two character suffix.
    pub dst_port: String,
    /// Port policies applied to the port, in precedence order.
    #[serde(rename = "portPolicyLinks")]
    pub port_policy_links: Vec<String>,
    #[serde(rename = "documentSelfLink")]
    pub document_self_link: String,
}

/// Body of `PATCH /fabric/ports/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortPatch {
    /// Complete replacement list of policy links.
    pub port_policy_links: Vec<String>,
}

/// Body of `POST` and `PATCH` on `/fabric/vni/partitions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VniPartitionRequest {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub partition_name: String,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub vni_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vni_ranges: Vec<String>,
    #[serde(rename = "edgePortDFAs", skip_serializing_if = "Vec::is_empty", default)]
    pub edge_port_dfas: Vec<u32>,
}

/// VNI partition document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VniPartition {
    pub partition_name: String,
    pub vni_count: i64,
    pub vni_ranges: Vec<String>,
    #[serde(rename = "edgePortDFA")]
    pub edge_port_dfa: Vec<u32>,
    pub document_self_link: String,
}

/// Body of `POST /fabric/vni/blocks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VniBlockRequest {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub vni_block_name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub partition_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vni_ranges: Vec<String>,
    #[serde(rename = "portDFAs", skip_serializing_if = "Vec::is_empty", default)]
    pub port_dfas: Vec<u32>,
}

/// Body of `PATCH /fabric/vni/blocks/{name}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VniBlockPatch {
    #[serde(rename = "portDFAs")]
    pub port_dfas: Vec<u32>,
    pub vni_ranges: Vec<String>,
}

/// VNI block document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VniBlock {
    pub vni_block_name: String,
    pub partition_name: String,
    pub vni_ranges: Vec<String>,
    #[serde(rename = "portDFAs")]
    pub port_dfas: Vec<u32>,
    /// Task document that tracks hardware enforcement of this block.
    pub enforcement_task_service_link: String,
    pub document_self_link: String,
}

/// Enforcement task document polled after a block is created or patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnforcementTask {
    pub task_info: TaskInfo,
    pub sub_stage: String,
    pub document_self_link: String,
}

/// Stage information of an enforcement task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskInfo {
    pub stage: String,
    pub is_direct: bool,
}

/// Body of `POST /fabric/vlans`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanRequest {
    pub id: u16,
    pub name: String,
    pub status: String,
}

/// VLAN document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vlan {
    pub id: u16,
    pub name: String,
    pub status: String,
    #[serde(rename = "documentSelfLink")]
    pub document_self_link: String,
}

/// Body of `POST /fabric/port-policies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortPolicyRequest {
    pub allowed_vlans: Vec<String>,
    pub native_vlan_id: String,
    pub is_untagged_allowed: bool,
    /// Requested self link; the fabric places the policy under
    /// `/fabric/port-policies/{document_self_link}`.
    pub document_self_link: String,
}

/// Port policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortPolicy {
    pub allowed_vlans: Vec<String>,
    pub native_vlan_id: String,
    pub is_untagged_allowed: bool,
    pub document_self_link: String,
}

/// Error document returned with any non-success status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorResponse {
    pub message: String,
    pub status_code: u16,
    pub document_kind: String,
    pub error_code: i64,
}

/// Token endpoint response of the client-credentials exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
    pub scope: String,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}
