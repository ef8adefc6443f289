//! Typed client for the fabric-management REST API.
//!
//! The fabric manager owns switches, ports, VNI partitions and blocks, VLANs
//! and port policies. This crate is pure I/O: it knows the wire documents and
//! the endpoints, never the order in which a tenant's resources must be
//! created or torn down.
//!
//! - [`FabricApi`]: one async method per endpoint
//! - [`HttpFabricClient`]: `reqwest` implementation with bearer-token auth
//! - [`fake::FakeFabric`]: in-memory fabric with a mutation journal
//!   (`fake` feature)
//! - [`links`]: resource paths and document-link parsing
//!
//! # Example
//!
//! ```ignore
//! use fabric_client::{FabricApi, FabricClientConfig, HttpFabricClient};
//!
//! async fn show_switches() -> fabric_client::FabricResult<()> {
//!     let client = HttpFabricClient::new(&FabricClientConfig::default())?;
//!     for name in client.list_switches().await? {
//!         let sw = client.get_switch(&name).await?;
//!         println!("{} group={} switch={}", name, sw.grp_id, sw.swc_num);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod http;
pub mod links;
pub mod models;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use api::FabricApi;
pub use error::{FabricError, FabricResult};
pub use http::{ClientCredentials, FabricClientConfig, HttpFabricClient};
pub use models::{
    DocumentLinks, EdgePort, EnforcementTask, Port, PortPolicy, PortPolicyRequest, Switch,
    TaskInfo, Vlan, VlanRequest, VniBlock, VniBlockPatch, VniBlockRequest, VniPartition,
    VniPartitionRequest,
};
