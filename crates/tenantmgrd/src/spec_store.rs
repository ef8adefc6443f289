//! Source of desired tenant state.
//!
//! The controller only reads tenant specs. [`FileSpecStore`] re-reads a JSON
//! document on every call, so rewriting the file is all it takes for the
//! next periodic resync to pick up a change.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TenantMgrError, TenantMgrResult};
use crate::types::{ComputeTenant, NetworkTenant};

/// Read access to the tenant specs.
#[async_trait]
pub trait SpecStore: Send + Sync {
    async fn list_compute_tenants(&self) -> TenantMgrResult<Vec<ComputeTenant>>;

    async fn list_network_tenants(&self) -> TenantMgrResult<Vec<NetworkTenant>>;

    /// Fetches one compute tenant; `None` means it has been deleted.
    async fn get_compute_tenant(&self, key: &str) -> TenantMgrResult<Option<ComputeTenant>> {
        Ok(self
            .list_compute_tenants()
            .await?
            .into_iter()
            .find(|t| t.name == key))
    }
}

/// On-disk layout read by [`FileSpecStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecDocument {
    pub compute_tenants: Vec<ComputeTenant>,
    pub network_tenants: Vec<NetworkTenant>,
}

/// Spec store backed by a JSON file.
///
/// A missing file reads as an empty document.
#[derive(Debug, Clone)]
pub struct FileSpecStore {
    path: PathBuf,
}

impl FileSpecStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> TenantMgrResult<SpecDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Spec file not found, treating as empty");
                return Ok(SpecDocument::default());
            }
            Err(e) => {
                return Err(TenantMgrError::spec_store(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            TenantMgrError::spec_store(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl SpecStore for FileSpecStore {
    async fn list_compute_tenants(&self) -> TenantMgrResult<Vec<ComputeTenant>> {
        Ok(self.load().await?.compute_tenants)
    }

    async fn list_network_tenants(&self) -> TenantMgrResult<Vec<NetworkTenant>> {
        Ok(self.load().await?.network_tenants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOC: &str = r#"{
        "computeTenants": [
            {"name": "t1", "tenantName": "t1", "generation": 2,
             "resourceGroups": [{"type": "compute", "xnames": ["x1", "x2"]}]}
        ],
        "networkTenants": [
            {"name": "t1-net", "tenantName": "t1", "vniBlockName": "blk",
             "vniPartition": {"vniCount": 5, "vniRanges": ["10-20"]}}
        ]
    }"#;

    #[tokio::test]
    async fn test_reads_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOC.as_bytes()).unwrap();
        let store = FileSpecStore::new(file.path());

        let compute = store.list_compute_tenants().await.unwrap();
        assert_eq!(compute.len(), 1);
        assert_eq!(compute[0].xnames(), vec!["x1", "x2"]);

        let network = store.list_network_tenants().await.unwrap();
        assert_eq!(network[0].vni_partition.vni_count, 5);

        assert!(store.get_compute_tenant("t1").await.unwrap().is_some());
        assert!(store.get_compute_tenant("t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSpecStore::new(dir.path().join("absent.json"));
        assert!(store.list_compute_tenants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let store = FileSpecStore::new(file.path());
        let err = store.list_network_tenants().await.unwrap_err();
        assert!(matches!(err, TenantMgrError::SpecStore { .. }));
    }
}
