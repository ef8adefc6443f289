//! Configuration file support for tenantmgrd
//!
//! Loads and validates tenantmgrd configuration from TOML files.
//! Default location: /etc/tenantmgrd/tenantmgrd.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use fabric_client::http::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use fabric_client::{ClientCredentials, FabricClientConfig};
use fabric_orch_common::BackoffPolicy;

use crate::error::{TenantMgrError, TenantMgrResult};
use crate::tenant_mgr::EngineSettings;
use crate::vlan_alloc::{DEFAULT_MAX_VLAN_ID, DEFAULT_MIN_VLAN_ID, MAX_VALID_VLAN_ID};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tenantmgrd/tenantmgrd.toml";

/// Fabric API connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricConfig {
    /// Base URL of the fabric manager API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Accept any server certificate
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// PEM bundle of the CA that signs the fabric manager certificate
    #[serde(default = "default_ca_cert_path")]
    pub ca_cert_path: Option<PathBuf>,
}

/// Client-credentials authentication. Disabled when `token_endpoint` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token_endpoint: String,

    #[serde(default)]
    pub client_id: String,

    /// File holding the client secret (a mounted secret)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
}

/// Cycle scheduling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Delay between periodic resync cycles in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Upper bound for one cycle in seconds (0 = unbounded)
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,
}

/// Enforcement task polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Maximum number of polls (0 = unbounded)
    #[serde(default)]
    pub max_attempts: u32,

    /// Overall budget in seconds (0 = unbounded)
    #[serde(default = "default_enforcement_timeout")]
    pub timeout_secs: u64,
}

/// VLAN id range handed out to tenants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanConfig {
    #[serde(default = "default_vlan_min")]
    pub min_id: u16,

    #[serde(default = "default_vlan_max")]
    pub max_id: u16,
}

/// Tenant spec source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecStoreConfig {
    /// JSON document with `computeTenants` and `networkTenants`
    #[serde(default = "default_spec_path")]
    pub path: PathBuf,
}

/// Complete tenantmgrd configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantMgrConfig {
    #[serde(default)]
    pub fabric: FabricConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub enforcement: EnforcementConfig,

    #[serde(default)]
    pub vlan: VlanConfig,

    #[serde(default)]
    pub spec_store: SpecStoreConfig,
}

// Default functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_ca_cert_path() -> Option<PathBuf> {
    Some(PathBuf::from("/var/run/configmap/ca-public-key.pem"))
}

fn default_interval() -> u64 {
    60
}

fn default_cycle_timeout() -> u64 {
    600
}

fn default_initial_delay() -> u64 {
    100
}

fn default_max_delay() -> u64 {
    5000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_enforcement_timeout() -> u64 {
    300
}

fn default_vlan_min() -> u16 {
    DEFAULT_MIN_VLAN_ID
}

fn default_vlan_max() -> u16 {
    DEFAULT_MAX_VLAN_ID
}

fn default_spec_path() -> PathBuf {
    PathBuf::from("/etc/tenantmgrd/tenants.json")
}

// Default implementations
impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            skip_tls_verify: false,
            ca_cert_path: default_ca_cert_path(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            cycle_timeout_secs: default_cycle_timeout(),
        }
    }
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            max_attempts: 0,
            timeout_secs: default_enforcement_timeout(),
        }
    }
}

impl Default for VlanConfig {
    fn default() -> Self {
        Self {
            min_id: default_vlan_min(),
            max_id: default_vlan_max(),
        }
    }
}

impl Default for SpecStoreConfig {
    fn default() -> Self {
        Self {
            path: default_spec_path(),
        }
    }
}

impl TenantMgrConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> TenantMgrResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                TenantMgrError::Config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(TenantMgrError::Io(e)),
        }
    }

    /// Get resync interval as Duration
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile.interval_secs)
    }

    /// Get cycle timeout, if bounded
    pub fn cycle_timeout(&self) -> Option<Duration> {
        (self.reconcile.cycle_timeout_secs > 0)
            .then(|| Duration::from_secs(self.reconcile.cycle_timeout_secs))
    }

    /// Enforcement polling schedule
    pub fn enforcement_policy(&self) -> BackoffPolicy {
        let e = &self.enforcement;
        BackoffPolicy {
            initial_delay: Duration::from_millis(e.initial_delay_ms),
            max_delay: Duration::from_millis(e.max_delay_ms),
            multiplier: e.multiplier,
            max_attempts: e.max_attempts,
            timeout: (e.timeout_secs > 0).then(|| Duration::from_secs(e.timeout_secs)),
        }
    }

    /// Engine tunables
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            resync_interval: self.resync_interval(),
            enforcement: self.enforcement_policy(),
            vlan_min: self.vlan.min_id,
            vlan_max: self.vlan.max_id,
        }
    }

    /// HTTP client settings
    pub fn client_config(&self) -> FabricClientConfig {
        FabricClientConfig {
            base_url: self.fabric.base_url.clone(),
            request_timeout: Duration::from_secs(self.fabric.request_timeout_secs),
            skip_tls_verify: self.fabric.skip_tls_verify,
            ca_cert_path: self.fabric.ca_cert_path.clone(),
        }
    }

    /// Reads the client secret and builds credentials; `None` when
    /// authentication is disabled.
    pub fn credentials(&self) -> TenantMgrResult<Option<ClientCredentials>> {
        if self.auth.token_endpoint.is_empty() {
            return Ok(None);
        }
        let secret_file = self.auth.client_secret_file.as_ref().ok_or_else(|| {
            TenantMgrError::Config("auth.client_secret_file is required".to_string())
        })?;
        let secret = fs::read_to_string(secret_file)?;
        Ok(Some(ClientCredentials {
            token_endpoint: self.auth.token_endpoint.clone(),
            client_id: self.auth.client_id.clone(),
            client_secret: secret.trim().to_string(),
        }))
    }

    /// Validate configuration
    pub fn validate(&self) -> TenantMgrResult<()> {
        if self.fabric.base_url.is_empty() {
            return Err(TenantMgrError::Config(
                "fabric.base_url must not be empty".to_string(),
            ));
        }

        if self.fabric.request_timeout_secs == 0 {
            return Err(TenantMgrError::Config(
                "fabric.request_timeout_secs must be > 0".to_string(),
            ));
        }

        if !self.auth.token_endpoint.is_empty()
            && (self.auth.client_id.is_empty() || self.auth.client_secret_file.is_none())
        {
            return Err(TenantMgrError::Config(
                "auth.client_id and auth.client_secret_file are required with a token endpoint"
                    .to_string(),
            ));
        }

        if self.reconcile.interval_secs == 0 {
            return Err(TenantMgrError::Config(
                "reconcile.interval_secs must be > 0".to_string(),
            ));
        }

        if self.enforcement.initial_delay_ms == 0
            || self.enforcement.max_delay_ms < self.enforcement.initial_delay_ms
        {
            return Err(TenantMgrError::Config(
                "enforcement delays must satisfy 0 < initial_delay_ms <= max_delay_ms".to_string(),
            ));
        }

        if self.enforcement.multiplier < 1.0 {
            return Err(TenantMgrError::Config(
                "enforcement.multiplier must be >= 1.0".to_string(),
            ));
        }

        if self.vlan.min_id == 0
            || self.vlan.min_id > self.vlan.max_id
            || self.vlan.max_id > MAX_VALID_VLAN_ID
        {
            return Err(TenantMgrError::Config(format!(
                "vlan range must satisfy 1 <= min_id <= max_id <= {}",
                MAX_VALID_VLAN_ID
            )));
        }

        Ok(())
    }
}
