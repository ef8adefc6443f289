//! Error types for tenant convergence.

use fabric_client::FabricError;
use thiserror::Error;

use crate::validation::VniValidationError;

/// Result type alias for tenantmgrd operations.
pub type TenantMgrResult<T> = Result<T, TenantMgrError>;

/// Errors that abort a reconciliation cycle.
///
/// None of them is fatal to the daemon: the cycle is reported and retried on
/// the next trigger.
#[derive(Debug, Error)]
pub enum TenantMgrError {
    /// Fabric API call failed (transport, HTTP status or decode).
    #[error(transparent)]
    Fabric(#[from] FabricError),

    /// The network tenant's VNI request is malformed.
    #[error(transparent)]
    Validation(#[from] VniValidationError),

    /// The tenant spec store could not be read.
    #[error("Spec store error: {message}")]
    SpecStore {
        /// Error message.
        message: String,
    },

    /// Every VLAN id in the configured range is taken.
    #[error("No free VLAN id in [{min}, {max}]")]
    VlanExhausted {
        /// Lowest allocatable id.
        min: u16,
        /// Highest allocatable id.
        max: u16,
    },

    /// The network tenant names no VNI block.
    #[error("VNI block name is empty for tenant '{tenant}'")]
    MissingBlockName {
        /// Tenant name.
        tenant: String,
    },

    /// A VNI block response carried no enforcement task link.
    #[error("VNI block '{block}' has no enforcement task link")]
    MissingEnforcementLink {
        /// Fabric-side block name.
        block: String,
    },

    /// The cycle was cancelled or ran past its deadline.
    #[error("Cycle cancelled")]
    Cancelled,

    /// Configuration validation error.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TenantMgrError {
    /// Creates a spec store error.
    pub fn spec_store(message: impl Into<String>) -> Self {
        Self::SpecStore {
            message: message.into(),
        }
    }

    /// Creates a missing block name error.
    pub fn missing_block_name(tenant: impl Into<String>) -> Self {
        Self::MissingBlockName {
            tenant: tenant.into(),
        }
    }

    /// Creates a missing enforcement link error.
    pub fn missing_enforcement_link(block: impl Into<String>) -> Self {
        Self::MissingEnforcementLink {
            block: block.into(),
        }
    }

    /// Returns true if the fabric reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TenantMgrError::Fabric(e) if e.is_not_found())
    }

    /// Returns true if the fabric reported a conflicting resource.
    pub fn is_conflict(&self) -> bool {
        matches!(self, TenantMgrError::Fabric(e) if e.is_conflict())
    }

    /// Returns true if a later cycle may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            TenantMgrError::Fabric(e) => e.is_retryable(),
            TenantMgrError::SpecStore { .. }
            | TenantMgrError::VlanExhausted { .. }
            | TenantMgrError::Cancelled
            | TenantMgrError::Io(_) => true,
            TenantMgrError::Validation(_)
            | TenantMgrError::MissingBlockName { .. }
            | TenantMgrError::MissingEnforcementLink { .. }
            | TenantMgrError::Config(_) => false,
        }
    }
}
