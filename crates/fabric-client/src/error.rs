//! Error types for fabric API operations.
//!
//! Every failure talking to the fabric manager surfaces as a [`FabricError`].
//! Transport, HTTP status and decode failures are kept apart so callers can
//! classify them (not-found on delete is benign, transport errors are retried).

use thiserror::Error;

/// Result type alias for fabric API operations.
pub type FabricResult<T> = Result<T, FabricError>;

/// Errors that can occur while talking to the fabric manager.
#[derive(Debug, Error)]
pub enum FabricError {
    /// The request could not be sent or the response body could not be read.
    #[error("Fabric request {method} {path} failed: {source}")]
    Transport {
        /// HTTP method of the request.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The fabric manager answered with a non-success status.
    #[error("could not complete request {method} {path} (HTTP {status}): {message}")]
    Api {
        /// HTTP method of the request.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// HTTP status code.
        status: u16,
        /// `message` field of the error document.
        message: String,
        /// `errorCode` field of the error document.
        error_code: i64,
    },

    /// The response body did not match the expected document shape.
    #[error("cannot decode response of {path}: {source}")]
    Decode {
        /// Request path relative to the base URL.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A document link could not be interpreted (e.g. a VLAN link without an id).
    #[error("Invalid document link '{link}': {reason}")]
    InvalidLink {
        /// The offending link.
        link: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Client-side configuration problem (bad CA file, unusable base URL).
    #[error("Fabric client configuration error: {0}")]
    Config(String),

    /// Token acquisition against the auth endpoint failed.
    #[error("Cannot obtain access token: {0}")]
    Auth(String),
}

impl FabricError {
    /// Creates an API error the way the fabric manager reports one.
    pub fn api(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Api {
            method: method.into(),
            path: path.into(),
            status,
            message: message.into(),
            error_code: 0,
        }
    }

    /// Creates a 404 error for the given resource path.
    pub fn not_found(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!("Service not found: {}", path);
        Self::api(method, path, 404, message)
    }

    /// Creates an invalid link error.
    pub fn invalid_link(link: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLink {
            link: link.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FabricError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the fabric reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true if the fabric rejected a create because the resource
    /// already exists, or a delete because something still references it.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on a later cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            FabricError::Transport { .. } | FabricError::Auth(_) => true,
            FabricError::Api { status, .. } => *status >= 500 || *status == 409 || *status == 429,
            FabricError::Decode { .. } | FabricError::InvalidLink { .. } | FabricError::Config(_) => {
                false
            }
        }
    }
}
