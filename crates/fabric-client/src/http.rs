//! HTTP implementation of [`FabricApi`] on top of `reqwest`.
//!
//! All requests are JSON, bearer-token authenticated and bounded by the
//! configured request timeout. The token is obtained with a client-credentials
//! exchange against a separate endpoint and refreshed by
//! [`FabricApi::authenticate`] at the start of each cycle.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::api::FabricApi;
use crate::error::{FabricError, FabricResult};
use crate::links::{
    last_segment, member_path, port_policy_link, vlan_link, PORTS_PATH, PORT_POLICIES_PATH,
    SWITCHES_PATH, VLANS_PATH, VNI_BLOCKS_PATH, VNI_PARTITIONS_PATH,
};
use crate::models::{
    DocumentLinks, EnforcementTask, ErrorResponse, Port, PortPatch, PortPolicy,
    PortPolicyRequest, Switch, TokenResponse, Vlan, VlanRequest, VniBlock, VniBlockPatch,
    VniBlockRequest, VniPartition, VniPartitionRequest,
};

/// Default fabric-manager base URL.
pub const DEFAULT_BASE_URL: &str = "https://api-gw-service-nmn.local/apis/fabric-manager";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings for [`HttpFabricClient`].
#[derive(Debug, Clone)]
pub struct FabricClientConfig {
    /// Base URL every resource path is appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Accept any server certificate.
    pub skip_tls_verify: bool,
    /// PEM bundle of the CA that signed the API gateway certificate.
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for FabricClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            skip_tls_verify: false,
            ca_cert_path: None,
        }
    }
}

/// Client-credentials grant parameters.
#[derive(Clone)]
pub struct ClientCredentials {
    /// Absolute URL of the token endpoint.
    pub token_endpoint: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Fabric-manager client over HTTPS.
#[derive(Debug)]
pub struct HttpFabricClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Option<ClientCredentials>,
    access_token: RwLock<Option<String>>,
}

impl HttpFabricClient {
    /// Builds a client from transport settings.
    pub fn new(config: &FabricClientConfig) -> FabricResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);

        if config.skip_tls_verify {
            warn!("TLS certificate verification is disabled for the fabric client");
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(path) = &config.ca_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                FabricError::Config(format!(
                    "failed to read CA certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                FabricError::Config(format!("failed to parse CA certificate: {}", e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| FabricError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            credentials: None,
            access_token: RwLock::new(None),
        })
    }

    /// Enables token acquisition with the given credentials.
    pub fn with_credentials(mut self, credentials: ClientCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Installs a bearer token obtained elsewhere.
    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write() = Some(token.into());
    }

    /// Performs the client-credentials exchange and returns the access token.
    pub async fn fetch_access_token(&self) -> FabricResult<String> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or_else(|| FabricError::Auth("no client credentials configured".to_string()))?;

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("scope", "openid"),
        ];

        let resp = self
            .http
            .post(&creds.token_endpoint)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| FabricError::Auth(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| FabricError::Auth(e.to_string()))?;
        if !status.is_success() {
            return Err(FabricError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let token: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| FabricError::Auth(format!("cannot decode token response: {}", e)))?;
        if token.access_token.is_empty() {
            return Err(FabricError::Auth("token response has no access_token".to_string()));
        }
        Ok(token.access_token)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> FabricResult<Vec<u8>> {
        debug!(method = %method, path = %path, "Sending fabric request");

        let mut req = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .header(ACCEPT, "application/json");
        if let Some(token) = self.access_token.read().as_deref() {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json").json(body);
        }

        let transport = |source| FabricError::Transport {
            method: method.to_string(),
            path: path.to_string(),
            source,
        };

        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let (message, error_code) = match serde_json::from_slice::<ErrorResponse>(&bytes) {
                Ok(doc) if !doc.message.is_empty() => (doc.message, doc.error_code),
                _ => (String::from_utf8_lossy(&bytes).trim().to_string(), 0),
            };
            warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                message = %message,
                "Fabric request failed"
            );
            return Err(FabricError::Api {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                message,
                error_code,
            });
        }

        trace!(method = %method, path = %path, status = status.as_u16(), "Fabric request succeeded");
        Ok(bytes.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> FabricResult<T> {
        let body = self.send::<()>(Method::GET, path, None).await?;
        decode(path, &body)
    }

    async fn submit<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> FabricResult<T> {
        let resp = self.send(method, path, Some(body)).await?;
        decode(path, &resp)
    }

    async fn remove(&self, path: &str) -> FabricResult<()> {
        self.send::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> FabricResult<T> {
    serde_json::from_slice(body).map_err(|source| FabricError::Decode {
        path: path.to_string(),
        source,
    })
}

#[async_trait]
impl FabricApi for HttpFabricClient {
    async fn authenticate(&self) -> FabricResult<()> {
        if self.credentials.is_none() {
            return Ok(());
        }
        let token = self.fetch_access_token().await?;
        self.set_access_token(token);
        debug!("Refreshed fabric access token");
        Ok(())
    }

    async fn list_switches(&self) -> FabricResult<Vec<String>> {
        let links: DocumentLinks = self.fetch(SWITCHES_PATH).await?;
        Ok(links
            .document_links
            .iter()
            .map(|link| last_segment(link).to_string())
            .collect())
    }

    async fn get_switch(&self, name: &str) -> FabricResult<Switch> {
        self.fetch(&member_path(SWITCHES_PATH, name)).await
    }

    async fn get_port(&self, name: &str) -> FabricResult<Port> {
        self.fetch(&member_path(PORTS_PATH, name)).await
    }

    async fn set_port_policy_links(&self, name: &str, links: Vec<String>) -> FabricResult<()> {
        let patch = PortPatch {
            port_policy_links: links,
        };
        self.send(Method::PATCH, &member_path(PORTS_PATH, name), Some(&patch))
            .await?;
        Ok(())
    }

    async fn list_vni_partitions(&self) -> FabricResult<DocumentLinks> {
        self.fetch(VNI_PARTITIONS_PATH).await
    }

    async fn get_vni_partition(&self, name: &str) -> FabricResult<VniPartition> {
        self.fetch(&member_path(VNI_PARTITIONS_PATH, name)).await
    }

    async fn create_vni_partition(
        &self,
        request: &VniPartitionRequest,
    ) -> FabricResult<VniPartition> {
        self.submit(Method::POST, VNI_PARTITIONS_PATH, request).await
    }

    async fn patch_vni_partition(
        &self,
        name: &str,
        request: &VniPartitionRequest,
    ) -> FabricResult<VniPartition> {
        self.submit(Method::PATCH, &member_path(VNI_PARTITIONS_PATH, name), request)
            .await
    }

    async fn delete_vni_partition(&self, name: &str) -> FabricResult<()> {
        self.remove(&member_path(VNI_PARTITIONS_PATH, name)).await
    }

    async fn list_vni_blocks(&self) -> FabricResult<DocumentLinks> {
        self.fetch(VNI_BLOCKS_PATH).await
    }

    async fn create_vni_block(&self, request: &VniBlockRequest) -> FabricResult<VniBlock> {
        self.submit(Method::POST, VNI_BLOCKS_PATH, request).await
    }

    async fn patch_vni_block(&self, name: &str, patch: &VniBlockPatch) -> FabricResult<VniBlock> {
        self.submit(Method::PATCH, &member_path(VNI_BLOCKS_PATH, name), patch)
            .await
    }

    async fn delete_vni_block(&self, name: &str) -> FabricResult<()> {
        self.remove(&member_path(VNI_BLOCKS_PATH, name)).await
    }

    async fn get_enforcement_task(&self, link: &str) -> FabricResult<EnforcementTask> {
        self.fetch(link).await
    }

    async fn list_vlans(&self) -> FabricResult<DocumentLinks> {
        self.fetch(VLANS_PATH).await
    }

    async fn get_vlan(&self, id: u16) -> FabricResult<Vlan> {
        self.fetch(&vlan_link(id)).await
    }

    async fn create_vlan(&self, request: &VlanRequest) -> FabricResult<Vlan> {
        self.submit(Method::POST, VLANS_PATH, request).await
    }

    async fn delete_vlan(&self, id: u16) -> FabricResult<()> {
        self.remove(&vlan_link(id)).await
    }

    async fn get_port_policy(&self, name: &str) -> FabricResult<PortPolicy> {
        self.fetch(&port_policy_link(name)).await
    }

    async fn create_port_policy(&self, request: &PortPolicyRequest) -> FabricResult<PortPolicy> {
        self.submit(Method::POST, PORT_POLICIES_PATH, request).await
    }

    async fn delete_port_policy(&self, link: &str) -> FabricResult<()> {
        let path = if link.starts_with(PORT_POLICIES_PATH) {
            link.to_string()
        } else {
            port_policy_link(link)
        };
        self.remove(&path).await
    }
}
