use crate::config::{NomadConfig, TlsConfig};
use crate::nomad::source::{AllocationSource, InventorySource};
use crate::nomad::types::{Allocation, AllocationListStub, Node, NodeListStub};
use crate::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Certificate, Client, Identity, Url};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};

const TOKEN_HEADER: &str = "X-Nomad-Token";

/// Thin client for the parts of the Nomad HTTP API the monitor reads.
#[derive(Clone)]
pub struct NomadClient {
    http: Client,
    base: Url,
}

impl NomadClient {
    pub fn new(config: &NomadConfig) -> Result<Self> {
        debug!("Initializing Nomad client for {}", config.address);

        let base = Url::parse(&config.address).map_err(|e| {
            MonitorError::ConfigError(format!(
                "Invalid Nomad address '{}': {}",
                config.address, e
            ))
        })?;
        if base.cannot_be_a_base() {
            return Err(MonitorError::ConfigError(format!(
                "Nomad address '{}' is not an http(s) URL",
                config.address
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(token).map_err(|_| {
                MonitorError::ConfigError("Nomad token contains invalid characters".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(TOKEN_HEADER, value);
        }

        let builder = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout);
        let http = apply_tls(builder, &config.tls)?.build()?;

        info!("Nomad client configured for {}", base);

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                MonitorError::ConfigError(format!("Cannot build API path from {}", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::UnexpectedStatus {
                endpoint: url.path().to_string(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| {
            MonitorError::NomadError(format!("Failed to decode response from {}: {}", url.path(), e))
        })
    }
}

fn apply_tls(
    mut builder: reqwest::ClientBuilder,
    tls: &TlsConfig,
) -> Result<reqwest::ClientBuilder> {
    if tls.insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some(ca_path) = &tls.ca_cert {
        let pem = read_pem(ca_path)?;
        let cert = Certificate::from_pem(&pem).map_err(|e| {
            MonitorError::ConfigError(format!(
                "Invalid CA certificate {}: {}",
                ca_path.display(),
                e
            ))
        })?;
        builder = builder.add_root_certificate(cert);
    }

    if let Some(identity) = &tls.client_identity {
        let mut pem = read_pem(&identity.cert)?;
        pem.push(b'\n');
        pem.extend(read_pem(&identity.key)?);
        let identity = Identity::from_pem(&pem).map_err(|e| {
            MonitorError::ConfigError(format!(
                "Invalid client certificate {} / key {}: {}",
                identity.cert.display(),
                identity.key.display(),
                e
            ))
        })?;
        builder = builder.identity(identity);
    }

    Ok(builder)
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        MonitorError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
    })
}

#[async_trait]
impl InventorySource for NomadClient {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let url = self.endpoint(&["v1", "nodes"])?;
        let stubs: Vec<NodeListStub> = self.get_json(url).await?;

        Ok(stubs.into_iter().map(Node::from).collect())
    }
}

#[async_trait]
impl AllocationSource for NomadClient {
    async fn list_allocations(&self, job_name: &str) -> Result<Vec<Allocation>> {
        let mut url = self.endpoint(&["v1", "job", job_name, "allocations"])?;
        url.query_pairs_mut().append_pair("all", "true");
        let stubs: Vec<AllocationListStub> = self.get_json(url).await?;

        Ok(stubs.into_iter().map(Allocation::from).collect())
    }
}
