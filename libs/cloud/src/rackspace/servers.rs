//! Compute directory backed by the servers API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::debug;

use super::{error_for_response, token_headers};
use crate::backend::ComputeDirectory;
use crate::error::BackendError;
use crate::model::{Instance, Region};

/// Servers requested per page.
const DEFAULT_PAGE_SIZE: usize = 100;

/// Network label holding service-net addresses.
const PRIVATE_NETWORK: &str = "private";

#[derive(Debug, Deserialize)]
struct ServersPage {
    #[serde(default)]
    servers: Vec<ServerDetail>,
}

#[derive(Debug, Deserialize)]
struct ServerDetail {
    id: String,
    #[serde(default)]
    name: String,
    status: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    addresses: BTreeMap<String, Vec<ServerAddress>>,
}

#[derive(Debug, Deserialize)]
struct ServerAddress {
    addr: String,
}

impl From<ServerDetail> for Instance {
    fn from(detail: ServerDetail) -> Self {
        let private_addresses = detail
            .addresses
            .get(PRIVATE_NETWORK)
            .map(|addrs| addrs.iter().map(|a| a.addr.clone()).collect())
            .unwrap_or_default();

        Self {
            id: detail.id,
            name: detail.name,
            status: detail.status.into(),
            metadata: detail.metadata,
            private_addresses,
        }
    }
}

/// Servers API client.
#[derive(Debug, Clone)]
pub struct ServersClient {
    http: reqwest::Client,
    headers: HeaderMap,
    endpoints: BTreeMap<Region, String>,
    page_size: usize,
}

impl ServersClient {
    pub fn new(
        http: reqwest::Client,
        token: &str,
        endpoints: BTreeMap<Region, String>,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            http,
            headers: token_headers(token)?,
            endpoints,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the page size (at least 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn endpoint(&self, region: Region) -> Result<&str, BackendError> {
        self.endpoints
            .get(&region)
            .map(String::as_str)
            .ok_or_else(|| BackendError::NoEndpoint {
                service: "compute".to_string(),
                region: region.to_string(),
            })
    }

    async fn fetch_page(
        &self,
        base: &str,
        marker: Option<&str>,
    ) -> Result<Vec<ServerDetail>, BackendError> {
        let url = format!("{base}/servers/detail");
        let limit = self.page_size.to_string();
        let mut query = vec![("limit", limit.as_str())];
        if let Some(marker) = marker {
            query.push(("marker", marker));
        }

        let resp = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .query(&query)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_for_response(resp, "list servers").await);
        }

        Ok(resp.json::<ServersPage>().await?.servers)
    }
}

#[async_trait]
impl ComputeDirectory for ServersClient {
    async fn list_instances(&self, region: Region) -> Result<Vec<Instance>, BackendError> {
        let base = self.endpoint(region)?;
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self.fetch_page(base, marker.as_deref()).await?;
            let page_len = page.len();
            debug!(%region, page_len, marker = ?marker, "Fetched servers page");

            marker = page.last().map(|server| server.id.clone());
            instances.extend(page.into_iter().map(Instance::from));

            if page_len < self.page_size {
                break;
            }
        }

        Ok(instances)
    }
}
