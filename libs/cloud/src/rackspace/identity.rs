//! Token exchange and service catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{error_for_response, http_client, LoadBalancersClient, ServersClient};
use crate::credentials::Credentials;
use crate::error::BackendError;
use crate::model::Region;

/// Public identity endpoint.
pub const DEFAULT_IDENTITY_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";

const COMPUTE_SERVICE_TYPE: &str = "compute";
const LOAD_BALANCER_SERVICE_TYPE: &str = "rax:load-balancer";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthBody<'a> {
    #[serde(rename = "RAX-KSKEY:apiKeyCredentials")]
    api_key_credentials: ApiKeyCredentials<'a>,
}

#[derive(Debug, Serialize)]
struct ApiKeyCredentials<'a> {
    username: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL")]
    public_url: String,
    #[serde(rename = "internalURL", default)]
    internal_url: Option<String>,
}

/// Per-region endpoints of the services a sync run uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    pub compute: BTreeMap<Region, String>,
    pub load_balancers: BTreeMap<Region, String>,
}

impl ServiceCatalog {
    fn from_entries(entries: Vec<CatalogEntry>, use_internal: bool) -> Self {
        let mut catalog = Self::default();

        for entry in entries {
            let target = match entry.service_type.as_str() {
                COMPUTE_SERVICE_TYPE => &mut catalog.compute,
                LOAD_BALANCER_SERVICE_TYPE => &mut catalog.load_balancers,
                _ => continue,
            };

            for endpoint in entry.endpoints {
                let Some(region) = endpoint.region.as_deref().and_then(|r| r.parse().ok()) else {
                    continue;
                };
                let url = match (use_internal, endpoint.internal_url) {
                    (true, Some(internal)) => internal,
                    _ => endpoint.public_url,
                };
                target.insert(region, url.trim_end_matches('/').to_string());
            }
        }

        catalog
    }
}

/// An authenticated API session.
#[derive(Debug, Clone)]
pub struct Session {
    http: reqwest::Client,
    token: String,
    catalog: ServiceCatalog,
}

impl Session {
    /// Exchange credentials for a token.
    ///
    /// With `use_internal` set, internal (service network) endpoints are
    /// preferred when the catalog lists them.
    pub async fn authenticate(
        identity_url: &str,
        credentials: &Credentials,
        use_internal: bool,
    ) -> Result<Self, BackendError> {
        let http = http_client()?;
        let url = format!("{}/tokens", identity_url.trim_end_matches('/'));
        debug!(url = %url, username = %credentials.username, "Requesting identity token");

        let body = TokenRequest {
            auth: AuthBody {
                api_key_credentials: ApiKeyCredentials {
                    username: &credentials.username,
                    api_key: credentials.api_key.expose(),
                },
            },
        };

        let resp = http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(match error_for_response(resp, "identity token").await {
                BackendError::Rejected { status: 400, message } => {
                    BackendError::AuthenticationFailed(message)
                }
                other => other,
            });
        }

        let token: TokenResponse = resp.json().await?;
        let catalog = ServiceCatalog::from_entries(token.access.service_catalog, use_internal);
        info!(
            compute_regions = catalog.compute.len(),
            load_balancer_regions = catalog.load_balancers.len(),
            "Authenticated"
        );

        Ok(Self {
            http,
            token: token.access.token.id,
            catalog,
        })
    }

    /// Session from an already issued token and known endpoints.
    pub fn from_token(
        http: reqwest::Client,
        token: impl Into<String>,
        catalog: ServiceCatalog,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    /// Compute directory client covering every catalogued region.
    pub fn servers(&self) -> Result<ServersClient, BackendError> {
        ServersClient::new(self.http.clone(), &self.token, self.catalog.compute.clone())
    }

    /// Load balancer client for one region.
    pub fn load_balancers(&self, region: Region) -> Result<LoadBalancersClient, BackendError> {
        let endpoint =
            self.catalog
                .load_balancers
                .get(&region)
                .ok_or_else(|| BackendError::NoEndpoint {
                    service: "load balancer".to_string(),
                    region: region.to_string(),
                })?;

        LoadBalancersClient::new(self.http.clone(), &self.token, endpoint)
    }
}
