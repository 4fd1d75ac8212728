//! REST client for Rackspace-style cloud APIs.
//!
//! A [`Session`] is created once per run by exchanging an API key for a token
//! at the identity endpoint. The service catalog returned with the token
//! supplies the per-region compute and load balancer endpoints.

mod identity;
mod load_balancers;
mod servers;

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

pub use identity::{ServiceCatalog, Session, DEFAULT_IDENTITY_URL};
pub use load_balancers::LoadBalancersClient;
pub use servers::ServersClient;

use crate::error::BackendError;

/// Header carrying the identity token.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by the API clients.
pub fn http_client() -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .user_agent(concat!("poolsync/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(BackendError::from)
}

fn token_headers(token: &str) -> Result<HeaderMap, BackendError> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(token)
        .map_err(|_| BackendError::AuthenticationFailed("token is not a valid header".into()))?;
    headers.insert(AUTH_TOKEN_HEADER, value);
    Ok(headers)
}

/// Turn a non-success response into a [`BackendError`].
async fn error_for_response(resp: reqwest::Response, what: &str) -> BackendError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    match status.as_u16() {
        401 | 403 => BackendError::AuthenticationFailed(format!("{what}: {status}")),
        404 => BackendError::NotFound(what.to_string()),
        code => BackendError::Rejected {
            status: code,
            message: if body.is_empty() {
                what.to_string()
            } else {
                format!("{what}: {body}")
            },
        },
    }
}
