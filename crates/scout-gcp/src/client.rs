//! Shared authenticated HTTP client for GCP APIs

use crate::auth::{MetadataTokenProvider, StaticTokenProvider};
use scout_core::{Error, GcpConfig, Result, TokenProvider};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Maximum number of body bytes carried into an API error message
const ERROR_BODY_LIMIT: usize = 512;

/// Authenticated HTTP client handle shared by all GCP API calls.
///
/// Cheap to clone; the underlying connection pool and token provider are
/// shared. Constructed once at startup and captured immutably by the
/// collectors.
#[derive(Clone)]
pub struct GcpApiClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
}

impl GcpApiClient {
    /// Build a client from configuration.
    ///
    /// A configured static token wins over the metadata server; deployments
    /// on GCP infrastructure normally leave `access_token` unset.
    pub fn from_config(config: &GcpConfig) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.request_timeout_seconds);

        let tokens: Arc<dyn TokenProvider> = match &config.access_token {
            Some(token) => Arc::new(StaticTokenProvider::new(token.clone())),
            None => Arc::new(MetadataTokenProvider::new(
                config.metadata_endpoint.clone(),
                request_timeout,
            )?),
        };

        Self::new(tokens, request_timeout)
    }

    /// Build a client with an explicit token provider
    pub fn new(tokens: Arc<dyn TokenProvider>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, tokens })
    }

    /// Obtain a token for the coming collection cycle.
    ///
    /// Called once per cycle before fan-out; a failure here means no project
    /// can be queried this cycle.
    pub async fn ensure_token(&self) -> Result<()> {
        self.tokens.access_token().await.map(|_| ())
    }

    /// GET a JSON resource with bearer authentication
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.tokens.access_token().await?;

        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("request to {} timed out", url))
                } else {
                    Error::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(Error::api(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::invalid_response(e.to_string()))
    }
}
