//! OAuth2 token providers

use async_trait::async_trait;
use scout_core::{Error, Result, TokenProvider};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Slack subtracted from a token's lifetime so a token is never handed out
/// moments before it expires.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// Token provider backed by a fixed access token.
///
/// Intended for local runs and tests; the token is used as-is for the
/// process lifetime.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Create a provider that always returns the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(Error::auth("configured access token is empty"));
        }
        Ok(self.token.clone())
    }
}

/// Token response from the metadata server
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

fn is_fresh(cached: &CachedToken) -> bool {
    Instant::now() < cached.expires_at
}

/// Token provider backed by the GCE metadata server.
///
/// Tokens are cached until shortly before their reported expiry, so repeated
/// collection cycles reuse one token rather than hammering the metadata
/// server.
pub struct MetadataTokenProvider {
    http: reqwest::Client,
    endpoint: String,
    cached: RwLock<Option<CachedToken>>,
}

impl MetadataTokenProvider {
    /// Create a provider against the given metadata server endpoint
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::auth(format!("failed to create metadata client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            cached: RwLock::new(None),
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.endpoint.trim_end_matches('/')
        )
    }

    async fn fetch_token(&self) -> Result<TokenResponse> {
        let url = self.token_url();
        debug!("requesting access token from metadata server: {}", url);

        let response = self
            .http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::auth(format!("metadata server unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::auth(format!(
                "metadata server returned status {}",
                status
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::auth(format!("invalid token response: {}", e)))
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if is_fresh(cached) {
                return Ok(cached.token.clone());
            }
        }

        let response = self.fetch_token().await?;
        let lifetime = Duration::from_secs(response.expires_in);
        let expires_at = Instant::now() + lifetime.saturating_sub(EXPIRY_SLACK);

        let token = response.access_token.clone();
        *self.cached.write().await = Some(CachedToken {
            token: response.access_token,
            expires_at,
        });

        Ok(token)
    }
}
