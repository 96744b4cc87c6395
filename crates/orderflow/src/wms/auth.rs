//! OAuth client-credentials token cache for the WMS.
//!
//! The cached token is the only mutable state shared across concurrent job
//! executions. Semantics are "fetch if missing or expired": two tasks
//! refreshing at once both obtain valid tokens, so no coordination beyond
//! the RwLock is needed.

use super::error::WmsError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Safety margin subtracted from the upstream `expires_in`, so a token is
/// never presented moments before it lapses.
const EXPIRY_MARGIN_SECS: u64 = 60;

const TOKEN_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct TokenCache {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    ttl_override: Option<u64>,
    cached: RwLock<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl TokenCache {
    pub fn new(
        token_url: String,
        client_id: String,
        client_secret: String,
        ttl_override: Option<u64>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(TOKEN_EXCHANGE_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            token_url,
            client_id,
            client_secret,
            ttl_override,
            cached: RwLock::new(None),
        })
    }

    /// A valid bearer token: cache hit, or a fresh client-credentials
    /// exchange on miss/expiry.
    pub async fn bearer(&self) -> Result<String, WmsError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.token.clone());
            }
        }
        self.refresh().await
    }

    /// Drop the cached token so the next call re-authenticates. Called on
    /// any 401 from the WMS; the failed call itself is not replayed here.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn refresh(&self) -> Result<String, WmsError> {
        tracing::debug!(token_url = %self.token_url, "refreshing wms access token");

        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(WmsError::from_reqwest)?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "wms token exchange rejected");
            return Err(WmsError::from_status(status, body));
        }

        let token: TokenResponse = resp.json().await.map_err(|e| WmsError::Unknown {
            status,
            message: format!("malformed token response: {e}"),
        })?;

        let ttl = self
            .ttl_override
            .or(token.expires_in)
            .unwrap_or(3600)
            .saturating_sub(EXPIRY_MARGIN_SECS)
            .max(1);

        *self.cached.write().await = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });

        Ok(token.access_token)
    }
}
