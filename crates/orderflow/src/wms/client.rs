//! Live WMS client: authenticated HTTP calls with failure classification
//! and a backoff loop for idempotent reads.

use super::auth::TokenCache;
use super::error::WmsError;
use super::{OrderListQuery, Wms, WmsOrderAck};
use crate::config::WmsConfig;
use crate::orders::WmsOrder;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct GetRetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for GetRetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 500,
        }
    }
}

pub struct WmsClient {
    http: reqwest::Client,
    base_url: String,
    customer_id: String,
    auth: TokenCache,
    retry: GetRetryConfig,
}

impl WmsClient {
    pub fn new(cfg: &WmsConfig) -> anyhow::Result<Self> {
        let client_id = cfg
            .client_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("WMS_CLIENT_ID is missing"))?;
        let client_secret = cfg
            .client_secret
            .clone()
            .ok_or_else(|| anyhow::anyhow!("WMS_CLIENT_SECRET is missing"))?;
        let customer_id = cfg
            .customer_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("WMS_CUSTOMER_ID is missing"))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let auth = TokenCache::new(
            cfg.token_url.clone(),
            client_id,
            client_secret,
            cfg.token_ttl_secs,
        )?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            customer_id,
            auth,
            retry: GetRetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: GetRetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// One authenticated call. A 401 clears the cached token so the next
    /// independent call re-authenticates; the failed call is not replayed
    /// here, retrying is the caller's decision.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, WmsError> {
        let token = self.auth.bearer().await?;
        let url = format!("{}{}", self.base_url, path);

        let mut req = self.http.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(WmsError::from_reqwest)?;
        let status = resp.status().as_u16();

        if (200..300).contains(&status) {
            return resp.json().await.map_err(|e| WmsError::Unknown {
                status,
                message: format!("malformed response body: {e}"),
            });
        }

        let body = resp.text().await.unwrap_or_default();
        if status == 401 {
            self.auth.invalidate().await;
        }
        Err(WmsError::from_status(status, body))
    }

    /// Idempotent GET with exponential backoff: 429, 5xx and network-level
    /// failures are retried with delay `base * 2^attempt`; other 4xx fail
    /// fast.
    pub async fn get_retry(&self, path: &str) -> Result<Value, WmsError> {
        let mut attempt: u32 = 0;
        loop {
            match self.request(Method::GET, path, None).await {
                Ok(value) => return Ok(value),
                Err(err) if err.retriable_get() && attempt + 1 < self.retry.attempts => {
                    let pow2 = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
                    let delay = self.retry.base_delay_ms.saturating_mul(pow2);
                    tracing::debug!(path, attempt, delay_ms = delay, error = %err, "retrying wms read");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn orders_path(&self) -> String {
        format!("/customers/{}/orders", self.customer_id)
    }
}

fn push_param(query: &mut Vec<String>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        query.push(format!("{}={}", key, v));
    }
}

#[async_trait]
impl Wms for WmsClient {
    async fn create_order(&self, order: &WmsOrder) -> Result<WmsOrderAck, WmsError> {
        let body = serde_json::to_value(order).map_err(|e| WmsError::Unknown {
            status: 0,
            message: format!("unserializable order: {e}"),
        })?;

        let resp = self
            .request(Method::POST, &self.orders_path(), Some(&body))
            .await?;

        serde_json::from_value(resp).map_err(|e| WmsError::Unknown {
            status: 200,
            message: format!("malformed create-order response: {e}"),
        })
    }

    async fn get_order(&self, id: &str) -> Result<Value, WmsError> {
        self.get_retry(&format!("{}/{}", self.orders_path(), id))
            .await
    }

    async fn list_orders(&self, query: &OrderListQuery) -> Result<Value, WmsError> {
        let mut params = Vec::new();
        push_param(&mut params, "status", &query.status);
        push_param(&mut params, "customer", &query.customer);
        push_param(&mut params, "startDate", &query.start_date);
        push_param(&mut params, "endDate", &query.end_date);
        if let Some(limit) = query.limit {
            params.push(format!("limit={limit}"));
        }
        if let Some(offset) = query.offset {
            params.push(format!("offset={offset}"));
        }

        let path = if params.is_empty() {
            self.orders_path()
        } else {
            format!("{}?{}", self.orders_path(), params.join("&"))
        };
        self.get_retry(&path).await
    }

    async fn update_order_status(&self, id: &str, status: &str) -> Result<Value, WmsError> {
        let body = serde_json::json!({ "status": status });
        self.request(
            Method::PUT,
            &format!("{}/{}/status", self.orders_path(), id),
            Some(&body),
        )
        .await
    }

    async fn list_inventory(&self) -> Result<Value, WmsError> {
        self.get_retry(&format!("/customers/{}/inventory", self.customer_id))
            .await
    }

    async fn list_products(&self) -> Result<Value, WmsError> {
        self.get_retry(&format!("/customers/{}/items", self.customer_id))
            .await
    }

    async fn get_product(&self, id: &str) -> Result<Value, WmsError> {
        self.get_retry(&format!("/customers/{}/items/{}", self.customer_id, id))
            .await
    }
}
