//! Boundary to the external warehouse-management system.
//!
//! Everything behind the [`Wms`] trait: a live reqwest-backed client and a
//! mock used for local development and tests. The implementation is chosen
//! once at startup; no business logic branches on the data source.

pub mod auth;
pub mod client;
pub mod error;
pub mod mock;

pub use client::WmsClient;
pub use error::WmsError;
pub use mock::MockWms;

use crate::orders::WmsOrder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement returned by the WMS when an order is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WmsOrderAck {
    #[serde(alias = "orderId", alias = "id")]
    pub order_id: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, alias = "createdDate")]
    pub created_at: Option<String>,
}

fn default_status() -> String {
    "Open".to_string()
}

#[derive(Debug, Clone, Default)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub customer: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[async_trait]
pub trait Wms: Send + Sync {
    async fn create_order(&self, order: &WmsOrder) -> Result<WmsOrderAck, WmsError>;
    async fn get_order(&self, id: &str) -> Result<Value, WmsError>;
    async fn list_orders(&self, query: &OrderListQuery) -> Result<Value, WmsError>;
    async fn update_order_status(&self, id: &str, status: &str) -> Result<Value, WmsError>;
    async fn list_inventory(&self) -> Result<Value, WmsError>;
    async fn list_products(&self) -> Result<Value, WmsError>;
    async fn get_product(&self, id: &str) -> Result<Value, WmsError>;
}
