//! In-process WMS used when `WMS_MOCK` is set: local development without
//! upstream credentials, and a convenient base for tests.

use super::{OrderListQuery, Wms, WmsError, WmsOrderAck};
use crate::orders::WmsOrder;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct MockWms {
    orders: Mutex<HashMap<String, Value>>,
}

impl MockWms {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
        }
    }

    fn products() -> Value {
        json!([
            { "itemId": "WID-1", "description": "Widget, single", "unitPrice": 9.5 },
            { "itemId": "WID-12", "description": "Widget, dozen", "unitPrice": 102.0 },
            { "itemId": "CRT-STD", "description": "Standard crate", "unitPrice": 24.0 }
        ])
    }
}

impl Default for MockWms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Wms for MockWms {
    async fn create_order(&self, order: &WmsOrder) -> Result<WmsOrderAck, WmsError> {
        let order_id = Uuid::new_v4().to_string();
        let stored = json!({
            "orderId": order_id,
            "referenceNum": order.reference_num,
            "status": "Open",
            "customerName": order.customer_name,
            "items": order.items,
        });
        self.orders.lock().await.insert(order_id.clone(), stored);

        Ok(WmsOrderAck {
            order_id,
            status: "Open".to_string(),
            created_at: None,
        })
    }

    async fn get_order(&self, id: &str) -> Result<Value, WmsError> {
        self.orders
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or(WmsError::NotFound)
    }

    async fn list_orders(&self, query: &OrderListQuery) -> Result<Value, WmsError> {
        let orders = self.orders.lock().await;
        let mut items: Vec<Value> = orders.values().cloned().collect();
        if let Some(status) = &query.status {
            items.retain(|o| o.get("status").and_then(Value::as_str) == Some(status));
        }
        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.unwrap_or(50).max(0) as usize;
        let page: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
        Ok(json!({ "totalResults": page.len(), "orders": page }))
    }

    async fn update_order_status(&self, id: &str, status: &str) -> Result<Value, WmsError> {
        let mut orders = self.orders.lock().await;
        let order = orders.get_mut(id).ok_or(WmsError::NotFound)?;
        order["status"] = json!(status);
        Ok(order.clone())
    }

    async fn list_inventory(&self) -> Result<Value, WmsError> {
        Ok(json!([
            { "itemId": "WID-1", "available": 1200 },
            { "itemId": "WID-12", "available": 84 },
            { "itemId": "CRT-STD", "available": 310 }
        ]))
    }

    async fn list_products(&self) -> Result<Value, WmsError> {
        Ok(Self::products())
    }

    async fn get_product(&self, id: &str) -> Result<Value, WmsError> {
        Self::products()
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .find(|p| p.get("itemId").and_then(Value::as_str) == Some(id))
                    .cloned()
            })
            .ok_or(WmsError::NotFound)
    }
}
