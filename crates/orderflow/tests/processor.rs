//! Order job processor against a scripted WMS: success result shape and
//! retriable-vs-terminal classification.

use async_trait::async_trait;
use orderflow::jobs::retry::ErrorClass;
use orderflow::jobs::OrderJobProcessor;
use orderflow::orders::WmsOrder;
use orderflow::wms::{OrderListQuery, Wms, WmsError, WmsOrderAck};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A WMS whose create_order outcomes are scripted per call.
struct ScriptedWms {
    outcomes: Mutex<VecDeque<Result<WmsOrderAck, WmsError>>>,
}

impl ScriptedWms {
    fn new(outcomes: Vec<Result<WmsOrderAck, WmsError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
        })
    }
}

#[async_trait]
impl Wms for ScriptedWms {
    async fn create_order(&self, _order: &WmsOrder) -> Result<WmsOrderAck, WmsError> {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted outcome left")
    }

    async fn get_order(&self, _id: &str) -> Result<Value, WmsError> {
        Err(WmsError::NotFound)
    }
    async fn list_orders(&self, _q: &OrderListQuery) -> Result<Value, WmsError> {
        Ok(json!([]))
    }
    async fn update_order_status(&self, _id: &str, _status: &str) -> Result<Value, WmsError> {
        Err(WmsError::NotFound)
    }
    async fn list_inventory(&self) -> Result<Value, WmsError> {
        Ok(json!([]))
    }
    async fn list_products(&self) -> Result<Value, WmsError> {
        Ok(json!([]))
    }
    async fn get_product(&self, _id: &str) -> Result<Value, WmsError> {
        Err(WmsError::NotFound)
    }
}

fn payload() -> Value {
    json!({
        "items": [{"sku": "WID-1", "quantity": 2, "price": 9.5}],
        "customer": {"name": "Acme Foods", "email": "buyer@acme.test"},
        "orderNumber": "PO-9001",
        "orderDate": "2026-01-05T10:00:00Z"
    })
}

#[tokio::test]
async fn success_stores_upstream_order_identity() {
    let wms = ScriptedWms::new(vec![Ok(WmsOrderAck {
        order_id: "wms-42".to_string(),
        status: "Open".to_string(),
        created_at: Some("2026-01-05T10:00:03Z".to_string()),
    })]);
    let processor = OrderJobProcessor::new(wms);

    let result = processor.process(&payload()).await.unwrap();
    assert_eq!(result["wmsOrderId"], "wms-42");
    assert_eq!(result["status"], "Open");
    assert_eq!(result["referenceNum"], "PO-9001");
}

#[tokio::test]
async fn rate_limit_is_retriable() {
    let wms = ScriptedWms::new(vec![Err(WmsError::RateLimited)]);
    let processor = OrderJobProcessor::new(wms);

    let failure = processor.process(&payload()).await.unwrap_err();
    assert_eq!(failure.class, ErrorClass::Retryable);
    assert_eq!(failure.code, "WMS_RATE_LIMITED");
}

#[tokio::test]
async fn outage_is_retriable() {
    let wms = ScriptedWms::new(vec![Err(WmsError::Unavailable { status: 502 })]);
    let processor = OrderJobProcessor::new(wms);

    let failure = processor.process(&payload()).await.unwrap_err();
    assert_eq!(failure.class, ErrorClass::Retryable);
    assert_eq!(failure.code, "WMS_UNAVAILABLE");
}

#[tokio::test]
async fn upstream_rejection_is_terminal() {
    let wms = ScriptedWms::new(vec![Err(WmsError::BadRequest {
        message: "unknown sku".to_string(),
    })]);
    let processor = OrderJobProcessor::new(wms);

    let failure = processor.process(&payload()).await.unwrap_err();
    assert_eq!(failure.class, ErrorClass::NonRetryable);
    assert_eq!(failure.code, "WMS_BAD_REQUEST");
    assert!(failure.message.contains("unknown sku"));
}

#[tokio::test]
async fn unknown_errors_default_to_retriable() {
    let wms = ScriptedWms::new(vec![Err(WmsError::Unknown {
        status: 418,
        message: "odd response".to_string(),
    })]);
    let processor = OrderJobProcessor::new(wms);

    let failure = processor.process(&payload()).await.unwrap_err();
    assert_eq!(failure.class, ErrorClass::Retryable);
}

#[tokio::test]
async fn malformed_payload_is_terminal() {
    let wms = ScriptedWms::new(vec![]);
    let processor = OrderJobProcessor::new(wms);

    let failure = processor
        .process(&json!({ "customer": {"name": "Acme"} }))
        .await
        .unwrap_err();
    assert_eq!(failure.class, ErrorClass::NonRetryable);
    assert_eq!(failure.code, "BAD_PAYLOAD");
}
