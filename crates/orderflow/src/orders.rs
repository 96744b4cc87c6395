//! Order submission payload and its translation into the WMS order
//! representation. The translation is a pure function: the same submission
//! always produces the same WMS order, with no hidden clock reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: i64,
    #[serde(alias = "unitPrice")]
    pub price: f64,
    #[serde(alias = "description", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(alias = "companyName")]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "postalCode")]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// The payload carried by a `create_order` job. Immutable after enqueue;
/// `order_date` is stamped by the submission endpoint when the client did
/// not supply one, so the job processor never has to consult a clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub items: Vec<LineItem>,
    pub customer: Customer,
    #[serde(default)]
    pub shipping: Option<ShippingAddress>,

    #[serde(default, alias = "orderNumber")]
    pub order_number: Option<String>,
    #[serde(default, alias = "orderDate")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "deliveryMethod")]
    pub delivery_method: Option<String>,
    #[serde(default, alias = "deliveryZone")]
    pub delivery_zone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default, alias = "paymentStatus")]
    pub payment_status: Option<String>,
}

impl OrderSubmission {
    /// Fail-fast validation applied before any job is created.
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("order must contain at least one item".to_string());
        }
        if self.customer.name.trim().is_empty() {
            return Err("customer name is required".to_string());
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.sku.trim().is_empty() {
                return Err(format!("item {} is missing a sku", i));
            }
            if item.quantity <= 0 {
                return Err(format!("item {} quantity must be positive", item.sku));
            }
        }
        Ok(())
    }
}

/// Upstream order representation sent to the WMS create-order endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmsOrder {
    pub reference_num: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub ship_to: Option<ShippingAddress>,
    pub carrier: Option<String>,
    pub delivery_zone: Option<String>,
    pub notes: Option<String>,
    pub total: Option<f64>,
    pub items: Vec<WmsOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmsOrderItem {
    pub sku: String,
    pub qty: i64,
    pub unit_price: f64,
    pub description: Option<String>,
}

/// Translate a submission into the WMS order shape. Pure field remapping:
/// the reference number falls back to one derived from `order_date`, which
/// the submission endpoint guarantees is set.
pub fn to_wms_order(sub: &OrderSubmission) -> WmsOrder {
    let reference_num = sub.order_number.clone().unwrap_or_else(|| {
        let ts = sub.order_date.map(|d| d.timestamp()).unwrap_or(0);
        format!("PORTAL-{}", ts)
    });

    WmsOrder {
        reference_num,
        customer_name: sub.customer.name.clone(),
        customer_email: sub.customer.email.clone(),
        customer_phone: sub.customer.phone.clone(),
        ship_to: sub.shipping.clone(),
        carrier: sub.delivery_method.clone(),
        delivery_zone: sub.delivery_zone.clone(),
        notes: sub.notes.clone(),
        total: sub.total,
        items: sub
            .items
            .iter()
            .map(|i| WmsOrderItem {
                sku: i.sku.clone(),
                qty: i.quantity,
                unit_price: i.price,
                description: i.name.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission() -> OrderSubmission {
        serde_json::from_value(json!({
            "items": [{"sku": "WID-1", "quantity": 3, "unitPrice": 9.5, "name": "Widget"}],
            "customer": {"companyName": "Acme Foods", "email": "buyer@acme.test"},
            "orderDate": "2026-01-05T10:00:00Z",
            "deliveryMethod": "ground",
            "notes": "dock 4"
        }))
        .unwrap()
    }

    #[test]
    fn accepts_field_aliases() {
        let sub = submission();
        assert_eq!(sub.items[0].price, 9.5);
        assert_eq!(sub.items[0].name.as_deref(), Some("Widget"));
        assert_eq!(sub.customer.name, "Acme Foods");
    }

    #[test]
    fn validation_rejects_empty_items() {
        let mut sub = submission();
        sub.items.clear();
        assert!(sub.validate().is_err());
    }

    #[test]
    fn validation_rejects_missing_customer_name() {
        let mut sub = submission();
        sub.customer.name = "  ".to_string();
        assert!(sub.validate().is_err());
    }

    #[test]
    fn validation_rejects_non_positive_quantity() {
        let mut sub = submission();
        sub.items[0].quantity = 0;
        assert!(sub.validate().is_err());
    }

    #[test]
    fn transform_is_deterministic() {
        let sub = submission();
        let a = serde_json::to_vec(&to_wms_order(&sub)).unwrap();
        let b = serde_json::to_vec(&to_wms_order(&sub)).unwrap();
        assert_eq!(a, b, "same submission must produce byte-identical output");
    }

    #[test]
    fn transform_defaults_reference_from_order_date() {
        let sub = submission();
        let order = to_wms_order(&sub);
        assert_eq!(order.reference_num, "PORTAL-1767607200");
    }

    #[test]
    fn transform_keeps_explicit_order_number() {
        let mut sub = submission();
        sub.order_number = Some("PO-778".to_string());
        assert_eq!(to_wms_order(&sub).reference_num, "PO-778");
    }
}
