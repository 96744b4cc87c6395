//! The business logic run per dequeued `create_order` job: translate the
//! submission into the WMS order shape, create it upstream, and classify
//! the outcome as retriable or terminal.

use crate::jobs::retry::ErrorClass;
use crate::orders::{to_wms_order, OrderSubmission};
use crate::wms::{Wms, WmsError};
use serde_json::{json, Value};
use std::sync::Arc;

/// How a single execution failed, with the retry class already decided.
/// The job store only applies the decision; classification lives here.
#[derive(Debug)]
pub struct ProcessFailure {
    pub code: &'static str,
    pub message: String,
    pub class: ErrorClass,
}

impl ProcessFailure {
    fn terminal(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            class: ErrorClass::NonRetryable,
        }
    }

    fn retriable(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            class: ErrorClass::Retryable,
        }
    }
}

/// Map a WMS failure to a retry decision. Only an upstream rejection of
/// the payload itself is terminal: a request that can never succeed must
/// not burn retry budget. Everything else defaults to retriable.
pub fn classify_wms_error(err: &WmsError) -> ProcessFailure {
    match err {
        WmsError::BadRequest { message } => {
            ProcessFailure::terminal("WMS_BAD_REQUEST", message.clone())
        }
        WmsError::RateLimited => ProcessFailure::retriable("WMS_RATE_LIMITED", err.to_string()),
        WmsError::Unavailable { .. } => {
            ProcessFailure::retriable("WMS_UNAVAILABLE", err.to_string())
        }
        WmsError::Network { .. } => ProcessFailure::retriable("WMS_NETWORK", err.to_string()),
        WmsError::Unauthorized => ProcessFailure::retriable("WMS_UNAUTHORIZED", err.to_string()),
        WmsError::NotFound => ProcessFailure::retriable("WMS_NOT_FOUND", err.to_string()),
        WmsError::Unknown { .. } => ProcessFailure::retriable("WMS_UNKNOWN", err.to_string()),
    }
}

pub struct OrderJobProcessor {
    wms: Arc<dyn Wms>,
}

impl OrderJobProcessor {
    pub fn new(wms: Arc<dyn Wms>) -> Self {
        Self { wms }
    }

    /// Execute one `create_order` job. On success the returned value is
    /// stored as the job result and answers any later status query.
    pub async fn process(&self, payload: &Value) -> Result<Value, ProcessFailure> {
        let submission: OrderSubmission = serde_json::from_value(payload.clone())
            .map_err(|e| ProcessFailure::terminal("BAD_PAYLOAD", e.to_string()))?;

        let order = to_wms_order(&submission);
        let reference = order.reference_num.clone();

        match self.wms.create_order(&order).await {
            Ok(ack) => {
                tracing::info!(
                    order_ref = %reference,
                    wms_order_id = %ack.order_id,
                    wms_status = %ack.status,
                    "order created upstream"
                );
                Ok(json!({
                    "wmsOrderId": ack.order_id,
                    "status": ack.status,
                    "createdAt": ack.created_at,
                    "referenceNum": reference,
                }))
            }
            Err(err) => {
                let failure = classify_wms_error(&err);
                match failure.class {
                    ErrorClass::Retryable => tracing::warn!(
                        order_ref = %reference,
                        code = failure.code,
                        error = %err,
                        "order creation failed, will retry"
                    ),
                    ErrorClass::NonRetryable => tracing::error!(
                        order_ref = %reference,
                        code = failure.code,
                        error = %err,
                        "order creation rejected upstream, not retrying"
                    ),
                }
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_is_terminal() {
        let f = classify_wms_error(&WmsError::BadRequest {
            message: "missing sku".into(),
        });
        assert_eq!(f.class, ErrorClass::NonRetryable);
        assert_eq!(f.code, "WMS_BAD_REQUEST");
    }

    #[test]
    fn rate_limit_and_outage_are_retriable() {
        for err in [
            WmsError::RateLimited,
            WmsError::Unavailable { status: 503 },
            WmsError::Network {
                message: "timeout".into(),
            },
        ] {
            assert_eq!(classify_wms_error(&err).class, ErrorClass::Retryable);
        }
    }

    #[test]
    fn unexpected_errors_default_to_retriable() {
        for err in [
            WmsError::Unauthorized,
            WmsError::NotFound,
            WmsError::Unknown {
                status: 418,
                message: "teapot".into(),
            },
        ] {
            assert_eq!(classify_wms_error(&err).class, ErrorClass::Retryable);
        }
    }
}
