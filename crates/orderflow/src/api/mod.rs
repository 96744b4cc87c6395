//! HTTP surface: order submission and tracking, cache-backed catalog
//! reads, queue observability, health.
//!
//! Validation failures are rejected here, before any job exists. Errors
//! that happen after enqueue never surface through these handlers; the
//! submitting caller only ever sees "accepted".

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::api::models::*;
use crate::cache::Cache;
use crate::jobs::{AttemptsRepo, JobsRepo, NewJob};
use crate::orders::OrderSubmission;
use crate::sync::{SyncTask, INVENTORY_KEY, PRODUCTS_KEY};
use crate::wms::{OrderListQuery as WmsOrderQuery, Wms, WmsError};

pub mod models;

#[derive(Clone)]
pub struct ApiState {
    pub jobs: JobsRepo,
    pub attempts: AttemptsRepo,
    pub wms: Arc<dyn Wms>,
    pub cache: Cache,
    pub sync: Arc<SyncTask>,
    pub queue: String,
    pub max_attempts: i32,
    pub started_at: Instant,
}

pub fn router(state: ApiState) -> Router {
    let v1 = Router::new()
        .route("/orders", post(submit_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", patch(update_order_status))
        .route("/inventory", get(get_inventory))
        .route("/inventory/sync", post(trigger_inventory_sync))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/queue/stats", get(queue_stats))
        .route("/queue/jobs/:id", get(get_job_status));

    Router::new()
        .nest("/api/v1", v1)
        .route("/health", get(health))
        .with_state(state)
}

// ----------------------------
// Errors
// ----------------------------

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = %e, "internal error");
        Self::internal(format!("internal error: {e}"))
    }
}

/// Synchronous upstream failures at the HTTP boundary: client-caused
/// categories keep their status, everything transient becomes a 500.
impl From<WmsError> for ApiError {
    fn from(e: WmsError) -> Self {
        match &e {
            WmsError::NotFound => Self::not_found("not found upstream"),
            WmsError::BadRequest { message } => Self::bad_request(message.clone()),
            _ => {
                tracing::error!(error = %e, "upstream error");
                Self::internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            status_code: self.status.as_u16(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

// ----------------------------
// Orders
// ----------------------------

async fn submit_order(
    State(state): State<ApiState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmitOrderResponse>), ApiError> {
    let mut submission: OrderSubmission = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("invalid order payload: {e}")))?;

    submission
        .validate()
        .map_err(ApiError::bad_request)?;

    // Stamp the submission timestamp once, at enqueue time; the processor
    // never consults a clock.
    let queued_at = Utc::now();
    if submission.order_date.is_none() {
        submission.order_date = Some(queued_at);
    }

    let payload = serde_json::to_value(&submission)
        .map_err(|e| ApiError::internal(format!("unserializable payload: {e}")))?;

    let job_id = state
        .jobs
        .enqueue(NewJob {
            queue: state.queue.clone(),
            job_type: crate::jobs::CREATE_ORDER.to_string(),
            payload_json: payload,
            run_at: queued_at,
            priority: 0,
            max_attempts: state.max_attempts,
        })
        .await?;

    tracing::info!(job_id = %job_id, "order submission accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitOrderResponse {
            success: true,
            job_id,
            order: QueuedOrder {
                status: "paid".to_string(),
                queued_at,
            },
        }),
    ))
}

async fn list_orders(
    State(state): State<ApiState>,
    Query(q): Query<ListOrdersQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = WmsOrderQuery {
        status: q.status,
        customer: q.customer,
        start_date: q.start_date,
        end_date: q.end_date,
        limit: q.limit,
        offset: q.offset,
    };
    let orders = state.wms.list_orders(&query).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let order = state.wms.get_order(&id).await?;
    Ok(Json(order))
}

async fn update_order_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    if body.status.trim().is_empty() {
        return Err(ApiError::bad_request("status is required"));
    }

    let previous = state.wms.get_order(&id).await?;
    let previous_status = previous
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_string);

    state.wms.update_order_status(&id, &body.status).await?;

    Ok(Json(UpdateStatusResponse {
        success: true,
        order_id: id,
        previous_status,
        new_status: body.status,
    }))
}

// ----------------------------
// Inventory / products (cache read-through, stale fallback)
// ----------------------------

async fn read_through(
    state: &ApiState,
    key: &str,
    fetch: impl std::future::Future<Output = Result<Value, WmsError>>,
) -> Result<Value, ApiError> {
    // A cache outage degrades to a plain upstream read, never a failure.
    match state.cache.get_json::<Value>(key).await {
        Ok(Some(cached)) => return Ok(cached),
        Ok(None) => {}
        Err(e) => tracing::warn!(key, error = %e, "cache read failed"),
    }

    match fetch.await {
        Ok(fresh) => {
            if let Err(e) = state.cache.put_json(key, &fresh).await {
                tracing::warn!(key, error = %e, "cache write failed");
            }
            Ok(fresh)
        }
        Err(err) => {
            // Serve the long-TTL stale copy rather than failing the read.
            if let Ok(Some(stale)) = state.cache.get_stale_json::<Value>(key).await {
                tracing::warn!(key, error = %err, "upstream read failed, serving stale cache");
                return Ok(stale);
            }
            Err(err.into())
        }
    }
}

async fn get_inventory(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let inventory = read_through(&state, INVENTORY_KEY, state.wms.list_inventory()).await?;
    Ok(Json(inventory))
}

async fn trigger_inventory_sync(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<SyncTriggerResponse>), ApiError> {
    let ran = state.sync.sync_inventory().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SyncTriggerResponse { success: true, ran }),
    ))
}

async fn list_products(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let products = read_through(&state, PRODUCTS_KEY, state.wms.list_products()).await?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let key = format!("product:{id}");
    let product = read_through(&state, &key, state.wms.get_product(&id)).await?;
    Ok(Json(product))
}

// ----------------------------
// Queue observability
// ----------------------------

async fn queue_stats(State(state): State<ApiState>) -> Result<Json<QueueStatsResponse>, ApiError> {
    let counts = state.jobs.state_counts(&state.queue).await?;
    Ok(Json(QueueStatsResponse {
        queue: state.queue.clone(),
        depth: counts.waiting,
        counts,
    }))
}

async fn get_job_status(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = state
        .jobs
        .get_job(id)
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    let attempts = state.attempts.list_attempts_for_job(id).await?;

    let state_name = if job.status == "waiting" && job.run_at > Utc::now() {
        "delayed".to_string()
    } else {
        job.status.clone()
    };

    let last_error = if job.last_error_code.is_some() || job.last_error_message.is_some() {
        Some(JobLastError {
            code: job.last_error_code.clone(),
            message: job.last_error_message.clone(),
        })
    } else {
        None
    };

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        state: state_name,
        attempts: attempts.len() as i32,
        max_attempts: job.max_attempts,
        result: job.result_json,
        last_error,
        failed_reason: job.failed_reason,
        queued_at: job.created_at,
        updated_at: job.updated_at,
    }))
}

// ----------------------------
// Health
// ----------------------------

async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let cache_connected = state.cache.ping().await;
    Json(HealthResponse {
        status: if cache_connected { "ok" } else { "degraded" }.to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        cache_connected,
    })
}
