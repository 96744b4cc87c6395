use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uniform error envelope at the HTTP boundary.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitOrderResponse {
    pub success: bool,
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub order: QueuedOrder,
}

#[derive(Debug, Serialize)]
pub struct QueuedOrder {
    pub status: String,
    #[serde(rename = "queuedAt")]
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub customer: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "previousStatus")]
    pub previous_status: Option<String>,
    #[serde(rename = "newStatus")]
    pub new_status: String,
}

#[derive(Debug, Serialize)]
pub struct SyncTriggerResponse {
    pub success: bool,
    /// False when a sync was already in flight and this trigger was a no-op.
    pub ran: bool,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub state: String,
    pub attempts: i32,
    #[serde(rename = "maxAttempts")]
    pub max_attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(rename = "lastError", skip_serializing_if = "Option::is_none")]
    pub last_error: Option<JobLastError>,
    #[serde(rename = "failedReason", skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    #[serde(rename = "queuedAt")]
    pub queued_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct JobLastError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueStatsResponse {
    pub queue: String,
    pub counts: crate::jobs::JobCounts,
    /// Jobs runnable right now (waiting with run_at due).
    pub depth: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(rename = "uptimeSecs")]
    pub uptime_secs: u64,
    #[serde(rename = "cacheConnected")]
    pub cache_connected: bool,
}
