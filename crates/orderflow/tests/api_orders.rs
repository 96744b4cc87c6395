//! Submission endpoint through a real HTTP round-trip: validation fails
//! fast with no job created; accepted submissions enqueue exactly one job
//! and return a pollable handle. Skipped when TEST_DATABASE_URL is not set.

mod common;

use orderflow::api::{self, ApiState};
use orderflow::cache::Cache;
use orderflow::jobs::{AttemptsRepo, JobsRepo};
use orderflow::sync::SyncTask;
use orderflow::wms::{MockWms, Wms};
use serde_json::{json, Value};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

async fn spawn_api(pool: PgPool) -> String {
    let wms: Arc<dyn Wms> = Arc::new(MockWms::new());
    // The cache client is lazy; order routes never touch Redis.
    let cache = Cache::connect("redis://127.0.0.1:6399", 900).unwrap();

    let state = ApiState {
        jobs: JobsRepo::new(pool.clone()),
        attempts: AttemptsRepo::new(pool),
        wms: wms.clone(),
        cache: cache.clone(),
        sync: Arc::new(SyncTask::new(wms, cache)),
        queue: "orders".to_string(),
        max_attempts: 5,
        started_at: Instant::now(),
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn job_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn submission_without_items_is_rejected_before_enqueue() {
    let Some(pool) = common::setup_db().await else {
        return;
    };
    let base = spawn_api(pool.clone()).await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{base}/api/v1/orders"))
        .json(&json!({ "items": [], "customer": {"name": "Acme"} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 400);

    assert_eq!(job_count(&pool).await, 0, "invalid input must not enqueue");
}

#[tokio::test]
#[serial]
async fn submission_without_customer_is_rejected_before_enqueue() {
    let Some(pool) = common::setup_db().await else {
        return;
    };
    let base = spawn_api(pool.clone()).await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{base}/api/v1/orders"))
        .json(&json!({ "items": [{"sku": "WID-1", "quantity": 1, "price": 9.5}] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(job_count(&pool).await, 0);
}

#[tokio::test]
#[serial]
async fn valid_submission_is_accepted_with_a_job_handle() {
    let Some(pool) = common::setup_db().await else {
        return;
    };
    let base = spawn_api(pool.clone()).await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{base}/api/v1/orders"))
        .json(&json!({
            "items": [{"sku": "WID-1", "quantity": 3, "unitPrice": 9.5}],
            "customer": {"companyName": "Acme Foods", "email": "buyer@acme.test"},
            "deliveryMethod": "ground"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["status"], "paid");
    let job_id = body["jobId"].as_str().unwrap().to_string();

    assert_eq!(job_count(&pool).await, 1, "exactly one job per submission");

    // The handle is pollable while the job sits in the queue.
    let status: Value = http
        .get(format!("{base}/api/v1/queue/jobs/{job_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["state"], "waiting");
    assert_eq!(status["attempts"], 0);
    assert_eq!(status["maxAttempts"], 5);

    let stats: Value = http
        .get(format!("{base}/api/v1/queue/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["counts"]["waiting"], 1);
    assert_eq!(stats["depth"], 1);
}

#[tokio::test]
#[serial]
async fn unknown_order_maps_to_404_envelope() {
    let Some(pool) = common::setup_db().await else {
        return;
    };
    let base = spawn_api(pool).await;
    let http = reqwest::Client::new();

    let resp = http
        .get(format!("{base}/api/v1/orders/no-such-order"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["statusCode"], 404);
}
