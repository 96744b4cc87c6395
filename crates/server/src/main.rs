use orderflow::api::{self, ApiState};
use orderflow::cache::Cache;
use orderflow::config::Config;
use orderflow::jobs::maintenance::{cutoff_days, MaintenanceRepo};
use orderflow::jobs::retry::RetryConfig;
use orderflow::jobs::{AttemptsRepo, JobRunner, JobsRepo, OrderJobProcessor};
use orderflow::sync::SyncTask;
use orderflow::wms::{MockWms, Wms, WmsClient};
use orderflow::{db, jobs::JobStatus};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

mod worker;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env()?;
    init_tracing(&cfg.log_level);

    if cfg.error_report_dsn.is_some() {
        tracing::info!("error-report DSN configured (reporting handled by infrastructure)");
    }

    tracing::info!(
        worker_id = %cfg.worker_id,
        queue = %cfg.queue,
        port = cfg.port,
        mock_wms = cfg.wms.mock,
        "orderflow starting"
    );

    let pool = db::make_pool(&cfg.database_url).await?;
    if cfg.migrate_on_startup {
        db::run_migrations(&pool).await?;
    }

    let cache = Cache::connect(&cfg.redis_url, cfg.cache_ttl_secs)?;

    // Data source chosen once at startup; nothing downstream branches on it.
    let wms: Arc<dyn Wms> = if cfg.wms.mock {
        tracing::warn!("running against the mock WMS");
        Arc::new(MockWms::new())
    } else {
        Arc::new(WmsClient::new(&cfg.wms)?)
    };

    let jobs_repo = JobsRepo::new(pool.clone());
    let attempts_repo = AttemptsRepo::new(pool.clone());
    let maintenance_repo = MaintenanceRepo::new(pool.clone());

    let runner = JobRunner::new(
        jobs_repo.clone(),
        attempts_repo.clone(),
        RetryConfig {
            base_ms: cfg.retry_base_ms,
            ..RetryConfig::default()
        },
    );
    let processor = OrderJobProcessor::new(wms.clone());
    let sync = Arc::new(SyncTask::new(wms.clone(), cache.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ---- Worker loop ----
    let worker_handle = tokio::spawn(worker::run(
        cfg.clone(),
        jobs_repo.clone(),
        attempts_repo.clone(),
        runner,
        processor,
        shutdown_rx.clone(),
    ));

    // ---- Maintenance loop ----
    let maintenance_handle = {
        let cfg = cfg.clone();
        let maintenance = maintenance_repo;
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut tick =
                tokio::time::interval(Duration::from_secs(cfg.maintenance_interval_secs));
            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = shutdown.changed() => return Ok::<(), anyhow::Error>(()),
                }

                for (status, keep) in [
                    (JobStatus::Completed.as_str(), cfg.keep_completed),
                    (JobStatus::Failed.as_str(), cfg.keep_failed),
                ] {
                    match maintenance.prune_keep_most_recent(status, keep).await {
                        Ok(n) if n > 0 => {
                            tracing::info!(status, pruned = n, "pruned finished jobs")
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "maintenance prune error"),
                    }
                }

                let cutoff = cutoff_days(cfg.prune_grace_days);
                match maintenance.prune_finished_older_than(cutoff, 500).await {
                    Ok(n) if n > 0 => tracing::info!(pruned = n, "pruned jobs past grace period"),
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "maintenance prune error"),
                }
            }
        })
    };

    // ---- Scheduled sync loops ----
    let inventory_handle = spawn_interval_loop(
        "inventory-sync",
        Duration::from_secs(cfg.inventory_sync_minutes * 60),
        shutdown_rx.clone(),
        {
            let sync = sync.clone();
            move || {
                let sync = sync.clone();
                async move { sync.sync_inventory().await.map(|_| ()) }
            }
        },
    );
    let order_poll_handle = spawn_interval_loop(
        "order-poll",
        Duration::from_secs(cfg.order_poll_minutes * 60),
        shutdown_rx.clone(),
        {
            let sync = sync.clone();
            move || {
                let sync = sync.clone();
                async move { sync.poll_orders().await.map(|_| ()) }
            }
        },
    );

    // ---- HTTP server ----
    let state = ApiState {
        jobs: jobs_repo,
        attempts: attempts_repo,
        wms,
        cache,
        sync,
        queue: cfg.queue.clone(),
        max_attempts: cfg.max_attempts,
        started_at: Instant::now(),
    };
    let app = api::router(state).layer(cors_layer(cfg.cors_origin.as_deref())?);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server terminated unexpectedly");
    }

    // Stop background loops; force exit if shutdown hangs past the grace
    // window.
    let _ = shutdown_tx.send(true);
    let drain = async {
        for (name, handle) in [
            ("worker", worker_handle),
            ("maintenance", maintenance_handle),
            ("inventory-sync", inventory_handle),
            ("order-poll", order_poll_handle),
        ] {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(task = name, error = %e, "task ended with error"),
                Err(e) => tracing::error!(task = name, error = %e, "task join error"),
            }
        }
    };

    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        tracing::warn!("shutdown grace period elapsed, forcing exit");
        std::process::exit(1);
    }

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cors_layer(origin: Option<&str>) -> anyhow::Result<tower_http::cors::CorsLayer> {
    use axum::http::HeaderValue;
    use tower_http::cors::CorsLayer;

    Ok(match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        None => CorsLayer::permissive(),
    })
}

/// Wait for SIGTERM or SIGINT (Docker sends SIGTERM, Ctrl+C sends SIGINT).
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let sigint = tokio::signal::ctrl_c();

    tokio::select! {
        _ = sigint => tracing::info!("SIGINT received, starting graceful shutdown"),
        _ = sigterm.recv() => tracing::info!("SIGTERM received, starting graceful shutdown"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("install CTRL+C handler");
    tracing::info!("shutdown signal received");
}

fn spawn_interval_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut task: F,
) -> tokio::task::JoinHandle<anyhow::Result<()>>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        // First tick fires immediately; prime the caches on startup.
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.changed() => return Ok(()),
            }
            if let Err(e) = task().await {
                tracing::error!(task = name, error = %e, "scheduled task failed");
            }
        }
    })
}
