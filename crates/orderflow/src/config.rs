// Central place for runtime configuration: typed values loaded from the
// environment (and .env in development) instead of raw strings everywhere.

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,

    pub port: u16,
    pub cors_origin: Option<String>,
    pub log_level: String,
    pub error_report_dsn: Option<String>,

    pub wms: WmsConfig,

    pub cache_ttl_secs: u64,
    pub inventory_sync_minutes: u64,
    pub order_poll_minutes: u64,

    pub worker_id: String,
    pub queue: String,
    pub lease_seconds: i64,
    pub migrate_on_startup: bool,

    pub max_attempts: i32,
    pub retry_base_ms: i64,

    pub keep_completed: i64,
    pub keep_failed: i64,
    pub prune_grace_days: i64,
    pub maintenance_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WmsConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub customer_id: Option<String>,
    pub token_ttl_secs: Option<u64>,
    pub mock: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let port = env_parse("PORT").unwrap_or(3001);
        let cors_origin = env_opt("CORS_ORIGIN");
        let log_level = env_opt("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let error_report_dsn = env_opt("ERROR_REPORT_DSN");

        let wms_base_url = env_opt("WMS_BASE_URL")
            .unwrap_or_else(|| "https://secure-wms.com".to_string());
        let wms = WmsConfig {
            token_url: env_opt("WMS_TOKEN_URL")
                .unwrap_or_else(|| format!("{}/auth/token", wms_base_url.trim_end_matches('/'))),
            base_url: wms_base_url,
            client_id: env_opt("WMS_CLIENT_ID"),
            client_secret: env_opt("WMS_CLIENT_SECRET"),
            customer_id: env_opt("WMS_CUSTOMER_ID"),
            token_ttl_secs: env_parse("WMS_TOKEN_TTL_SECS"),
            mock: env_bool("WMS_MOCK").unwrap_or(false),
        };

        let worker_id = env_opt("WORKER_ID")
            .or_else(|| std::env::var("HOSTNAME").ok())
            .unwrap_or_else(|| "worker-1".to_string());

        Ok(Self {
            database_url,
            redis_url,
            port,
            cors_origin,
            log_level,
            error_report_dsn,
            wms,
            cache_ttl_secs: env_parse("CACHE_TTL_SECS").unwrap_or(900),
            inventory_sync_minutes: env_parse("INVENTORY_SYNC_MINUTES").unwrap_or(15),
            order_poll_minutes: env_parse("ORDER_POLL_MINUTES").unwrap_or(10),
            worker_id,
            queue: env_opt("QUEUE").unwrap_or_else(|| "orders".to_string()),
            lease_seconds: env_parse("LEASE_SECONDS").unwrap_or(30),
            migrate_on_startup: env_bool("MIGRATE_ON_STARTUP").unwrap_or(true),
            max_attempts: env_parse("JOB_MAX_ATTEMPTS").unwrap_or(5),
            retry_base_ms: env_parse("JOB_RETRY_BASE_MS").unwrap_or(2000),
            keep_completed: env_parse("KEEP_COMPLETED_JOBS").unwrap_or(100),
            keep_failed: env_parse("KEEP_FAILED_JOBS").unwrap_or(500),
            prune_grace_days: env_parse("PRUNE_GRACE_DAYS").unwrap_or(7),
            maintenance_interval_secs: env_parse("MAINTENANCE_INTERVAL_SECS").unwrap_or(60),
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_opt(key).and_then(|s| s.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_opt(key).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
