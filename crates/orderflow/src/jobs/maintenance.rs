//! Bounded retention for finished jobs: keep the most recent N completed
//! and failed entries, and drop anything older than the grace period.
//! Attempt rows go with their job via ON DELETE CASCADE.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

#[derive(Clone)]
pub struct MaintenanceRepo {
    pool: PgPool,
}

impl MaintenanceRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete finished jobs of `status` beyond the most recent `keep`.
    /// Returns the number pruned.
    pub async fn prune_keep_most_recent(&self, status: &str, keep: i64) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id IN (
                SELECT id
                FROM jobs
                WHERE status = $1
                ORDER BY updated_at DESC
                OFFSET $2
            )
            "#,
        )
        .bind(status)
        .bind(keep.max(0))
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }

    /// Delete completed/failed jobs untouched since `cutoff`.
    pub async fn prune_finished_older_than(
        &self,
        cutoff: DateTime<Utc>,
        batch: i64,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM jobs
            WHERE id IN (
                SELECT id
                FROM jobs
                WHERE status IN ('completed', 'failed')
                  AND updated_at < $1
                ORDER BY updated_at ASC
                LIMIT $2
            )
            "#,
        )
        .bind(cutoff)
        .bind(batch)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }
}

/// Convenience: compute cutoff like "now - N days".
pub fn cutoff_days(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}
