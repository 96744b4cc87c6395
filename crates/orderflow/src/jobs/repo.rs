use crate::jobs::model::{Job, JobCounts, JobStatus, NewJob};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct JobsRepo {
    pool: PgPool,
}

impl JobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----------------------------
    // Enqueue
    // ----------------------------

    pub async fn enqueue(&self, job: NewJob) -> anyhow::Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO jobs (queue, job_type, payload_json, run_at, status, priority, max_attempts)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&job.queue)
        .bind(&job.job_type)
        .bind(&job.payload_json)
        .bind(job.run_at)
        .bind(JobStatus::Waiting.as_str())
        .bind(job.priority)
        .bind(job.max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn enqueue_now(
        &self,
        queue: &str,
        job_type: &str,
        payload_json: serde_json::Value,
        max_attempts: i32,
    ) -> anyhow::Result<Uuid> {
        self.enqueue(NewJob {
            queue: queue.to_string(),
            job_type: job_type.to_string(),
            payload_json,
            run_at: Utc::now(),
            priority: 0,
            max_attempts,
        })
        .await
    }

    // ----------------------------
    // Reads
    // ----------------------------

    pub async fn get_job(&self, job_id: Uuid) -> anyhow::Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Per-state counts for the queue. `delayed` = waiting with a future
    /// `run_at`; `waiting` here means runnable now. The five counts sum to
    /// the number of retained jobs.
    pub async fn state_counts(&self, queue: &str) -> anyhow::Result<JobCounts> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'waiting' AND run_at <= now()),
                COUNT(*) FILTER (WHERE status = 'active'),
                COUNT(*) FILTER (WHERE status = 'completed'),
                COUNT(*) FILTER (WHERE status = 'failed'),
                COUNT(*) FILTER (WHERE status = 'waiting' AND run_at > now())
            FROM jobs
            WHERE queue = $1
            "#,
        )
        .bind(queue)
        .fetch_one(&self.pool)
        .await?;

        Ok(JobCounts {
            waiting: row.0,
            active: row.1,
            completed: row.2,
            failed: row.3,
            delayed: row.4,
        })
    }

    // ----------------------------
    // Leasing
    // ----------------------------

    /// Lease exactly one runnable job for this worker.
    ///
    /// Correctness: SELECT ... FOR UPDATE SKIP LOCKED, so two workers never
    /// claim the same job. The lease expires after `lease_seconds`; an
    /// expired lease marks the job stalled and `reap_expired_locks` makes
    /// it re-deliverable.
    pub async fn lease_one_job(
        &self,
        queue: &str,
        worker_id: &str,
        lease_seconds: i64,
    ) -> anyhow::Result<Option<Job>> {
        let mut tx = self.pool.begin().await?;

        let candidate = sqlx::query_as::<_, Job>(
            r#"
            SELECT *
            FROM jobs
            WHERE queue = $1
              AND status = 'waiting'
              AND run_at <= now()
            ORDER BY priority DESC, run_at ASC, created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .bind(queue)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = candidate else {
            tx.commit().await?;
            return Ok(None);
        };

        let leased = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'active',
                locked_by = $2,
                locked_at = now(),
                lock_expires_at = now() + ($3::bigint * interval '1 second'),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(worker_id)
        .bind(lease_seconds)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(leased))
    }

    /// Requeue jobs whose worker died mid-processing (lease expired while
    /// still `active`). Keeps the crash-mid-processing guarantee: a job is
    /// never silently dropped, it becomes re-deliverable.
    pub async fn reap_expired_locks(&self) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'waiting',
                locked_at = NULL,
                locked_by = NULL,
                lock_expires_at = NULL,
                updated_at = now()
            WHERE status = 'active'
              AND lock_expires_at IS NOT NULL
              AND lock_expires_at < now()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }

    // ----------------------------
    // State transitions
    // ----------------------------

    pub async fn mark_completed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        result_json: serde_json::Value,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed',
                result_json = $3,
                locked_at = NULL,
                locked_by = NULL,
                lock_expires_at = NULL,
                updated_at = now()
            WHERE id = $1
              AND locked_by = $2
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(result_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn reschedule_for_retry(
        &self,
        job_id: Uuid,
        next_run_at: DateTime<Utc>,
        last_error_code: Option<&str>,
        last_error_message: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'waiting',
                run_at = $2,
                locked_at = NULL,
                locked_by = NULL,
                lock_expires_at = NULL,
                updated_at = now(),
                last_error_code = $3,
                last_error_message = $4
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(next_run_at)
        .bind(last_error_code)
        .bind(last_error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(
        &self,
        job_id: Uuid,
        worker_id: &str,
        failed_reason: &str,
        last_error_code: Option<&str>,
        last_error_message: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                failed_reason = $3,
                locked_at = NULL,
                locked_by = NULL,
                lock_expires_at = NULL,
                updated_at = now(),
                last_error_code = $4,
                last_error_message = $5
            WHERE id = $1
              AND locked_by = $2
            "#,
        )
        .bind(job_id)
        .bind(worker_id)
        .bind(failed_reason)
        .bind(last_error_code)
        .bind(last_error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
