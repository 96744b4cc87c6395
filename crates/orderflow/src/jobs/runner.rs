use crate::jobs::{
    attempts::AttemptsRepo,
    processor::ProcessFailure,
    repo::JobsRepo,
    retry::{next_delay_ms, ErrorClass, RetryConfig},
};
use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use uuid::Uuid;

/// Applies the outcome of one job execution to the store: record the
/// attempt, then complete, reschedule with backoff, or fail terminally.
#[derive(Clone)]
pub struct JobRunner {
    jobs: JobsRepo,
    attempts: AttemptsRepo,
    retry_cfg: RetryConfig,
}

impl JobRunner {
    pub fn new(jobs: JobsRepo, attempts: AttemptsRepo, retry_cfg: RetryConfig) -> Self {
        Self {
            jobs,
            attempts,
            retry_cfg,
        }
    }

    pub async fn on_success(
        &self,
        job_id: Uuid,
        attempt_id: Uuid,
        worker_id: &str,
        latency_ms: i32,
        result_json: serde_json::Value,
    ) -> anyhow::Result<()> {
        self.attempts
            .finish_succeeded(attempt_id, latency_ms)
            .await?;
        self.jobs
            .mark_completed(job_id, worker_id, result_json)
            .await?;
        Ok(())
    }

    pub async fn on_failure(
        &self,
        job_id: Uuid,
        attempt_id: Uuid,
        worker_id: &str,
        latency_ms: i32,
        failure: &ProcessFailure,
        attempt_no: i32,
        max_attempts: i32,
    ) -> anyhow::Result<()> {
        self.attempts
            .finish_failed(attempt_id, latency_ms, failure.code, &failure.message)
            .await?;

        let can_retry = failure.class == ErrorClass::Retryable && attempt_no < max_attempts;

        if can_retry {
            let mut rng = StdRng::from_entropy();
            let delay_ms = next_delay_ms(attempt_no, &self.retry_cfg, &mut rng);
            let next_run_at = Utc::now() + chrono::Duration::milliseconds(delay_ms);

            tracing::warn!(
                job_id = %job_id,
                attempt_no,
                max_attempts,
                delay_ms,
                code = failure.code,
                "job rescheduled for retry"
            );

            self.jobs
                .reschedule_for_retry(
                    job_id,
                    next_run_at,
                    Some(failure.code),
                    Some(&failure.message),
                )
                .await?;
        } else {
            let failed_reason = match failure.class {
                ErrorClass::NonRetryable => "NON_RETRYABLE",
                ErrorClass::Retryable => "MAX_ATTEMPTS_EXCEEDED",
            };

            tracing::error!(
                job_id = %job_id,
                attempt_no,
                max_attempts,
                code = failure.code,
                reason = failed_reason,
                last_error = %failure.message,
                "job failed terminally"
            );

            self.jobs
                .mark_failed(
                    job_id,
                    worker_id,
                    failed_reason,
                    Some(failure.code),
                    Some(&failure.message),
                )
                .await?;
        }

        Ok(())
    }
}
