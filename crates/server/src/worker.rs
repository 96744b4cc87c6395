//! Worker loop: lease a runnable job, execute it, apply the outcome.
//! Stalled jobs (lease expired under a dead worker) are reaped on a fixed
//! interval so they become re-deliverable.

use orderflow::config::Config;
use orderflow::jobs::processor::ProcessFailure;
use orderflow::jobs::retry::ErrorClass;
use orderflow::jobs::{AttemptsRepo, JobRunner, JobsRepo, OrderJobProcessor, CREATE_ORDER};
use std::time::{Duration, Instant};
use tokio::sync::watch;

const IDLE_POLL: Duration = Duration::from_millis(250);
const REAP_INTERVAL: Duration = Duration::from_secs(5);

pub async fn run(
    cfg: Config,
    jobs: JobsRepo,
    attempts: AttemptsRepo,
    runner: JobRunner,
    processor: OrderJobProcessor,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let worker_id = cfg.worker_id.clone();
    let queue = cfg.queue.clone();
    let mut last_reap = Instant::now() - REAP_INTERVAL;

    tracing::info!(worker_id = %worker_id, queue = %queue, "worker loop started");

    loop {
        if *shutdown.borrow() {
            tracing::info!(worker_id = %worker_id, "worker loop stopping");
            return Ok(());
        }

        if last_reap.elapsed() >= REAP_INTERVAL {
            let reaped = jobs.reap_expired_locks().await?;
            last_reap = Instant::now();
            if reaped > 0 {
                tracing::warn!(worker_id = %worker_id, reaped, "requeued stalled jobs");
            }
        }

        let Some(job) = jobs
            .lease_one_job(&queue, &worker_id, cfg.lease_seconds)
            .await?
        else {
            tokio::select! {
                _ = tokio::time::sleep(IDLE_POLL) => {}
                _ = shutdown.changed() => {}
            }
            continue;
        };

        let attempt = attempts.start_attempt(job.id, &worker_id).await?;
        tracing::debug!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt_no = attempt.attempt_no,
            "leased job"
        );

        let start = Instant::now();
        let outcome = match job.job_type.as_str() {
            CREATE_ORDER => processor.process(&job.payload_json).await,
            other => Err(ProcessFailure {
                code: "UNKNOWN_JOB_TYPE",
                message: format!("no handler for job_type={other}"),
                class: ErrorClass::NonRetryable,
            }),
        };
        let latency_ms = start.elapsed().as_millis() as i32;

        match outcome {
            Ok(result) => {
                runner
                    .on_success(job.id, attempt.id, &worker_id, latency_ms, result)
                    .await?;
                tracing::info!(
                    job_id = %job.id,
                    attempt_no = attempt.attempt_no,
                    latency_ms,
                    "job completed"
                );
            }
            Err(failure) => {
                runner
                    .on_failure(
                        job.id,
                        attempt.id,
                        &worker_id,
                        latency_ms,
                        &failure,
                        attempt.attempt_no,
                        job.max_attempts,
                    )
                    .await?;
            }
        }
    }
}
