//! A reference retry loop driving a job through its lifecycle.
//!
//! [`JobRunner::run`] executes a job, consults the job's [`RetryPolicy`] after each failure,
//! waits out the policy's backoff, and finally delivers exactly one outcome. Cancelling the job
//! at any point stops the loop; an attempt already in flight is left to finish in the background
//! and its outcome is discarded.
use std::{sync::Arc, time::Duration};

use tokio::task::JoinError;
use tracing::{instrument, Instrument};

use crate::{
    config::RetryConfig,
    executor::Executor,
    job::{Job, JobStatus},
    retry::RetryPolicy,
    JobError, Outcome,
};

pub struct JobRunner<E> {
    executor: Arc<E>,
    timeout: Option<Duration>,
}

impl<E> JobRunner<E>
where
    E: Executor + 'static,
    E::Data: 'static,
    E::Output: 'static,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
            timeout: None,
        }
    }

    pub fn from_config(executor: E, config: &RetryConfig) -> Self {
        Self {
            executor: Arc::new(executor),
            timeout: config.timeout(),
        }
    }

    /// Fails any attempt taking longer than `timeout`.
    ///
    /// [`Executor::timeout`] takes precedence when it returns a value.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    /// Runs `job` until it completes, fails for good, or is canceled, and returns the final
    /// status.
    #[instrument(skip(self, job, policy), fields(job_id = %job.id(), executor = E::NAME))]
    pub async fn run<P>(&self, job: Arc<Job<E::Data, E::Output>>, mut policy: P) -> JobStatus
    where
        P: RetryPolicy + Send,
    {
        let job_id = job.id();
        loop {
            if !job.is_pending() {
                tracing::debug!(%job_id, "Not executing job {job_id}, it is {}", job.status());
                return job.status();
            }

            let outcome = tokio::select! {
                biased;

                _ = job.cancelled() => {
                    tracing::debug!(
                        %job_id,
                        "Job {job_id} canceled while executing, its outcome will be discarded"
                    );
                    return job.status();
                }
                outcome = self.attempt(&job) => outcome,
            };

            // Canceled while the attempt was finishing
            if !job.is_pending() {
                tracing::debug!(
                    %job_id,
                    "Discarding outcome for job {job_id}, it is {}",
                    job.status()
                );
                return job.status();
            }

            let error = match outcome {
                Ok(value) => {
                    job.deliver_result(value);
                    return job.status();
                }
                Err(error) => error,
            };

            if !policy.retry_or_not() {
                tracing::error!(
                    %job_id,
                    %error,
                    "Job {job_id} failed after {} retries and will not be retried: {error}",
                    policy.current_retry_count()
                );
                job.deliver_error(error);
                return job.status();
            }

            let delay = policy.backoff();
            tracing::warn!(
                %job_id,
                %error,
                retry = policy.current_retry_count(),
                "Job {job_id} failed and will be retried in {delay}: {error}"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay.to_std().unwrap_or(Duration::ZERO)) => {},
                _ = job.cancelled() => {
                    tracing::debug!(%job_id, "Job {job_id} canceled while waiting to retry");
                    return job.status();
                }
            }
        }
    }

    /// Runs every job concurrently, each with its own policy from `make_policy`.
    pub async fn run_all<P, F>(
        &self,
        jobs: impl IntoIterator<Item = Arc<Job<E::Data, E::Output>>>,
        mut make_policy: F,
    ) -> Vec<JobStatus>
    where
        P: RetryPolicy + Send,
        F: FnMut() -> P,
    {
        futures::future::join_all(jobs.into_iter().map(|job| self.run(job, make_policy()))).await
    }

    async fn attempt(&self, job: &Arc<Job<E::Data, E::Output>>) -> Outcome<E::Output> {
        let timeout = self.executor.timeout(job.input()).or(self.timeout);
        let executor = self.executor.clone();
        let job = job.clone();

        let fut = async move {
            let execution = job.on_execute(executor.as_ref());
            match timeout {
                Some(timeout) => tokio::time::timeout(timeout, execution)
                    .await
                    .unwrap_or_else(|elapsed| {
                        Err(JobError::with_cause(
                            format!("Job failed to complete within timeout: {timeout:?}"),
                            elapsed,
                        ))
                    }),
                None => execution.await,
            }
        };

        tokio::spawn(fut.in_current_span())
            .await
            .unwrap_or_else(|error| Err(error.into()))
    }
}

impl From<JoinError> for JobError {
    fn from(value: JoinError) -> Self {
        let msg = value.to_string();
        let message = match value.try_into_panic() {
            Ok(panic) => panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or(msg),
            Err(_) => msg,
        };
        Self::new(format!("Job panicked: {message}"))
    }
}
