//! The job entity and its lifecycle.
//!
//! Every job starts out [`JobStatus::Pending`] and moves exactly once into one of the terminal
//! states [`JobStatus::Canceled`], [`JobStatus::Completed`], or [`JobStatus::Failed`]. The move is
//! a single compare-and-swap, so when [`Job::cancel`] races with [`Job::deliver_result`] or
//! [`Job::deliver_error`] exactly one of them takes effect.
//!
//! ```
//! # use rejob::prelude::*;
//! let (job, mut receiver) = Job::builder("input").build_with_receiver();
//!
//! assert!(job.is_pending());
//! assert!(job.deliver_result(42));
//!
//! // The outcome has been delivered, so cancelling is a no-op
//! assert!(!job.cancel());
//! assert!(!job.is_canceled());
//! assert_eq!(job.status(), JobStatus::Completed);
//! assert_eq!(receiver.try_recv().unwrap().unwrap(), 42);
//! ```
use std::{
    fmt::{Debug, Display},
    sync::{
        atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering},
        Mutex, PoisonError,
    },
};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{executor::Executor, listener::Listener, JobError, Outcome};

pub mod builder;

use builder::JobBuilder;

/// A process unique identifier, used to correlate a job across log lines.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

impl JobId {
    fn next() -> Self {
        Self(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<JobId> for u64 {
    fn from(value: JobId) -> Self {
        value.0
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum JobStatus {
    Pending = 0,
    Canceled = 1,
    Completed = 2,
    Failed = 3,
}

impl JobStatus {
    /// Whether no further transition is possible from this status.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Canceled,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Pending => "pending",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(status)
    }
}

/// A unit of asynchronous work: an input, a lifecycle, and at most one [`Listener`].
///
/// Jobs are shared between the submitter and whoever executes them, usually through an
/// [`std::sync::Arc`]. All lifecycle operations take `&self`.
pub struct Job<I, R> {
    id: JobId,
    input: I,
    state: AtomicU8,
    attempts: AtomicU32,
    listener: Mutex<Option<Box<dyn Listener<R>>>>,
    cancellation: CancellationToken,
}

impl<I, R> Job<I, R> {
    /// Creates a pending job that reports its outcome to `listener`.
    pub fn new(input: I, listener: impl Listener<R> + 'static) -> Self {
        Self::with_listener(input, Some(Box::new(listener)))
    }

    /// Creates a pending job nobody listens to; delivering its outcome is a no-op.
    pub fn detached(input: I) -> Self {
        Self::with_listener(input, None)
    }

    pub fn builder(input: I) -> JobBuilder<I, R> {
        JobBuilder::new(input)
    }

    pub(crate) fn with_listener(input: I, listener: Option<Box<dyn Listener<R>>>) -> Self {
        Self {
            id: JobId::next(),
            input,
            state: AtomicU8::new(JobStatus::Pending as u8),
            attempts: AtomicU32::new(0),
            listener: Mutex::new(listener),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.state.load(Ordering::Acquire))
    }

    /// How many times [`Job::on_execute`] has been started.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// True until the job is canceled or an outcome has been delivered.
    pub fn is_pending(&self) -> bool {
        self.status() == JobStatus::Pending
    }

    pub fn is_canceled(&self) -> bool {
        self.status() == JobStatus::Canceled
    }

    /// Cancels the job if it is still pending.
    ///
    /// Returns `true` if this call canceled the job. Cancelling a job in a terminal state,
    /// including one that is already canceled, does nothing and returns `false`. The listener is
    /// dropped without being called.
    ///
    /// Work that is already executing is not interrupted; its outcome will be discarded.
    pub fn cancel(&self) -> bool {
        let job_id = self.id;
        match self.transition(JobStatus::Canceled) {
            Ok(()) => {
                tracing::debug!(%job_id, "Job {job_id} canceled");
                drop(self.take_listener());
                self.cancellation.cancel();
                true
            }
            Err(status) => {
                tracing::trace!(
                    %job_id,
                    %status,
                    "Ignoring cancel for job {job_id} which is already {status}"
                );
                false
            }
        }
    }

    /// Resolves once the job has been canceled.
    ///
    /// Never resolves for a job that completes or fails.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Runs `executor` on this job's input and returns what it produced.
    ///
    /// This does not change the job's status; feeding the outcome back through
    /// [`Job::deliver`] is the caller's responsibility.
    pub async fn on_execute<E>(&self, executor: &E) -> Outcome<R>
    where
        E: Executor<Data = I, Output = R>,
    {
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        let job_id = self.id;
        tracing::debug!(%job_id, attempt, "Executing job {job_id} with {}", E::NAME);
        executor.execute(&self.input).await
    }

    /// Completes the job and hands `value` to the listener.
    ///
    /// Returns `false`, discarding `value`, if the job is no longer pending.
    pub fn deliver_result(&self, value: R) -> bool {
        self.deliver(Ok(value))
    }

    /// Fails the job and hands `error` to the listener.
    ///
    /// Returns `false`, discarding `error`, if the job is no longer pending.
    pub fn deliver_error(&self, error: JobError) -> bool {
        self.deliver(Err(error))
    }

    /// Moves the job to [`JobStatus::Completed`] or [`JobStatus::Failed`] depending on `outcome`
    /// and notifies the listener.
    pub fn deliver(&self, outcome: Outcome<R>) -> bool {
        let job_id = self.id;
        let target = match outcome {
            Ok(_) => JobStatus::Completed,
            Err(_) => JobStatus::Failed,
        };

        if let Err(status) = self.transition(target) {
            tracing::debug!(
                %job_id,
                %status,
                "Discarding outcome for job {job_id} which is already {status}"
            );
            return false;
        }

        tracing::debug!(%job_id, "Job {job_id} {target}");
        match self.take_listener() {
            Some(listener) => listener.on_outcome(outcome),
            None => tracing::trace!(%job_id, "No listener for job {job_id}"),
        }
        true
    }

    fn transition(&self, to: JobStatus) -> Result<(), JobStatus> {
        self.state
            .compare_exchange(
                JobStatus::Pending as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(JobStatus::from_u8)
    }

    // Only the winner of `transition` calls this, so the lock is never contended.
    fn take_listener(&self) -> Option<Box<dyn Listener<R>>> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<I, R> Debug for Job<I, R>
where
    I: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("input", &self.input)
            .field("status", &self.status())
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}
