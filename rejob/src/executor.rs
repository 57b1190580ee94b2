use std::time::Duration;

use async_trait::async_trait;

use crate::JobError;

/// The unit of work behind a job.
///
/// A job only tracks state and delivers outcomes; implementing this trait defines what running
/// the job actually does. [`crate::job::Job::on_execute`] invokes it with the job's input.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The type of the job's input.
    ///
    /// If this is not needed it can be set to unit `()`.
    type Data: Send + Sync;
    /// The type produced by a successful execution.
    type Output: Send;
    /// The name of the executor, used when logging.
    const NAME: &'static str;

    async fn execute(&self, data: &Self::Data) -> Result<Self::Output, JobError>;

    /// An upper bound on a single attempt, overriding the runner's configured timeout.
    ///
    /// When the bound elapses the attempt fails with a [`JobError`] and may be retried.
    fn timeout(&self, _data: &Self::Data) -> Option<Duration> {
        None
    }
}
