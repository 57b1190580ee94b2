//! Job lifecycle, result delivery, and retry policies for asynchronous work.
//!
//! A [`Job`](job::Job) carries an input, a lifecycle (`Pending` then exactly one of `Canceled`,
//! `Completed`, or `Failed`), and at most one [`Listener`](listener::Listener) that is told the
//! outcome exactly once. Cancellation and outcome delivery race through a single atomic
//! transition so that exactly one of them wins.
//!
//! Whether a failed job is attempted again is decided by a [`RetryPolicy`](retry::RetryPolicy).
//! The crate does not ship a thread pool or a queue; [`JobRunner`](runner::JobRunner) is a small
//! reference loop showing how an executor is expected to drive a job and its policy.
//!
//! # Example
//!
//! ```
//! use rejob::prelude::*;
//!
//! struct Shout;
//!
//! #[async_trait::async_trait]
//! impl Executor for Shout {
//!     type Data = String;
//!     type Output = String;
//!     const NAME: &'static str = "shout";
//!
//!     async fn execute(&self, data: &String) -> Result<String, JobError> {
//!         Ok(data.to_uppercase())
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let (job, receiver) = Job::builder("hello".to_owned()).build_with_receiver();
//!
//! let status = JobRunner::new(Shout)
//!     .run(std::sync::Arc::new(job), DefaultRetryPolicy::new(3))
//!     .await;
//!
//! assert_eq!(status, JobStatus::Completed);
//! assert_eq!(receiver.await.unwrap().unwrap(), "HELLO");
//! # });
//! ```
use std::error::Error as StdError;

use thiserror::Error;

pub mod backoff;
pub mod config;
pub mod executor;
pub mod job;
pub mod listener;
pub mod prelude;
pub mod retry;
pub mod runner;

/// The result handed to a [`listener::Listener`] once a job finishes.
pub type Outcome<R> = Result<R, JobError>;

type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// The error raised when a job's execution fails.
///
/// This is the only error type produced or delivered by this crate. It carries a human readable
/// message and optionally the underlying cause, available through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct JobError {
    message: String,
    #[source]
    cause: Option<BoxedCause>,
}

impl JobError {
    /// Creates an error without an underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates an error wrapping `cause`.
    pub fn with_cause(message: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    /// Wraps `cause`, reusing its display output as the message.
    pub fn from_cause(cause: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: cause.to_string(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    #[test]
    fn error_without_cause() {
        let error = JobError::new("boom");

        assert_eq!(error.to_string(), "boom");
        assert_eq!(error.message(), "boom");
        assert!(error.source().is_none());
    }

    #[test]
    fn error_exposes_cause_as_source() {
        let error = JobError::with_cause("request failed", ConnectionReset);

        assert_eq!(error.to_string(), "request failed");
        let source = error.source().expect("cause should be the source");
        assert_eq!(source.to_string(), "connection reset");
        assert!(error.cause().unwrap().is::<ConnectionReset>());
    }

    #[test]
    fn from_cause_reuses_message() {
        let error = JobError::from_cause(ConnectionReset);

        assert_eq!(error.message(), "connection reset");
        assert!(error.source().is_some());
    }

    #[test]
    fn with_cause_accepts_strings() {
        let error = JobError::with_cause("outer", "inner");

        assert_eq!(error.source().unwrap().to_string(), "inner");
    }
}
