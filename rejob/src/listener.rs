//! Receiving the outcome of a job.
//!
//! A [`Listener`] is handed the [`Outcome`] of a job exactly once, when the job completes or
//! fails. A job that is canceled drops its listener without calling it.
//!
//! Closures, [`oneshot::Sender`]s, and [`mpsc::UnboundedSender`]s are all listeners:
//!
//! ```
//! # use rejob::prelude::*;
//! let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel::<Outcome<i32>>();
//! let first = Job::new(1, sender.clone());
//! let second = Job::new(2, sender);
//!
//! assert!(first.deliver_result(10));
//! assert!(second.deliver_error(JobError::new("boom")));
//!
//! assert_eq!(receiver.try_recv().unwrap().unwrap(), 10);
//! assert!(receiver.try_recv().unwrap().is_err());
//! ```
//!
//! Listeners run on the thread delivering the outcome and should return promptly.
use tokio::sync::{mpsc, oneshot};

use crate::Outcome;

/// Receives the outcome of a single job.
pub trait Listener<R>: Send {
    /// Called once with the job's result or error.
    fn on_outcome(self: Box<Self>, outcome: Outcome<R>);
}

impl<R, F> Listener<R> for F
where
    F: FnOnce(Outcome<R>) + Send,
{
    fn on_outcome(self: Box<Self>, outcome: Outcome<R>) {
        (*self)(outcome)
    }
}

impl<R> Listener<R> for oneshot::Sender<Outcome<R>>
where
    R: Send,
{
    fn on_outcome(self: Box<Self>, outcome: Outcome<R>) {
        if self.send(outcome).is_err() {
            tracing::trace!("Job outcome receiver dropped before delivery");
        }
    }
}

impl<R> Listener<R> for mpsc::UnboundedSender<Outcome<R>>
where
    R: Send,
{
    fn on_outcome(self: Box<Self>, outcome: Outcome<R>) {
        if self.send(outcome).is_err() {
            tracing::trace!("Job outcome channel closed before delivery");
        }
    }
}
