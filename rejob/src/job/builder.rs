use tokio::sync::oneshot;

use crate::{listener::Listener, Outcome};

use super::Job;

/// Fluent construction of a [`Job`].
///
/// ```
/// # use rejob::prelude::*;
/// let job: Job<_, u32> = Job::builder("input")
///     .with_listener(|outcome: Outcome<u32>| println!("{outcome:?}"))
///     .build();
///
/// assert!(job.is_pending());
/// ```
pub struct JobBuilder<I, R> {
    input: I,
    listener: Option<Box<dyn Listener<R>>>,
}

impl<I, R> JobBuilder<I, R> {
    pub(super) fn new(input: I) -> Self {
        Self {
            input,
            listener: None,
        }
    }

    /// Sets the listener, replacing any previously set.
    pub fn with_listener(self, listener: impl Listener<R> + 'static) -> Self {
        Self {
            listener: Some(Box::new(listener)),
            ..self
        }
    }

    /// Builds the job. Without a listener the job's outcome is dropped on delivery.
    pub fn build(self) -> Job<I, R> {
        Job::with_listener(self.input, self.listener)
    }

    /// Builds the job with a oneshot channel as its listener, replacing any listener set so far.
    ///
    /// The receiver resolves with the outcome, or with an error if the job is canceled.
    pub fn build_with_receiver(self) -> (Job<I, R>, oneshot::Receiver<Outcome<R>>)
    where
        R: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        (self.with_listener(sender).build(), receiver)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use assert_matches::assert_matches;

    use super::*;
    use crate::JobError;

    #[test]
    fn build_without_listener() {
        let job = Job::<_, u32>::builder(3).build();

        assert_eq!(*job.input(), 3);
        assert!(job.deliver_result(1));
    }

    #[test]
    fn build_with_listener() {
        let called = Arc::new(AtomicBool::new(false));

        let job = Job::builder("data")
            .with_listener({
                let called = called.clone();
                move |outcome: Outcome<u32>| {
                    assert_matches!(outcome, Err(_));
                    called.store(true, Ordering::SeqCst);
                }
            })
            .build();

        assert!(job.deliver_error(JobError::new("boom")));
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn build_with_receiver_resolves_with_outcome() {
        let (job, receiver) = Job::builder(()).build_with_receiver();

        assert!(job.deliver_result("done"));

        assert_eq!(receiver.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn build_with_receiver_closes_on_cancel() {
        let (job, receiver) = Job::<_, u32>::builder(()).build_with_receiver();

        assert!(job.cancel());

        assert!(receiver.await.is_err());
    }
}
