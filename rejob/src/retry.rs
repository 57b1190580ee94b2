//! Policies deciding whether a failed job should be attempted again.
//!
//! A policy instance belongs to the retry loop of a single job. It is consulted after every
//! failed attempt, and once it has declined it keeps declining.
//!
//! ```
//! # use rejob::prelude::*;
//! let mut policy = DefaultRetryPolicy::new(2);
//!
//! assert!(policy.retry_or_not());
//! assert!(policy.retry_or_not());
//! assert!(!policy.retry_or_not());
//! assert_eq!(policy.current_retry_count(), 2);
//! ```
use chrono::TimeDelta;

use crate::backoff::Backoff;

/// Decides, after a failed attempt, whether another attempt is authorised.
///
/// Counter mutation goes through `&mut self`, so a policy shared between threads has to be
/// wrapped in a lock by the caller.
#[cfg_attr(test, mockall::automock)]
pub trait RetryPolicy {
    /// Returns `true` if another attempt is authorised, recording the retry.
    ///
    /// Once this returns `false` every later call must also return `false`.
    fn retry_or_not(&mut self) -> bool;

    /// The number of times [`RetryPolicy::retry_or_not`] has returned `true`.
    fn current_retry_count(&self) -> u32;

    /// How long to wait before the retry most recently authorised.
    fn backoff(&self) -> TimeDelta {
        TimeDelta::zero()
    }
}

impl<P> RetryPolicy for Box<P>
where
    P: RetryPolicy + ?Sized,
{
    fn retry_or_not(&mut self) -> bool {
        (**self).retry_or_not()
    }

    fn current_retry_count(&self) -> u32 {
        (**self).current_retry_count()
    }

    fn backoff(&self) -> TimeDelta {
        (**self).backoff()
    }
}

/// Authorises exactly `max_retries` retries, then declines forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRetryPolicy {
    max_retries: u32,
    retries: u32,
}

impl DefaultRetryPolicy {
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retries: 0,
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn retry_or_not(&mut self) -> bool {
        if self.retries < self.max_retries {
            self.retries += 1;
            true
        } else {
            false
        }
    }

    fn current_retry_count(&self) -> u32 {
        self.retries
    }
}

/// Counts retries like [`DefaultRetryPolicy`] and asks the caller to wait according to a
/// [`Backoff`] between attempts.
///
/// ```
/// # use rejob::prelude::*;
/// # use chrono::TimeDelta;
/// let mut policy = BackoffRetryPolicy::new(3, Backoff::linear(TimeDelta::seconds(5)));
///
/// assert!(policy.retry_or_not());
/// assert_eq!(policy.backoff(), TimeDelta::seconds(5));
/// assert!(policy.retry_or_not());
/// assert_eq!(policy.backoff(), TimeDelta::seconds(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffRetryPolicy {
    counter: DefaultRetryPolicy,
    backoff: Backoff,
}

impl BackoffRetryPolicy {
    pub const fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            counter: DefaultRetryPolicy::new(max_retries),
            backoff,
        }
    }
}

impl RetryPolicy for BackoffRetryPolicy {
    fn retry_or_not(&mut self) -> bool {
        self.counter.retry_or_not()
    }

    fn current_retry_count(&self) -> u32 {
        self.counter.current_retry_count()
    }

    fn backoff(&self) -> TimeDelta {
        match self.counter.current_retry_count() {
            0 => TimeDelta::zero(),
            retry => self.backoff.delay(retry),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_retries_never_retries() {
        let mut policy = DefaultRetryPolicy::new(0);

        assert!(!policy.retry_or_not());
        assert_eq!(policy.current_retry_count(), 0);
        assert!(!policy.retry_or_not());
        assert_eq!(policy.current_retry_count(), 0);
    }

    #[test]
    fn retries_exactly_max_times() {
        let mut policy = DefaultRetryPolicy::new(3);

        assert_eq!(policy.current_retry_count(), 0);
        assert!(policy.retry_or_not());
        assert_eq!(policy.current_retry_count(), 1);
        assert!(policy.retry_or_not());
        assert_eq!(policy.current_retry_count(), 2);
        assert!(policy.retry_or_not());
        assert_eq!(policy.current_retry_count(), 3);

        for _ in 0..10 {
            assert!(!policy.retry_or_not());
            assert_eq!(policy.current_retry_count(), 3);
        }
    }

    #[test]
    fn policies_do_not_share_state() {
        let mut first = DefaultRetryPolicy::new(1);
        let mut second = first.clone();

        assert!(first.retry_or_not());
        assert!(!first.retry_or_not());
        assert!(second.retry_or_not());
    }

    #[test]
    fn boxed_policy_delegates() {
        let mut policy: Box<dyn RetryPolicy> = Box::new(DefaultRetryPolicy::new(1));

        assert!(policy.retry_or_not());
        assert!(!policy.retry_or_not());
        assert_eq!(policy.current_retry_count(), 1);
        assert_eq!(policy.backoff(), TimeDelta::zero());
    }

    #[test]
    fn backoff_policy_counts_like_default() {
        let mut policy = BackoffRetryPolicy::new(2, Backoff::constant(TimeDelta::seconds(1)));

        assert_eq!(policy.backoff(), TimeDelta::zero());
        assert!(policy.retry_or_not());
        assert!(policy.retry_or_not());
        assert!(!policy.retry_or_not());
        assert_eq!(policy.current_retry_count(), 2);
    }

    #[test]
    fn backoff_policy_grows_with_retries() {
        let mut policy = BackoffRetryPolicy::new(4, Backoff::exponential(TimeDelta::seconds(1)));

        let mut delays = vec![];
        while policy.retry_or_not() {
            delays.push(policy.backoff());
        }

        assert_eq!(
            delays,
            vec![
                TimeDelta::seconds(1),
                TimeDelta::seconds(2),
                TimeDelta::seconds(4),
                TimeDelta::seconds(8)
            ]
        );
    }
}
