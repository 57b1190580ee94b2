//! The purpose of this module is to alleviate the need to import many of the `rejob` types.
//!
//! ```
//! # #![allow(unused_imports)]
//! use rejob::prelude::*;
//! ```
pub use crate::backoff::{Backoff, Jitter};
pub use crate::config::RetryConfig;
pub use crate::executor::Executor;
pub use crate::job::{builder::JobBuilder, Job, JobId, JobStatus};
pub use crate::listener::Listener;
pub use crate::retry::{BackoffRetryPolicy, DefaultRetryPolicy, RetryPolicy};
pub use crate::runner::JobRunner;
pub use crate::{JobError, Outcome};
