//! Serde friendly configuration for retrying jobs.
//!
//! The defaults retry four times (five attempts in total) with exponential backoff starting
//! at four seconds, capped at seven days, with a 10% jitter.
//!
//! ```
//! # use rejob::config::{BackoffKind, RetryConfig};
//! let config: RetryConfig = serde_json::from_str(
//!     r#"{
//!         "max_retries": 2,
//!         "timeout_ms": 1500,
//!         "backoff": { "strategy": "linear", "delay_ms": 100 }
//!     }"#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.max_retries, 2);
//! assert_eq!(config.timeout(), Some(std::time::Duration::from_millis(1500)));
//! assert_eq!(config.backoff.unwrap().strategy, BackoffKind::Linear);
//! ```
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::{
    backoff::{self, Backoff, Jitter},
    retry::BackoffRetryPolicy,
};

const DEFAULT_MAX_RETRIES: u32 = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// How many times a failed job may be retried.
    pub max_retries: u32,
    /// Bound on a single attempt, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// `None` retries immediately.
    pub backoff: Option<BackoffConfig>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_ms: None,
            backoff: Some(BackoffConfig::default()),
        }
    }
}

impl RetryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// A fresh policy for one job. Every job needs its own.
    pub fn policy(&self) -> BackoffRetryPolicy {
        let backoff = self
            .backoff
            .as_ref()
            .map(BackoffConfig::backoff)
            .unwrap_or_default();
        BackoffRetryPolicy::new(self.max_retries, backoff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Constant,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackoffConfig {
    pub strategy: BackoffKind,
    pub delay_ms: u64,
    #[serde(default)]
    pub max_ms: Option<u64>,
    #[serde(default)]
    pub min_ms: Option<u64>,
    /// Relative jitter, e.g. `0.1` for ±10%.
    #[serde(default)]
    pub jitter: Option<f64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            strategy: BackoffKind::Exponential,
            delay_ms: 4_000,
            max_ms: Some(7 * 24 * 60 * 60 * 1_000),
            min_ms: None,
            jitter: Some(0.1),
        }
    }
}

impl BackoffConfig {
    pub fn backoff(&self) -> Backoff {
        let delay = millis(self.delay_ms);
        let mut backoff = match self.strategy {
            BackoffKind::Constant => Backoff::constant(delay),
            BackoffKind::Linear => Backoff::linear(delay),
            BackoffKind::Exponential => Backoff::exponential(delay),
        };
        if let Some(max) = self.max_ms {
            backoff = backoff.with_max(millis(max));
        }
        if let Some(min) = self.min_ms {
            backoff = backoff.with_min(millis(min));
        }
        if let Some(ratio) = self.jitter {
            backoff = backoff.with_jitter(Jitter::Relative(ratio));
        }
        backoff
    }
}

fn millis(value: u64) -> TimeDelta {
    backoff::clamped(i64::try_from(value).unwrap_or(i64::MAX))
}
