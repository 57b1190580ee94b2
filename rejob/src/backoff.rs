//! Delays to wait between a failed attempt and the next one.
//!
//! A [`Backoff`] grows in one of three shapes (constant, linear, or exponential) and can be
//! clamped and randomised:
//!
//! ```
//! # use rejob::prelude::*;
//! # use chrono::TimeDelta;
//! let backoff = Backoff::exponential(TimeDelta::seconds(2))
//!     .with_max(TimeDelta::seconds(30))
//!     .with_jitter(Jitter::Absolute(TimeDelta::seconds(1)));
//!
//! assert!(backoff.delay(1) >= TimeDelta::seconds(1));
//! assert!(backoff.delay(1) <= TimeDelta::seconds(3));
//! // The max is applied before jitter
//! assert!(backoff.delay(10) <= TimeDelta::seconds(31));
//! ```
//!
//! All of the constructors and configuration functions are `const`.
use chrono::TimeDelta;
use rand::Rng;

/// A random jitter applied to a computed delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    /// Adds a random value in the range `-delta..=delta`.
    Absolute(TimeDelta),
    /// Adds a random value proportional to the delay, e.g. `0.1` for ±10%.
    Relative(f64),
}

impl Jitter {
    fn apply(&self, value: TimeDelta) -> TimeDelta {
        let milliseconds = match self {
            Self::Absolute(delta) => delta.num_milliseconds(),
            Self::Relative(ratio) => (value.num_milliseconds() as f64 * ratio).round() as i64,
        }
        .saturating_abs();
        let jitter = rand::thread_rng().gen_range(-milliseconds..=milliseconds);
        clamped(value.num_milliseconds().saturating_add(jitter))
    }
}

// Far beyond any useful delay while staying inside chrono's representable range.
const MAX_MILLISECONDS: i64 = i64::MAX / 1_000;

pub(crate) fn clamped(milliseconds: i64) -> TimeDelta {
    TimeDelta::milliseconds(milliseconds.clamp(0, MAX_MILLISECONDS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Constant(TimeDelta),
    Linear(TimeDelta),
    Exponential(TimeDelta),
}

/// How long to wait before the `n`th retry.
///
/// # Example
///
/// ```
/// # use rejob::prelude::*;
/// # use chrono::TimeDelta;
/// let backoff = Backoff::linear(TimeDelta::seconds(10)).with_max(TimeDelta::seconds(25));
///
/// assert_eq!(backoff.delay(1), TimeDelta::seconds(10));
/// assert_eq!(backoff.delay(2), TimeDelta::seconds(20));
/// assert_eq!(backoff.delay(3), TimeDelta::seconds(25));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    shape: Shape,
    max: Option<TimeDelta>,
    min: TimeDelta,
    jitter: Option<Jitter>,
}

impl Backoff {
    /// No delay at all.
    pub const NONE: Self = Self::constant(TimeDelta::zero());

    const fn new(shape: Shape) -> Self {
        Self {
            shape,
            max: None,
            min: TimeDelta::zero(),
            jitter: None,
        }
    }

    /// The same delay before every retry.
    pub const fn constant(delay: TimeDelta) -> Self {
        Self::new(Shape::Constant(delay))
    }

    /// `step * n` before the `n`th retry.
    pub const fn linear(step: TimeDelta) -> Self {
        Self::new(Shape::Linear(step))
    }

    /// `base * 2^(n - 1)` before the `n`th retry.
    ///
    /// Setting a maximum with [`Backoff::with_max`] is advisable.
    pub const fn exponential(base: TimeDelta) -> Self {
        Self::new(Shape::Exponential(base))
    }

    /// Clamps the computed delay to `max` before jitter is applied.
    pub const fn with_max(mut self, max: TimeDelta) -> Self {
        self.max = Some(max);
        self
    }

    /// Never returns less than `min`, even after jitter.
    pub const fn with_min(mut self, min: TimeDelta) -> Self {
        self.min = min;
        self
    }

    pub const fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// The delay before retry number `retry`, counting from one.
    ///
    /// A `retry` of zero is treated as the first retry. The result is never negative.
    pub fn delay(&self, retry: u32) -> TimeDelta {
        let retry = i64::from(retry.max(1));
        let milliseconds = match self.shape {
            Shape::Constant(delay) => delay.num_milliseconds(),
            Shape::Linear(step) => step.num_milliseconds().saturating_mul(retry),
            Shape::Exponential(base) => {
                let factor = u32::try_from(retry - 1)
                    .ok()
                    .and_then(|exp| 2_i64.checked_pow(exp))
                    .unwrap_or(i64::MAX);
                base.num_milliseconds().saturating_mul(factor)
            }
        };
        let mut delay = clamped(milliseconds);

        if let Some(max) = self.max {
            delay = delay.min(max);
        }

        if let Some(jitter) = self.jitter {
            delay = jitter.apply(delay);
        }

        delay.max(self.min)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_backoff() {
        for i in 0..10 {
            assert_eq!(Backoff::NONE.delay(i), TimeDelta::zero());
        }
    }

    #[test]
    fn constant_backoff() {
        let delay = TimeDelta::minutes(1);
        let backoff = Backoff::constant(delay);

        for i in 1..100 {
            assert_eq!(backoff.delay(i), delay);
        }
    }

    #[test]
    fn constant_backoff_with_absolute_jitter() {
        let delay = TimeDelta::minutes(1);
        let jitter = TimeDelta::seconds(10);
        let backoff = Backoff::constant(delay).with_jitter(Jitter::Absolute(jitter));

        for i in 1..100 {
            let value = backoff.delay(i);
            assert!(value >= delay - jitter);
            assert!(value <= delay + jitter);
        }
    }

    #[test]
    fn constant_backoff_with_jitter_min() {
        let delay = TimeDelta::seconds(20);
        let min = TimeDelta::seconds(5);
        let backoff = Backoff::constant(delay)
            .with_jitter(Jitter::Absolute(TimeDelta::seconds(20)))
            .with_min(min);

        for i in 1..100 {
            assert!(backoff.delay(i) >= min);
        }
    }

    #[test]
    fn linear_backoff() {
        let step = TimeDelta::minutes(1);
        let backoff = Backoff::linear(step);

        for i in 1..100 {
            assert_eq!(backoff.delay(i), step * i as i32);
        }
    }

    #[test]
    fn linear_backoff_with_relative_jitter() {
        let step = TimeDelta::minutes(1);
        let backoff = Backoff::linear(step).with_jitter(Jitter::Relative(0.1));

        for i in 1..100 {
            let value = backoff.delay(i);
            let jitter = TimeDelta::seconds(6) * i as i32;
            assert!(value >= step * i as i32 - jitter);
            assert!(value <= step * i as i32 + jitter);
        }
    }

    #[test]
    fn exponential_backoff() {
        let backoff = Backoff::exponential(TimeDelta::seconds(2));

        assert_eq!(backoff.delay(1), TimeDelta::seconds(2));
        assert_eq!(backoff.delay(2), TimeDelta::seconds(4));
        assert_eq!(backoff.delay(3), TimeDelta::seconds(8));
        assert_eq!(backoff.delay(4), TimeDelta::seconds(16));
    }

    #[test]
    fn exponential_backoff_with_max() {
        let max = TimeDelta::minutes(10);
        let backoff = Backoff::exponential(TimeDelta::minutes(1)).with_max(max);

        for i in 1..200 {
            assert!(backoff.delay(i) <= max);
        }
        assert_eq!(backoff.delay(u32::MAX), max);
    }

    #[test]
    fn zero_is_treated_as_first_retry() {
        let backoff = Backoff::linear(TimeDelta::seconds(3));

        assert_eq!(backoff.delay(0), backoff.delay(1));
    }

    #[test]
    fn never_negative() {
        let backoff = Backoff::constant(TimeDelta::milliseconds(5))
            .with_jitter(Jitter::Absolute(TimeDelta::seconds(10)));

        for i in 1..100 {
            assert!(backoff.delay(i) >= TimeDelta::zero());
        }
    }
}
