// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::time::Duration;

use crate::rnd::Rnd;

/// Lower bound of the jitter multiplier applied by [`ExponentialBackoff`].
const JITTER_MIN: f64 = 0.5;

/// Upper bound of the jitter multiplier applied by [`ExponentialBackoff`].
const JITTER_MAX: f64 = 2.0;

const EXPONENTIAL_FACTOR: f64 = 2.0;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Computes how long to wait before the next retry attempt.
///
/// Implementations must be cheap and side-effect free: the executor calls
/// [`get_delay`][RetryStrategy::get_delay] once per retry with the zero-based index of the
/// attempt that just failed.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use airbag::{ExponentialBackoff, LinearBackoff, RetryStrategy};
///
/// let exponential = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60)).jitter(false);
/// assert_eq!(exponential.get_delay(0), Duration::from_secs(1));
/// assert_eq!(exponential.get_delay(3), Duration::from_secs(8));
/// assert_eq!(exponential.get_delay(10), Duration::from_secs(60));
///
/// let linear = LinearBackoff::new(Duration::from_secs(1), Duration::from_millis(500));
/// assert_eq!(linear.get_delay(5), Duration::from_millis(3500));
/// ```
pub trait RetryStrategy: Debug + Send + Sync {
    /// Returns the delay to apply after the attempt with the given zero-based index failed.
    fn get_delay(&self, attempt: u32) -> Duration;
}

/// Exponential backoff: `base_delay * 2^attempt`, capped at `max_delay`.
///
/// With jitter enabled (the default) the uncapped delay is multiplied by a factor drawn
/// uniformly from `[0.5, 2.0]` before the cap is applied, which spreads out callers that
/// failed at the same moment.
///
/// **Example with `1s` base delay and no jitter:** `1s, 2s, 4s, 8s, ...` up to `max_delay`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
    rnd: Rnd,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl ExponentialBackoff {
    /// Creates an exponential backoff with jitter enabled.
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            jitter: true,
            rnd: Rnd::default(),
        }
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Returns the delay used for attempt `0` before jitter.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the upper bound of every computed delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns `true` if jitter is applied.
    #[must_use]
    pub fn has_jitter(&self) -> bool {
        self.jitter
    }

    #[cfg(test)]
    pub(crate) fn with_rnd(mut self, rnd: Rnd) -> Self {
        self.rnd = rnd;
        self
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn get_delay(&self, attempt: u32) -> Duration {
        let factor = EXPONENTIAL_FACTOR.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let mut secs = self.base_delay.as_secs_f64() * factor;

        if self.jitter {
            secs *= (JITTER_MAX - JITTER_MIN).mul_add(self.rnd.next_f64(), JITTER_MIN);
        }

        secs_to_duration_saturating(secs).min(self.max_delay)
    }
}

/// Linear backoff: `delay + attempt * increment`, without an upper bound.
///
/// **Example with `1s` delay and `500ms` increment:** `1s, 1.5s, 2s, 2.5s, ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    delay: Duration,
    increment: Duration,
}

impl LinearBackoff {
    /// Creates a linear backoff starting at `delay` and growing by `increment` per attempt.
    #[must_use]
    pub fn new(delay: Duration, increment: Duration) -> Self {
        Self { delay, increment }
    }

    /// Returns the delay used for attempt `0`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the amount added per attempt.
    #[must_use]
    pub fn increment(&self) -> Duration {
        self.increment
    }
}

impl RetryStrategy for LinearBackoff {
    fn get_delay(&self, attempt: u32) -> Duration {
        self.delay.saturating_add(self.increment.saturating_mul(attempt))
    }
}

fn secs_to_duration_saturating(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }

    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
