// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Plain configuration values for the recovery components.
//!
//! Each struct mirrors the settings of one builder and can be applied to it with the builder's
//! `config` method. With the `serde` feature enabled, the structs can be loaded from any serde
//! format; durations are written as fractional seconds and missing fields take their defaults.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use airbag::RetryStrategy;
//! use airbag::config::{RetryConfig, StrategyConfig};
//!
//! let config = RetryConfig {
//!     max_attempts: 5,
//!     strategy: StrategyConfig::Linear {
//!         delay: Duration::from_millis(100),
//!         increment: Duration::from_millis(100),
//!     },
//!     ..RetryConfig::default()
//! };
//!
//! assert_eq!(config.strategy.to_strategy().get_delay(2), Duration::from_millis(300));
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::{ExponentialBackoff, LinearBackoff, RetryStrategy};

/// Settings of a [`RetryExecutor`][crate::retry::RetryExecutor].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryConfig {
    /// Total number of invocations, including the first one.
    pub max_attempts: u32,

    /// Delay strategy between attempts.
    pub strategy: StrategyConfig,

    /// Whether errors classified as unavailable are retried.
    pub handle_unavailable: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: StrategyConfig::default(),
            handle_unavailable: false,
        }
    }
}

/// Serializable description of a [`RetryStrategy`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[non_exhaustive]
pub enum StrategyConfig {
    /// See [`ExponentialBackoff`].
    Exponential {
        /// Delay after the first failed attempt, before jitter.
        #[cfg_attr(feature = "serde", serde(with = "duration_secs"))]
        base_delay: Duration,

        /// Upper bound of every delay.
        #[cfg_attr(feature = "serde", serde(with = "duration_secs"))]
        max_delay: Duration,

        /// Whether a random multiplier in `[0.5, 2.0]` is applied.
        #[cfg_attr(feature = "serde", serde(default = "default_jitter"))]
        jitter: bool,
    },

    /// See [`LinearBackoff`].
    Linear {
        /// Delay after the first failed attempt.
        #[cfg_attr(feature = "serde", serde(with = "duration_secs"))]
        delay: Duration,

        /// Amount added for every further attempt.
        #[cfg_attr(feature = "serde", serde(with = "duration_secs"))]
        increment: Duration,
    },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let backoff = ExponentialBackoff::default();
        Self::Exponential {
            base_delay: backoff.base_delay(),
            max_delay: backoff.max_delay(),
            jitter: backoff.has_jitter(),
        }
    }
}

impl StrategyConfig {
    /// Creates the strategy described by this configuration.
    #[must_use]
    pub fn to_strategy(&self) -> Arc<dyn RetryStrategy> {
        match *self {
            Self::Exponential {
                base_delay,
                max_delay,
                jitter,
            } => Arc::new(ExponentialBackoff::new(base_delay, max_delay).jitter(jitter)),
            Self::Linear { delay, increment } => Arc::new(LinearBackoff::new(delay, increment)),
        }
    }
}

/// Settings of a [`CircuitBreaker`][crate::breaker::CircuitBreaker].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Time the circuit stays open before a trial call is admitted.
    #[cfg_attr(feature = "serde", serde(with = "duration_secs"))]
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Settings of an [`IdempotencyManager`][crate::idempotency::IdempotencyManager].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IdempotencyConfig {
    /// How long a successful result is replayed.
    #[cfg_attr(feature = "serde", serde(with = "duration_secs"))]
    pub cache_ttl: Duration,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

#[cfg(feature = "serde")]
fn default_jitter() -> bool {
    true
}

#[cfg(feature = "serde")]
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert!(!retry.handle_unavailable);
        assert_eq!(
            retry.strategy,
            StrategyConfig::Exponential {
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
                jitter: true,
            }
        );

        let breaker = BreakerConfig::default();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.recovery_timeout, Duration::from_secs(60));

        assert_eq!(IdempotencyConfig::default().cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn exponential_strategy_from_config() {
        let config = StrategyConfig::Exponential {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            jitter: false,
        };
        let strategy = config.to_strategy();

        assert_eq!(strategy.get_delay(0), Duration::from_millis(100));
        assert_eq!(strategy.get_delay(2), Duration::from_millis(400));
        assert_eq!(strategy.get_delay(3), Duration::from_millis(500));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_with_fractional_seconds() {
        let config: RetryConfig = serde_json::from_str(
            r#"{ "max_attempts": 4, "strategy": { "kind": "linear", "delay": 0.5, "increment": 0.25 } }"#,
        )
        .unwrap();

        assert_eq!(config.max_attempts, 4);
        assert!(!config.handle_unavailable);
        assert_eq!(
            config.strategy,
            StrategyConfig::Linear {
                delay: Duration::from_millis(500),
                increment: Duration::from_millis(250),
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_missing_fields_use_defaults() {
        let breaker: BreakerConfig = serde_json::from_str(r#"{ "recovery_timeout": 30 }"#).unwrap();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.recovery_timeout, Duration::from_secs(30));

        let strategy: StrategyConfig =
            serde_json::from_str(r#"{ "kind": "exponential", "base_delay": 2, "max_delay": 10 }"#).unwrap();
        assert_eq!(
            strategy,
            StrategyConfig::Exponential {
                base_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(10),
                jitter: true,
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn negative_duration_is_rejected() {
        let result = serde_json::from_str::<IdempotencyConfig>(r#"{ "cache_ttl": -1.0 }"#);
        assert!(result.is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialize_writes_seconds() {
        let json = serde_json::to_value(IdempotencyConfig {
            cache_ttl: Duration::from_millis(1500),
        })
        .unwrap();

        assert_eq!(json, serde_json::json!({ "cache_ttl": 1.5 }));
    }
}
