// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use super::CircuitBreaker;
use super::constants::{DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_TIMEOUT};
use super::engine::{Engine, EngineOptions};
use crate::ResilienceContext;
use crate::config::BreakerConfig;

/// Builder for [`CircuitBreaker`].
///
/// | Parameter | Default Value | Configured By |
/// |-----------|---------------|---------------|
/// | Failure threshold | `5` | [`failure_threshold`][Self::failure_threshold] |
/// | Recovery timeout | `60s` | [`recovery_timeout`][Self::recovery_timeout] |
#[derive(Debug, Clone)]
pub struct CircuitBreakerBuilder {
    name: Cow<'static, str>,
    context: ResilienceContext,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreakerBuilder {
    pub(crate) fn new(name: Cow<'static, str>, context: &ResilienceContext) -> Self {
        Self {
            name,
            context: context.clone(),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: DEFAULT_RECOVERY_TIMEOUT,
        }
    }

    /// Sets the number of consecutive failures that opens the circuit. Values below `1` are
    /// treated as `1`.
    #[must_use]
    pub fn failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold.max(1);
        self
    }

    /// Sets how long the circuit stays open, measured from the most recent failure.
    #[must_use]
    pub fn recovery_timeout(mut self, recovery_timeout: Duration) -> Self {
        self.recovery_timeout = recovery_timeout;
        self
    }

    /// Applies the threshold and timeout from `config`.
    #[must_use]
    pub fn config(self, config: &BreakerConfig) -> Self {
        self.failure_threshold(config.failure_threshold)
            .recovery_timeout(config.recovery_timeout)
    }

    /// Builds a closed circuit breaker.
    #[must_use]
    pub fn build(self) -> CircuitBreaker {
        let engine = Engine::new(
            EngineOptions {
                failure_threshold: self.failure_threshold,
                recovery_timeout: self.recovery_timeout,
            },
            self.context.get_clock().clone(),
        );

        CircuitBreaker::new(engine, self.context.create_telemetry(self.name))
    }
}
