// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use tick::Clock;

use crate::telemetry::TelemetryHelper;

pub(crate) const DEFAULT_PIPELINE_NAME: &str = "default";

/// Shared configuration and dependencies for a set of recovery components.
///
/// Pass a single `ResilienceContext` to every component guarding the same downstream (retry,
/// circuit breaker, idempotency, fallback) so that they share a clock and telemetry settings.
///
/// # Examples
///
/// ```
/// use airbag::ResilienceContext;
/// use tick::Clock;
///
/// let clock = Clock::new_frozen();
/// let context = ResilienceContext::new(&clock).name("payment_provider");
/// assert_eq!(context.get_name(), "payment_provider");
/// ```
#[derive(Debug, Clone)]
pub struct ResilienceContext {
    clock: Clock,
    name: Cow<'static, str>,
    logs_enabled: bool,
}

impl ResilienceContext {
    /// Creates a context with the given clock. The pipeline name defaults to `"default"`.
    #[must_use]
    pub fn new(clock: &Clock) -> Self {
        Self {
            clock: clock.clone(),
            name: Cow::Borrowed(DEFAULT_PIPELINE_NAME),
            logs_enabled: false,
        }
    }

    /// Sets the pipeline name used to correlate telemetry. Prefer `snake_case`.
    #[must_use]
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables structured log events for every component built from this context.
    ///
    /// Has no effect unless the `logs` feature is enabled.
    #[must_use]
    pub fn enable_logs(mut self) -> Self {
        self.logs_enabled = true;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Returns the clock that drives delays, timeouts and timestamps.
    #[must_use]
    pub fn get_clock(&self) -> &Clock {
        &self.clock
    }

    pub(crate) fn create_telemetry(&self, strategy_name: Cow<'static, str>) -> TelemetryHelper {
        TelemetryHelper {
            pipeline_name: self.name.clone(),
            strategy_name,
            logs_enabled: self.logs_enabled,
        }
    }
}
