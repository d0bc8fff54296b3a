// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use super::engine::{Engine, EnterCircuitResult, ExitCircuitResult, Permit};
use super::{CircuitBreakerBuilder, CircuitOpenError, CircuitSnapshot, CircuitState};
use crate::ResilienceContext;
use crate::telemetry::TelemetryHelper;

/// Stops calling a downstream after repeated failures and probes it again after a cool-down.
///
/// The breaker starts [closed][CircuitState::Closed]. Every failed call increments a counter
/// of consecutive failures and every successful call resets it. Reaching the failure threshold
/// opens the circuit: calls are rejected with [`CircuitOpenError`] without invoking the
/// operation. Once the recovery timeout has elapsed since the last failure the circuit turns
/// [half-open][CircuitState::HalfOpen] and admits exactly one trial call. The trial's success
/// closes the circuit, its failure opens it again.
///
/// Clones share the same circuit. Check-and-transition decisions happen under a lock that is
/// never held while the operation runs.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use tick::Clock;
/// use airbag::ResilienceContext;
/// use airbag::breaker::{BreakerError, CircuitBreaker};
///
/// # async fn example(clock: Clock) {
/// let context = ResilienceContext::new(&clock);
/// let breaker = CircuitBreaker::builder("ledger", &context)
///     .failure_threshold(3)
///     .recovery_timeout(Duration::from_secs(10))
///     .build();
///
/// match breaker.call(|| async { post_entry().await.map_err(BreakerError::Inner) }).await {
///     Ok(id) => println!("posted {id}"),
///     Err(BreakerError::Open(open)) => println!("ledger down, retry in {:?}", open.retry_after()),
///     Err(BreakerError::Inner(error)) => println!("post failed: {error}"),
/// }
/// # }
/// # async fn post_entry() -> Result<u64, std::io::Error> { Ok(1) }
/// ```
#[derive(Clone)]
pub struct CircuitBreaker {
    shared: Arc<BreakerShared>,
}

struct BreakerShared {
    engine: Engine,
    telemetry: TelemetryHelper,
}

impl Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let options = self.shared.engine.options();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.shared.telemetry.strategy_name)
            .field("failure_threshold", &options.failure_threshold)
            .field("recovery_timeout", &options.recovery_timeout)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Starts configuring a circuit breaker.
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &ResilienceContext) -> CircuitBreakerBuilder {
        CircuitBreakerBuilder::new(name.into(), context)
    }

    pub(super) fn new(engine: Engine, telemetry: TelemetryHelper) -> Self {
        Self {
            shared: Arc::new(BreakerShared { engine, telemetry }),
        }
    }

    /// Returns the breaker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.telemetry.strategy_name
    }

    /// Returns the number of consecutive failures that opens the circuit.
    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.shared.engine.options().failure_threshold
    }

    /// Returns how long the circuit stays open before admitting a trial call.
    #[must_use]
    pub fn recovery_timeout(&self) -> Duration {
        self.shared.engine.options().recovery_timeout
    }

    /// Invokes `operation` if the circuit admits the call and records its outcome.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `operation`, or a [`CircuitOpenError`] converted into `E`
    /// when the circuit is open (or a trial call is already in flight) and `operation` was not
    /// invoked.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        let permit = self.enter()?;
        let result = operation().await;
        self.exit(permit, result.is_ok());
        result
    }

    /// Returns the current state. Reading it never causes a transition.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.shared.engine.snapshot().state
    }

    /// Returns the state, failure count and last failure time as one consistent view.
    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        self.shared.engine.snapshot()
    }

    /// Closes the circuit and clears the failure history.
    ///
    /// Calls still in flight when the breaker is reset do not affect the new state.
    pub fn reset(&self) {
        self.shared.engine.reset();
        self.shared.emit_state_change(CircuitState::Closed, 0);
    }

    fn enter(&self) -> Result<Permit, CircuitOpenError> {
        match self.shared.engine.enter() {
            EnterCircuitResult::Accepted(permit) => Ok(permit),
            EnterCircuitResult::HalfOpened { permit, failure_count } => {
                self.shared.emit_state_change(CircuitState::HalfOpen, failure_count);
                Ok(permit)
            }
            EnterCircuitResult::Rejected { retry_after } => {
                self.shared.emit_rejected(retry_after);
                Err(CircuitOpenError::new(self.shared.telemetry.strategy_name.clone(), retry_after))
            }
        }
    }

    fn exit(&self, permit: Permit, success: bool) {
        match self.shared.engine.exit(permit, success) {
            ExitCircuitResult::Unchanged => {}
            ExitCircuitResult::Opened { failure_count } | ExitCircuitResult::Reopened { failure_count } => {
                self.shared.emit_state_change(CircuitState::Open, failure_count);
            }
            ExitCircuitResult::Closed => self.shared.emit_state_change(CircuitState::Closed, 0),
        }
    }
}

impl BreakerShared {
    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_state_change(&self, state: CircuitState, failure_count: u32) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            match state {
                CircuitState::Open => tracing::event!(
                    name: "airbag.breaker.opened",
                    tracing::Level::WARN,
                    pipeline.name = %self.telemetry.pipeline_name,
                    strategy.name = %self.telemetry.strategy_name,
                    circuit.state = state.as_str(),
                    circuit.failure_count = failure_count,
                    "circuit opened",
                ),
                CircuitState::HalfOpen => tracing::event!(
                    name: "airbag.breaker.half_open",
                    tracing::Level::INFO,
                    pipeline.name = %self.telemetry.pipeline_name,
                    strategy.name = %self.telemetry.strategy_name,
                    circuit.state = state.as_str(),
                    circuit.failure_count = failure_count,
                    "circuit half-open, admitting trial call",
                ),
                CircuitState::Closed => tracing::event!(
                    name: "airbag.breaker.closed",
                    tracing::Level::INFO,
                    pipeline.name = %self.telemetry.pipeline_name,
                    strategy.name = %self.telemetry.strategy_name,
                    circuit.state = state.as_str(),
                    "circuit closed",
                ),
            }
        }
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_rejected(&self, retry_after: Duration) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            tracing::event!(
                name: "airbag.breaker.rejected",
                tracing::Level::DEBUG,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                circuit.retry_after = retry_after.as_secs_f32(),
                "call rejected by open circuit",
            );
        }
    }
}
