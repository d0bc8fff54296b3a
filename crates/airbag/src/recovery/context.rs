// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use parking_lot::Mutex;
use tick::Clock;

use super::{AttemptKind, AttemptRecord, RecoveryState};
use crate::ResilienceContext;
use crate::telemetry::TelemetryHelper;

/// Runs a primary operation, falls back to an alternate one on failure and records both.
///
/// A recovery context is a scope: it is created when a unit of work starts, collects an
/// [`AttemptRecord`] for every operation it runs plus any entries the caller attaches, and is
/// completed exactly once when the work ends. [`RecoveryContext::scope`] guarantees the
/// completion on every exit path, including cancellation and panics.
///
/// Clones refer to the same scope.
///
/// # Examples
///
/// ```
/// # use tick::Clock;
/// use airbag::ResilienceContext;
/// use airbag::recovery::RecoveryContext;
///
/// # async fn example(clock: Clock) {
/// let context = ResilienceContext::new(&clock);
///
/// let outcome = RecoveryContext::scope("render_invoice", &context, |recovery| async move {
///     recovery.insert("invoice_id", 42);
///     recovery
///         .execute_with_fallback(42, render_pdf, render_html)
///         .await
/// })
/// .await;
///
/// assert_eq!(outcome.state.success(), Some(outcome.result.is_ok()));
/// # }
/// # async fn render_pdf(_id: u32) -> Result<Vec<u8>, String> { Err("renderer offline".to_string()) }
/// # async fn render_html(_id: u32) -> Result<Vec<u8>, String> { Ok(b"<html/>".to_vec()) }
/// ```
#[derive(Clone)]
pub struct RecoveryContext {
    shared: Arc<RecoveryShared>,
}

struct RecoveryShared {
    clock: Clock,
    telemetry: TelemetryHelper,
    state: Mutex<RecoveryState>,
}

/// Result of a [`RecoveryContext::scope`] together with its completed state.
#[derive(Debug)]
pub struct ScopeOutcome<T, E> {
    /// What the scope body returned.
    pub result: Result<T, E>,

    /// The completed audit trail; `success` mirrors `result.is_ok()`.
    pub state: RecoveryState,
}

impl<T, E> ScopeOutcome<T, E> {
    /// Discards the state and returns the body's result.
    ///
    /// # Errors
    ///
    /// Returns the error the scope body returned.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

impl Debug for RecoveryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryContext")
            .field("name", &self.shared.telemetry.strategy_name)
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}

impl RecoveryContext {
    /// Starts a new recovery scope. The start time is taken from the context clock.
    ///
    /// A context created this way is completed by [`complete`][Self::complete]; prefer
    /// [`scope`][Self::scope], which also completes it when the work is cancelled.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, context: &ResilienceContext) -> Self {
        let clock = context.get_clock().clone();
        let state = RecoveryState::new(clock.system_time());

        Self {
            shared: Arc::new(RecoveryShared {
                clock,
                telemetry: context.create_telemetry(name.into()),
                state: Mutex::new(state),
            }),
        }
    }

    /// Runs `body` inside a new recovery scope and completes the scope when it finishes.
    ///
    /// The scope succeeds when `body` returns `Ok`. If the returned future is dropped before
    /// `body` finishes, or `body` panics, the scope is completed as failed; clones of the
    /// context kept by `body` observe the completed state.
    ///
    /// The returned future borrows `context` until it completes.
    pub async fn scope<T, E, F, Fut>(
        name: impl Into<Cow<'static, str>>,
        context: &ResilienceContext,
        body: F,
    ) -> ScopeOutcome<T, E>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let recovery = Self::new(name, context);
        let _guard = CompleteOnDrop(recovery.clone());

        let result = body(recovery.clone()).await;
        let state = recovery.complete(result.is_ok());

        ScopeOutcome { result, state }
    }

    /// Runs `primary` with a clone of `input`; if it fails, runs `fallback` with `input`.
    ///
    /// Every run is recorded as an [`AttemptRecord`]. The fallback runs after any primary
    /// error and is never run when the primary succeeds.
    ///
    /// # Errors
    ///
    /// Returns the fallback's error when both operations fail. The primary's error is only
    /// kept, rendered, in the attempt log.
    pub async fn execute_with_fallback<I, T, E, P, PFut, FB, FFut>(&self, input: I, primary: P, fallback: FB) -> Result<T, E>
    where
        I: Clone,
        E: Display,
        P: FnOnce(I) -> PFut,
        PFut: Future<Output = Result<T, E>>,
        FB: FnOnce(I) -> FFut,
        FFut: Future<Output = Result<T, E>>,
    {
        let primary_error = match primary(input.clone()).await {
            Ok(value) => {
                self.record(AttemptKind::Primary, None);
                return Ok(value);
            }
            Err(error) => error,
        };

        let primary_error = primary_error.to_string();
        self.shared.emit_fallback(&primary_error);
        self.record(AttemptKind::Primary, Some(primary_error));

        match fallback(input).await {
            Ok(value) => {
                self.record(AttemptKind::Fallback, None);
                Ok(value)
            }
            Err(error) => {
                self.record(AttemptKind::Fallback, Some(error.to_string()));
                Err(error)
            }
        }
    }

    /// Attaches a key/value pair to the scope's state, replacing an earlier value for `key`.
    pub fn insert(&self, key: impl Into<String>, value: impl ToString) {
        self.shared.state.lock().insert(key.into(), value.to_string());
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> RecoveryState {
        self.shared.state.lock().clone()
    }

    /// Returns a copy of the attempts recorded so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.shared.state.lock().attempts().to_vec()
    }

    /// Completes the scope and returns its final state.
    ///
    /// Only the first completion takes effect; later calls return the state as completed the
    /// first time.
    pub fn complete(&self, success: bool) -> RecoveryState {
        let now = self.shared.clock.system_time();

        let (completed, state) = {
            let mut state = self.shared.state.lock();
            (state.complete(success, now), state.clone())
        };

        if completed {
            self.shared.emit_completed(&state);
        }

        state
    }

    fn record(&self, kind: AttemptKind, error: Option<String>) {
        let attempt = AttemptRecord::new(kind, error, self.shared.clock.system_time());
        self.shared.state.lock().push_attempt(attempt);
    }
}

/// Completes the scope as failed unless it was completed already.
struct CompleteOnDrop(RecoveryContext);

impl Drop for CompleteOnDrop {
    fn drop(&mut self) {
        self.0.complete(false);
    }
}

impl RecoveryShared {
    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_fallback(&self, primary_error: &str) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            tracing::event!(
                name: "airbag.recovery.fallback",
                tracing::Level::WARN,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                recovery.primary_error = primary_error,
                "primary failed, running fallback",
            );
        }
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_completed(&self, state: &RecoveryState) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            let success = state.success().unwrap_or_default();
            let attempts = state.attempts().len();

            if success {
                tracing::event!(
                    name: "airbag.recovery.completed",
                    tracing::Level::INFO,
                    pipeline.name = %self.telemetry.pipeline_name,
                    strategy.name = %self.telemetry.strategy_name,
                    recovery.success = success,
                    recovery.attempts = attempts,
                    "recovery scope completed",
                );
            } else {
                tracing::event!(
                    name: "airbag.recovery.completed",
                    tracing::Level::WARN,
                    pipeline.name = %self.telemetry.pipeline_name,
                    strategy.name = %self.telemetry.strategy_name,
                    recovery.success = success,
                    recovery.attempts = attempts,
                    "recovery scope completed",
                );
            }
        }
    }
}
