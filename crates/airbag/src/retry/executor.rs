// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Debug;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tick::Clock;

use super::{OnRetry, OnRetryArgs, RecoveryArgs, RetryBuilder, ShouldRetry};
use crate::telemetry::TelemetryHelper;
use crate::{Attempt, NotSet, RecoveryInfo, RecoveryKind, ResilienceContext, RetryStrategy};

/// Re-invokes a fallible operation while its errors are classified as transient.
///
/// The executor holds no per-call state: one instance can be shared between tasks and reused
/// for any number of calls. Cloning is cheap.
///
/// Configure it with [`RetryExecutor::builder`]. See the [retry module][crate::retry] for
/// examples.
pub struct RetryExecutor<E> {
    pub(super) shared: Arc<RetryShared<E>>,
}

pub(crate) struct RetryShared<E> {
    pub(crate) clock: Clock,
    pub(crate) max_attempts: u32,
    pub(crate) strategy: Arc<dyn RetryStrategy>,
    pub(crate) should_retry: ShouldRetry<E>,
    pub(crate) on_retry: Option<OnRetry<E>>,
    pub(crate) handle_unavailable: bool,
    pub(crate) telemetry: TelemetryHelper,
}

impl<E> Clone for RetryExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> Debug for RetryExecutor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("name", &self.shared.telemetry.strategy_name)
            .field("max_attempts", &self.shared.max_attempts)
            .field("strategy", &self.shared.strategy)
            .finish_non_exhaustive()
    }
}

impl<E> RetryExecutor<E> {
    /// Starts configuring a retry executor.
    ///
    /// The `name` identifies the executor in log events; `context` provides the clock and the
    /// settings shared with other components.
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &ResilienceContext) -> RetryBuilder<E, NotSet> {
        RetryBuilder::new(name.into(), context)
    }

    /// Returns the total number of invocations the executor allows.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.shared.max_attempts
    }

    /// Runs `operation` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// The operation receives the current [`Attempt`]. Arguments reach it by capture, so every
    /// attempt sees the same inputs. Between attempts the calling task is suspended on the
    /// context clock; no thread is blocked.
    ///
    /// # Errors
    ///
    /// Returns the operation's error unchanged when it is not retryable, or the error of the
    /// last attempt once `max_attempts` invocations have failed.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let shared = &*self.shared;
        let mut attempt = Attempt::first(shared.max_attempts);

        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match shared.evaluate_attempt(&error, attempt) {
                ControlFlow::Continue(next) => {
                    shared.clock.delay(next.delay).await;
                    attempt = next.attempt;
                }
                ControlFlow::Break(()) => return Err(error),
            }
        }
    }
}

impl<E> RetryShared<E> {
    fn evaluate_attempt(&self, error: &E, attempt: Attempt) -> ControlFlow<(), NextAttempt> {
        let recovery = self.should_retry.call(error, RecoveryArgs { attempt });

        if !self.is_recoverable(&recovery) {
            return ControlFlow::Break(());
        }

        let Some(next_attempt) = attempt.increment(self.max_attempts) else {
            self.emit_exhausted(attempt);
            return ControlFlow::Break(());
        };

        let retry_delay = recovery
            .get_delay()
            .unwrap_or_else(|| self.strategy.get_delay(attempt.index()));

        self.emit_retry(attempt, retry_delay);

        if let Some(on_retry) = &self.on_retry {
            on_retry.call(
                error,
                OnRetryArgs {
                    attempt,
                    retry_delay,
                    recovery,
                },
            );
        }

        ControlFlow::Continue(NextAttempt {
            attempt: next_attempt,
            delay: retry_delay,
        })
    }

    fn is_recoverable(&self, recovery: &RecoveryInfo) -> bool {
        match recovery.kind() {
            RecoveryKind::Retry => true,
            RecoveryKind::Unavailable => self.handle_unavailable,
            RecoveryKind::Never | RecoveryKind::Unknown | _ => false,
        }
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_retry(&self, attempt: Attempt, retry_delay: Duration) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            tracing::event!(
                name: "airbag.retry",
                tracing::Level::WARN,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                attempt.index = attempt.index(),
                attempt.is_last = attempt.is_last(),
                retry.delay = retry_delay.as_secs_f32(),
            );
        }
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_exhausted(&self, attempt: Attempt) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            tracing::event!(
                name: "airbag.retry.exhausted",
                tracing::Level::WARN,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                attempt.index = attempt.index(),
            );
        }
    }
}

struct NextAttempt {
    attempt: Attempt,
    delay: Duration,
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tick::ClockControl;

    use super::*;
    use crate::LinearBackoff;
    use crate::testing::{LogCapture, TestError};

    fn context() -> ResilienceContext {
        ResilienceContext::new(&ClockControl::default().auto_advance_timers(true).to_clock()).name("test_pipeline")
    }

    fn fixed_delay() -> LinearBackoff {
        LinearBackoff::new(Duration::from_millis(10), Duration::ZERO)
    }

    #[tokio::test]
    async fn success_on_first_attempt_skips_callback() {
        let retried = Arc::new(AtomicU32::new(0));
        let retried_clone = Arc::clone(&retried);

        let executor = RetryExecutor::<TestError>::builder("test_retry", &context())
            .on_retry(move |_, _| {
                retried_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let result = executor.execute(|_| async { Ok::<_, TestError>("done") }).await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(retried.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_failures_then_success() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::builder("test_retry", &context())
            .max_attempts(3)
            .strategy(fixed_delay())
            .build();

        let result = executor
            .execute(|_| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(TestError::transient("connection reset"))
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_returns_last_error() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::builder("test_retry", &context())
            .max_attempts(4)
            .strategy(fixed_delay())
            .build();

        let error = executor
            .execute(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(TestError::transient(format!("failure {attempt}"))) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(error, TestError::transient("failure 3"));
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::builder("test_retry", &context()).max_attempts(10).build();

        let error = executor
            .execute(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(TestError::permanent("card declined")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(error, TestError::permanent("card declined"));
    }

    #[tokio::test]
    async fn single_attempt_never_retries() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::builder("test_retry", &context()).max_attempts(1).build();

        let _ = executor
            .execute(|attempt| {
                assert!(attempt.is_last());
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(TestError::transient("timeout")) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn on_retry_receives_previous_attempt_and_delay() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let executor = RetryExecutor::builder("test_retry", &context())
            .max_attempts(3)
            .strategy(LinearBackoff::new(Duration::from_millis(10), Duration::from_millis(10)))
            .on_retry(move |error: &TestError, args| {
                seen_clone
                    .lock()
                    .unwrap()
                    .push((args.attempt().index(), args.retry_delay(), error.message().to_string()));
            })
            .build();

        let _ = executor
            .execute(|attempt| async move { Err::<(), _>(TestError::transient(format!("e{attempt}"))) })
            .await;

        assert_eq!(
            seen.lock().unwrap().clone(),
            vec![
                (0, Duration::from_millis(10), "e0".to_string()),
                (1, Duration::from_millis(20), "e1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn recovery_delay_hint_overrides_strategy() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let delays_clone = Arc::clone(&delays);

        let executor = RetryExecutor::builder("test_retry", &context())
            .max_attempts(2)
            .strategy(fixed_delay())
            .recovery_with(|_: &TestError, _| RecoveryInfo::retry().delay(Duration::from_secs(7)))
            .on_retry(move |_, args| delays_clone.lock().unwrap().push(args.retry_delay()))
            .build();

        let _ = executor
            .execute(|_| async { Err::<(), _>(TestError::transient("rate limited")) })
            .await;

        assert_eq!(delays.lock().unwrap().clone(), vec![Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn unavailable_is_retried_only_when_enabled() {
        for (handle, expected_calls) in [(false, 1), (true, 3)] {
            let calls = AtomicU32::new(0);
            let executor = RetryExecutor::builder("test_retry", &context())
                .max_attempts(3)
                .strategy(fixed_delay())
                .handle_unavailable(handle)
                .build();

            let _ = executor
                .execute(|_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(TestError::unavailable("maintenance")) }
                })
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), expected_calls, "handle_unavailable = {handle}");
        }
    }

    #[tokio::test]
    async fn retry_if_predicate() {
        let calls = AtomicU32::new(0);
        let executor = RetryExecutor::builder("test_retry", &context())
            .max_attempts(5)
            .strategy(fixed_delay())
            .retry_if(|error: &String| error.starts_with("503"))
            .build();

        let error = executor
            .execute(|_| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err::<(), _>(if call < 2 { "503 busy".to_string() } else { "400 bad".to_string() }) }
            })
            .await
            .unwrap_err();

        assert_eq!(error, "400 bad");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn delays_advance_the_clock() {
        let control = ClockControl::default().auto_advance_timers(true);
        let clock = control.to_clock();
        let context = ResilienceContext::new(&clock);
        let executor = RetryExecutor::builder("test_retry", &context)
            .max_attempts(3)
            .strategy(LinearBackoff::new(Duration::from_secs(1), Duration::from_secs(1)))
            .build();

        let start = clock.instant();
        let _ = executor
            .execute(|_| async { Err::<(), _>(TestError::transient("timeout")) })
            .await;

        assert_eq!(clock.instant().duration_since(start), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn retry_emits_log() {
        use tracing_subscriber::util::SubscriberInitExt;

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let clock = ClockControl::default().auto_advance_timers(true).to_clock();
        let context = ResilienceContext::new(&clock).name("log_test_pipeline").enable_logs();
        let executor = RetryExecutor::builder("log_test_retry", &context)
            .max_attempts(2)
            .strategy(fixed_delay())
            .build();

        let _ = executor
            .execute(|_| async { Err::<(), _>(TestError::transient("timeout")) })
            .await;

        log_capture.assert_contains("airbag::retry");
        log_capture.assert_contains("log_test_pipeline");
        log_capture.assert_contains("log_test_retry");
        log_capture.assert_contains("attempt.index");
        log_capture.assert_contains("retry.delay");
    }

    #[test]
    fn debug_contains_name() {
        let executor = RetryExecutor::<TestError>::builder("debug_retry", &context()).build();
        let debug = format!("{executor:?}");

        assert!(debug.contains("RetryExecutor"));
        assert!(debug.contains("debug_retry"));
    }
}
