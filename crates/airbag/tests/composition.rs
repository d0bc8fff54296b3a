// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests nesting the recovery components inside each other.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use airbag::breaker::{BreakerError, CircuitBreaker, CircuitBreakerRegistry, CircuitOpenError};
use airbag::idempotency::IdempotencyManager;
use airbag::recovery::{RecoveryContext, RecoveryState};
use airbag::retry::RetryExecutor;
use airbag::{ExponentialBackoff, LinearBackoff, Recovery, RecoveryInfo, ResilienceContext};
use static_assertions::assert_impl_all;
use tick::ClockControl;

assert_impl_all!(RetryExecutor<std::io::Error>: Send, Sync, Clone);
assert_impl_all!(CircuitBreaker: Send, Sync, Clone);
assert_impl_all!(CircuitBreakerRegistry: Send, Sync, Clone);
assert_impl_all!(IdempotencyManager<String>: Send, Sync, Clone);
assert_impl_all!(RecoveryContext: Send, Sync, Clone);
assert_impl_all!(RecoveryState: Send, Sync, Clone);
assert_impl_all!(CircuitOpenError: Send, Sync, std::error::Error);
assert_impl_all!(ExponentialBackoff: Send, Sync);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum ChargeError {
    #[error("gateway timeout")]
    Timeout,
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),
}

impl Recovery for ChargeError {
    fn recovery(&self) -> RecoveryInfo {
        match self {
            Self::Timeout => RecoveryInfo::retry(),
            Self::CircuitOpen(open) => open.recovery(),
        }
    }
}

fn context(control: &ClockControl) -> ResilienceContext {
    ResilienceContext::new(&control.to_clock()).name("checkout")
}

#[tokio::test]
async fn idempotency_around_retry_around_breaker() {
    let control = ClockControl::default().auto_advance_timers(true);
    let context = context(&control);

    let breaker = CircuitBreaker::builder("gateway", &context).failure_threshold(5).build();
    let retry = RetryExecutor::builder("gateway_retry", &context)
        .max_attempts(3)
        .strategy(LinearBackoff::new(Duration::from_millis(100), Duration::ZERO))
        .build();
    let payments = IdempotencyManager::builder("payments", &context).build();

    let calls = AtomicU32::new(0);
    let charge = || {
        retry.execute(|_| {
            breaker.call(|| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move { if call == 0 { Err(ChargeError::Timeout) } else { Ok(format!("ch_{call}")) } }
            })
        })
    };

    let first = payments.ensure_idempotent("order-1", charge).await;
    let second = payments.ensure_idempotent("order-1", charge).await;

    assert_eq!(first, Ok("ch_1".to_string()));
    assert_eq!(second, Ok("ch_1".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(breaker.snapshot().failure_count, 0);
}

#[tokio::test]
async fn retry_waits_for_open_circuit_when_handling_unavailable() {
    let control = ClockControl::default().auto_advance_timers(true);
    let clock = control.to_clock();
    let context = ResilienceContext::new(&clock);

    let breaker = CircuitBreaker::builder("gateway", &context)
        .failure_threshold(1)
        .recovery_timeout(Duration::from_secs(5))
        .build();
    let retry = RetryExecutor::builder("gateway_retry", &context)
        .max_attempts(3)
        .strategy(ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(10)).jitter(false))
        .handle_unavailable(true)
        .build();

    let calls = AtomicU32::new(0);
    let start = clock.instant();

    // attempt 0 fails and opens the circuit, attempt 1 is rejected, attempt 2 is the trial
    let result = retry
        .execute(|_| {
            breaker.call(|| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move { if call == 0 { Err(ChargeError::Timeout) } else { Ok("charged") } }
            })
        })
        .await;

    assert_eq!(result, Ok("charged"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(clock.instant().duration_since(start) >= Duration::from_secs(5));
}

#[tokio::test]
async fn fallback_to_secondary_provider_when_primary_circuit_is_open() {
    let control = ClockControl::new();
    let context = context(&control);
    let registry = CircuitBreakerRegistry::new(&context, airbag::config::BreakerConfig::default());
    let primary = registry.get("primary");

    for _ in 0..primary.failure_threshold() {
        let _ = primary.call(|| async { Err::<(), _>(ChargeError::Timeout) }).await;
    }

    let primary_calls = AtomicU32::new(0);
    let outcome = RecoveryContext::scope("charge", &context, |recovery| {
        let primary = primary.clone();
        let secondary = registry.get("secondary");
        let primary_calls = &primary_calls;

        async move {
            recovery
                .execute_with_fallback(
                    4200_u64,
                    |amount| async move {
                        primary
                            .call(|| async {
                                primary_calls.fetch_add(1, Ordering::SeqCst);
                                Ok::<_, BreakerError<ChargeError>>(format!("primary:{amount}"))
                            })
                            .await
                    },
                    |amount| async move {
                        secondary
                            .call(|| async { Ok::<_, BreakerError<ChargeError>>(format!("secondary:{amount}")) })
                            .await
                    },
                )
                .await
        }
    })
    .await;

    assert_eq!(outcome.result.map_err(|error| error.to_string()), Ok("secondary:4200".to_string()));
    assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    assert!(
        outcome.state.attempts()[0]
            .error()
            .is_some_and(|error| error.starts_with("Service temporarily unavailable"))
    );
}
