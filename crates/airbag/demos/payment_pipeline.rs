// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Charges a flaky payment gateway through every recovery component:
//!
//! 1. An idempotency manager keyed by order id, so a client repeating a request is charged once
//! 2. A retry executor with exponential backoff for gateway timeouts
//! 3. A circuit breaker that stops calling the gateway while it keeps failing
//! 4. A recovery scope that falls back to queueing the charge for later

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use airbag::breaker::{CircuitBreaker, CircuitOpenError};
use airbag::idempotency::IdempotencyManager;
use airbag::recovery::RecoveryContext;
use airbag::retry::RetryExecutor;
use airbag::{ExponentialBackoff, Recovery, RecoveryInfo, ResilienceContext};
use ohno::AppError;
use tick::Clock;

#[derive(Debug, Clone, thiserror::Error)]
enum GatewayError {
    #[error("gateway timed out")]
    Timeout,
    #[error("card declined")]
    Declined,
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),
}

impl Recovery for GatewayError {
    fn recovery(&self) -> RecoveryInfo {
        match self {
            Self::Timeout => RecoveryInfo::retry(),
            Self::Declined => RecoveryInfo::never(),
            Self::CircuitOpen(open) => open.recovery(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let clock = Clock::new_tokio();
    let context = ResilienceContext::new(&clock).name("payments").enable_logs();

    let breaker = CircuitBreaker::builder("gateway", &context)
        .failure_threshold(3)
        .recovery_timeout(Duration::from_secs(1))
        .build();
    let retry = RetryExecutor::builder("gateway_retry", &context)
        .max_attempts(3)
        .strategy(ExponentialBackoff::new(Duration::from_millis(50), Duration::from_millis(400)))
        .build();
    let charges = IdempotencyManager::builder("charges", &context)
        .cache_ttl(Duration::from_secs(60))
        .build();

    let gateway_calls = AtomicU32::new(0);

    for (order, amount) in [("order-1", 1200), ("order-1", 1200), ("order-2", 560), ("order-3", 9900)] {
        let outcome = RecoveryContext::scope("checkout", &context, |recovery| {
            let (retry, breaker, charges, gateway_calls) = (&retry, &breaker, &charges, &gateway_calls);

            async move {
                recovery.insert("order", order);
                recovery
                    .execute_with_fallback(
                        amount,
                        |amount| {
                            charges.ensure_idempotent(order, move || {
                                retry.execute(move |_| {
                                    breaker.call(move || charge_gateway(gateway_calls, amount))
                                })
                            })
                        },
                        |amount| async move { Ok::<_, GatewayError>(format!("queued {amount} for later")) },
                    )
                    .await
            }
        })
        .await;

        println!(
            "{order}: {:?} after {} attempt(s), circuit {}",
            outcome.result,
            outcome.state.attempts().len(),
            breaker.state()
        );
    }

    println!("gateway invoked {} time(s)", gateway_calls.load(Ordering::SeqCst));

    Ok(())
}

// The gateway times out on every other call and declines large amounts.
async fn charge_gateway(calls: &AtomicU32, amount: u32) -> Result<String, GatewayError> {
    let call = calls.fetch_add(1, Ordering::SeqCst);

    if amount > 5000 {
        Err(GatewayError::Declined)
    } else if call % 2 == 0 {
        Err(GatewayError::Timeout)
    } else {
        Ok(format!("ch_{call}_{amount}"))
    }
}
