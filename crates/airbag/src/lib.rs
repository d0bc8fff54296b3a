// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Failure recovery for calls to unreliable downstream operations.
//!
//! This crate provides a small set of composable primitives that make calls to payment
//! providers, webhooks and other external services safe to repeat and safe to short-circuit.
//! Every primitive wraps an opaque async closure returning `Result<T, E>`; none of them knows
//! anything about the domain types flowing through it.
//!
//! # Core Types
//!
//! - [`RetryStrategy`]: Computes the delay before a given retry attempt
//!   ([`ExponentialBackoff`], [`LinearBackoff`]).
//! - [`retry::RetryExecutor`]: Re-invokes an operation while its errors are classified as transient.
//! - [`breaker::CircuitBreaker`]: Fails fast while a downstream is considered unhealthy.
//! - [`idempotency::IdempotencyManager`]: Runs a keyed operation once and replays its result.
//! - [`recovery::RecoveryContext`]: Runs a primary operation and falls back to an alternate one.
//!
//! Errors are classified through [`Recovery`] and [`RecoveryInfo`]. An error whose recovery
//! kind is [`RecoveryKind::Retry`] is considered transient by default.
//!
//! # Quick Start
//!
//! ```rust
//! # use std::time::Duration;
//! # use tick::Clock;
//! use airbag::breaker::{BreakerError, CircuitBreaker};
//! use airbag::retry::RetryExecutor;
//! use airbag::{LinearBackoff, RecoveryInfo, ResilienceContext};
//!
//! # async fn example(clock: Clock) {
//! let context = ResilienceContext::new(&clock).name("payments");
//!
//! let breaker = CircuitBreaker::builder("provider", &context)
//!     .failure_threshold(5)
//!     .recovery_timeout(Duration::from_secs(30))
//!     .build();
//!
//! let retry = RetryExecutor::builder("provider_retry", &context)
//!     .max_attempts(3)
//!     .strategy(LinearBackoff::new(Duration::from_millis(100), Duration::from_millis(100)))
//!     .recovery_with(|error: &BreakerError<String>, _| match error {
//!         BreakerError::Inner(message) if message == "timeout" => RecoveryInfo::retry(),
//!         _ => RecoveryInfo::never(),
//!     })
//!     .build();
//!
//! let receipt = retry
//!     .execute(|_attempt| breaker.call(|| async { charge_card().await.map_err(BreakerError::Inner) }))
//!     .await;
//! # let _ = receipt;
//! # }
//! # async fn charge_card() -> Result<String, String> { Ok("receipt".to_string()) }
//! ```
//!
//! > **Note**: All components take their [`Clock`][tick::Clock] from [`ResilienceContext`]. Tests
//! > use [`tick::ClockControl`] to move time forward without sleeping.
//!
//! # Composition
//!
//! Components nest freely: a retry executor around a breaker-guarded call, an idempotency
//! manager around a retry executor, a recovery context whose primary operation is any of the above.
//! Errors pass through every layer unchanged; only the circuit breaker introduces a new error
//! ([`breaker::CircuitOpenError`]) and only when it refuses to call the operation.
//!
//! # Features
//!
//! - `logs` (default): Emits structured [`tracing`] events once
//!   [`ResilienceContext::enable_logs`] is called.
//! - `serde`: Derives `Serialize`/`Deserialize` for the [`config`] structs.

#[doc(inline)]
pub use recoverable::{Recovery, RecoveryInfo, RecoveryKind};

mod attempt;
pub use attempt::Attempt;

mod backoff;
pub use backoff::{ExponentialBackoff, LinearBackoff, RetryStrategy};

mod context;
pub use context::ResilienceContext;

mod typestate;
pub use typestate::{NotSet, Set};

pub mod breaker;
pub mod config;
pub mod idempotency;
pub mod recovery;
pub mod retry;

mod fn_wrapper;
pub(crate) use fn_wrapper::define_fn_wrapper;

mod rnd;
mod telemetry;

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;
