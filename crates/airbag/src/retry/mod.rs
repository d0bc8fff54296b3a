// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Retry with backoff for transient failures.
//!
//! [`RetryExecutor`] invokes an operation, classifies each error and, while the error is
//! transient and attempts remain, waits for a backoff delay before trying again. It is
//! configured through [`RetryBuilder`], obtained from [`RetryExecutor::builder`].
//!
//! # Quick Start
//!
//! ```rust
//! # use std::time::Duration;
//! # use tick::Clock;
//! use airbag::retry::RetryExecutor;
//! use airbag::{ExponentialBackoff, RecoveryInfo, ResilienceContext};
//!
//! # async fn example(clock: Clock) -> Result<(), String> {
//! let context = ResilienceContext::new(&clock).name("webhooks");
//!
//! let retry = RetryExecutor::builder("deliver", &context)
//!     .max_attempts(4)
//!     .strategy(ExponentialBackoff::new(Duration::from_millis(200), Duration::from_secs(5)))
//!     .recovery_with(|error: &String, _| {
//!         if error.starts_with("5") {
//!             RecoveryInfo::retry()
//!         } else {
//!             RecoveryInfo::never()
//!         }
//!     })
//!     .build();
//!
//! let status = retry.execute(|_attempt| send_webhook("https://example.com/hook")).await?;
//! # let _ = status;
//! # Ok(())
//! # }
//! # async fn send_webhook(_url: &str) -> Result<u16, String> { Ok(200) }
//! ```
//!
//! # Classification
//!
//! Every error is passed to a classifier returning a [`RecoveryInfo`][crate::RecoveryInfo]:
//!
//! - [`RecoveryKind::Retry`][crate::RecoveryKind::Retry]: retried while attempts remain.
//! - [`RecoveryKind::Unavailable`][crate::RecoveryKind::Unavailable]: retried only when
//!   [`handle_unavailable`][RetryBuilder::handle_unavailable] is enabled.
//! - Anything else: returned to the caller after that single attempt.
//!
//! When the error type implements [`Recovery`][crate::Recovery] no classifier needs to be
//! configured; the error classifies itself.
//!
//! # Retry Delay
//!
//! 1. **Recovery delay hint**: a delay attached to the returned `RecoveryInfo` (for example from a
//!    `Retry-After` header) is used as is.
//! 2. **Strategy**: otherwise the configured [`RetryStrategy`][crate::RetryStrategy] computes the
//!    delay from the index of the attempt that failed.
//!
//! # Defaults
//!
//! | Parameter | Default Value | Configured By |
//! |-----------|---------------|---------------|
//! | Max attempts | `3` (including the first) | [`max_attempts`][RetryBuilder::max_attempts] |
//! | Strategy | Exponential, 1s base, 60s cap, jitter | [`strategy`][RetryBuilder::strategy] |
//! | Unavailable handling | Not retried | [`handle_unavailable`][RetryBuilder::handle_unavailable] |
//!
//! # Logs
//!
//! With logs enabled on the [`ResilienceContext`][crate::ResilienceContext], every scheduled
//! retry emits an `airbag.retry` event at `WARN` carrying `pipeline.name`, `strategy.name`,
//! `attempt.index`, `attempt.is_last` and `retry.delay`. Running out of attempts emits
//! `airbag.retry.exhausted`.

mod args;
mod builder;
mod callbacks;
mod constants;
mod executor;

pub use args::{OnRetryArgs, RecoveryArgs};
pub use builder::RetryBuilder;
pub(crate) use callbacks::{OnRetry, ShouldRetry};
pub use executor::RetryExecutor;
pub(crate) use executor::RetryShared;
