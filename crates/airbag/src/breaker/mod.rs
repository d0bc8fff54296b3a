// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Circuit breaking for downstreams that keep failing.
//!
//! A [`CircuitBreaker`] counts consecutive failures of the calls it guards. Once the count
//! reaches the failure threshold the circuit opens and calls fail fast with
//! [`CircuitOpenError`] until the recovery timeout has elapsed. The next call after that is a
//! trial: its success closes the circuit, its failure opens it for another timeout.
//!
//! ```text
//!            failures >= threshold
//!   Closed ───────────────────────────▶ Open
//!     ▲                                  │ ▲
//!     │ trial succeeds     timeout passed│ │ trial fails
//!     │                                  ▼ │
//!     └──────────────────────────────── HalfOpen
//! ```
//!
//! # Error Types
//!
//! [`CircuitBreaker::call`] returns the operation's own error type, which must be
//! constructible from [`CircuitOpenError`]. Error types that have no such variant can be
//! wrapped in [`BreakerError`].
//!
//! [`CircuitOpenError`] implements [`Recovery`][crate::Recovery] as unavailable with the
//! remaining open time as delay hint, so a retry executor with
//! [`handle_unavailable`][crate::retry::RetryBuilder::handle_unavailable] enabled waits exactly
//! until the circuit admits a trial.
//!
//! # Logs
//!
//! With logs enabled, state transitions emit `airbag.breaker.opened` (`WARN`),
//! `airbag.breaker.half_open` and `airbag.breaker.closed` (`INFO`). Rejected calls emit
//! `airbag.breaker.rejected` at `DEBUG`.

mod builder;
mod circuit;
mod constants;
mod engine;
mod error;
mod registry;
mod state;

pub use builder::CircuitBreakerBuilder;
pub use circuit::CircuitBreaker;
pub use error::{BreakerError, CircuitOpenError};
pub use registry::CircuitBreakerRegistry;
pub use state::{CircuitSnapshot, CircuitState};
