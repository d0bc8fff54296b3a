// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Primary/fallback execution with an audit trail.
//!
//! A [`RecoveryContext`] runs a primary operation and, if it fails, an alternate one with the
//! same input. Each run is appended to the context's [`RecoveryState`] as an
//! [`AttemptRecord`]; callers attach their own key/value entries with
//! [`insert`][RecoveryContext::insert]. When the scope ends, the state is completed with its
//! end time and overall success.
//!
//! # Quick Start
//!
//! ```rust
//! # use tick::Clock;
//! use airbag::ResilienceContext;
//! use airbag::recovery::RecoveryContext;
//!
//! # async fn example(clock: Clock) -> Result<String, String> {
//! let context = ResilienceContext::new(&clock).name("checkout");
//!
//! let outcome = RecoveryContext::scope("quote", &context, |recovery| async move {
//!     recovery
//!         .execute_with_fallback(
//!             "EUR".to_string(),
//!             |currency| live_rate(currency),
//!             |currency| cached_rate(currency),
//!         )
//!         .await
//! })
//! .await;
//!
//! for attempt in outcome.state.attempts() {
//!     println!("{}: success={}", attempt.kind(), attempt.success());
//! }
//! outcome.into_result()
//! # }
//! # async fn live_rate(_currency: String) -> Result<String, String> { Err("timeout".to_string()) }
//! # async fn cached_rate(_currency: String) -> Result<String, String> { Ok("1.08".to_string()) }
//! ```
//!
//! # Logs
//!
//! With logs enabled, running a fallback emits `airbag.recovery.fallback` at `WARN` with the
//! rendered primary error. Completing a scope emits `airbag.recovery.completed`, at `INFO` when
//! it succeeded and at `WARN` otherwise.

mod context;
mod state;

pub use context::{RecoveryContext, ScopeOutcome};
pub use state::{AttemptKind, AttemptRecord, RecoveryState};
