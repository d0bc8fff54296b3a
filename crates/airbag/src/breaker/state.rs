// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;
use std::time::Instant;

/// Admission state of a [`CircuitBreaker`][super::CircuitBreaker].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted.
    #[default]
    Closed,

    /// Calls are rejected until the recovery timeout has elapsed since the last failure.
    Open,

    /// A single trial call decides whether the circuit closes or opens again.
    HalfOpen,
}

impl CircuitState {
    /// Returns the lowercase name used in log events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a circuit breaker, taken under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct CircuitSnapshot {
    /// Current state.
    pub state: CircuitState,

    /// Consecutive failures recorded since the circuit last closed.
    pub failure_count: u32,

    /// When the most recent failure was recorded, on the breaker's clock.
    pub last_failure_time: Option<Instant>,
}
