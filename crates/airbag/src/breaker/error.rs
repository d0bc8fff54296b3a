// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use crate::{Recovery, RecoveryInfo};

/// Error returned by [`CircuitBreaker::call`][super::CircuitBreaker::call] when the circuit
/// refuses to invoke the operation.
///
/// The operation was not started, so this error never wraps an operation error.
///
/// # Examples
///
/// ```
/// use airbag::breaker::CircuitOpenError;
/// use airbag::{Recovery, RecoveryKind};
///
/// fn describe(error: &CircuitOpenError) -> String {
///     assert_eq!(error.kind(), CircuitOpenError::KIND);
///     assert_eq!(error.recovery().kind(), RecoveryKind::Unavailable);
///     format!("{error}, retry in {:?}", error.retry_after())
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Service temporarily unavailable: circuit '{name}' is open")]
pub struct CircuitOpenError {
    name: Cow<'static, str>,
    retry_after: Duration,
}

impl CircuitOpenError {
    /// Machine-readable kind shared by every open-circuit rejection.
    pub const KIND: &'static str = "CIRCUIT_BREAKER_OPEN";

    pub(crate) fn new(name: Cow<'static, str>, retry_after: Duration) -> Self {
        Self { name, retry_after }
    }

    /// Returns [`Self::KIND`].
    #[must_use]
    pub fn kind(&self) -> &'static str {
        Self::KIND
    }

    /// Returns the name of the circuit breaker that rejected the call.
    #[must_use]
    pub fn breaker_name(&self) -> &str {
        &self.name
    }

    /// Returns the time left until the circuit admits a trial call.
    #[must_use]
    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }
}

impl Recovery for CircuitOpenError {
    fn recovery(&self) -> RecoveryInfo {
        RecoveryInfo::unavailable().delay(self.retry_after)
    }
}

/// Error of a breaker-guarded operation whose own error type has no open-circuit variant.
///
/// Map the operation's error with [`BreakerError::Inner`]; rejections arrive as
/// [`BreakerError::Open`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakerError<E> {
    /// The circuit was open and the operation was not invoked.
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// Returns `true` for [`BreakerError::Open`].
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    /// Returns the operation's error, if the operation ran.
    #[must_use]
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Open(_) => None,
            Self::Inner(error) => Some(error),
        }
    }
}

impl<E: Recovery> Recovery for BreakerError<E> {
    fn recovery(&self) -> RecoveryInfo {
        match self {
            Self::Open(error) => error.recovery(),
            Self::Inner(error) => error.recovery(),
        }
    }
}
