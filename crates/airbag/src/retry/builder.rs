// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use super::constants::{DEFAULT_HANDLE_UNAVAILABLE, DEFAULT_MAX_ATTEMPTS};
use super::{OnRetry, OnRetryArgs, RecoveryArgs, RetryExecutor, RetryShared, ShouldRetry};
use crate::config::RetryConfig;
use crate::{ExponentialBackoff, NotSet, Recovery, RecoveryInfo, ResilienceContext, RetryStrategy, Set};

/// Builder for [`RetryExecutor`].
///
/// The error classifier is the only required property. It is tracked by the `R` type
/// parameter: call [`recovery`][Self::recovery], [`recovery_with`][Self::recovery_with] or
/// [`retry_if`][Self::retry_if] to set it. When the error type implements [`Recovery`], the
/// builder can be built without an explicit classifier and uses the error's own classification.
pub struct RetryBuilder<E, R = NotSet> {
    name: Cow<'static, str>,
    context: ResilienceContext,
    max_attempts: u32,
    strategy: Arc<dyn RetryStrategy>,
    should_retry: ShouldRetry<E>,
    on_retry: Option<OnRetry<E>>,
    handle_unavailable: bool,
    _classifier: PhantomData<fn() -> R>,
}

impl<E, R> Debug for RetryBuilder<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryBuilder")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("strategy", &self.strategy)
            .field("handle_unavailable", &self.handle_unavailable)
            .finish_non_exhaustive()
    }
}

impl<E> RetryBuilder<E, NotSet> {
    pub(crate) fn new(name: Cow<'static, str>, context: &ResilienceContext) -> Self {
        Self {
            name,
            context: context.clone(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            strategy: Arc::new(ExponentialBackoff::default()),
            should_retry: ShouldRetry::new(|_, _| RecoveryInfo::never()),
            on_retry: None,
            handle_unavailable: DEFAULT_HANDLE_UNAVAILABLE,
            _classifier: PhantomData,
        }
    }
}

impl<E, R> RetryBuilder<E, R> {
    /// Sets the total number of invocations, including the first one.
    ///
    /// Values below `1` are treated as `1`: the operation is always invoked at least once.
    ///
    /// **Default**: `3`
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the strategy computing the delay between attempts.
    ///
    /// **Default**: [`ExponentialBackoff::default()`] (1s base, 60s cap, jitter)
    #[must_use]
    pub fn strategy(mut self, strategy: impl RetryStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    /// Retries errors classified as [`RecoveryKind::Unavailable`][crate::RecoveryKind::Unavailable].
    ///
    /// **Default**: `false`
    #[must_use]
    pub fn handle_unavailable(mut self, enabled: bool) -> Self {
        self.handle_unavailable = enabled;
        self
    }

    /// Registers a callback invoked before every retry, after the delay has been chosen.
    #[must_use]
    pub fn on_retry(mut self, on_retry: impl Fn(&E, OnRetryArgs) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(OnRetry::new(on_retry));
        self
    }

    /// Applies the attempt count, strategy and unavailability handling from `config`.
    #[must_use]
    pub fn config(self, config: &RetryConfig) -> Self {
        let mut builder = self.max_attempts(config.max_attempts).handle_unavailable(config.handle_unavailable);
        builder.strategy = config.strategy.to_strategy();
        builder
    }

    /// Classifies errors with the given function.
    ///
    /// Only errors classified as [`RecoveryKind::Retry`][crate::RecoveryKind::Retry] are retried
    /// (plus `Unavailable` when [`handle_unavailable`][Self::handle_unavailable] is on). A
    /// delay hint on the returned [`RecoveryInfo`] replaces the strategy's delay for that retry.
    #[must_use]
    pub fn recovery_with(self, classify: impl Fn(&E, RecoveryArgs) -> RecoveryInfo + Send + Sync + 'static) -> RetryBuilder<E, Set> {
        self.into_set(ShouldRetry::new(classify))
    }

    /// Retries every error for which `predicate` returns `true`.
    #[must_use]
    pub fn retry_if(self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> RetryBuilder<E, Set> {
        self.recovery_with(move |error, _| {
            if predicate(error) {
                RecoveryInfo::retry()
            } else {
                RecoveryInfo::never()
            }
        })
    }

    fn into_set(self, should_retry: ShouldRetry<E>) -> RetryBuilder<E, Set> {
        RetryBuilder {
            name: self.name,
            context: self.context,
            max_attempts: self.max_attempts,
            strategy: self.strategy,
            should_retry,
            on_retry: self.on_retry,
            handle_unavailable: self.handle_unavailable,
            _classifier: PhantomData,
        }
    }

    fn into_executor(self) -> RetryExecutor<E> {
        RetryExecutor {
            shared: Arc::new(RetryShared {
                clock: self.context.get_clock().clone(),
                max_attempts: self.max_attempts,
                strategy: self.strategy,
                should_retry: self.should_retry,
                on_retry: self.on_retry,
                handle_unavailable: self.handle_unavailable,
                telemetry: self.context.create_telemetry(self.name),
            }),
        }
    }
}

impl<E: Recovery, R> RetryBuilder<E, R> {
    /// Classifies errors through their [`Recovery`] implementation.
    #[must_use]
    pub fn recovery(self) -> RetryBuilder<E, Set> {
        self.into_set(ShouldRetry::new(|error: &E, _| error.recovery()))
    }
}

impl<E: Recovery> RetryBuilder<E, NotSet> {
    /// Builds the executor, classifying errors through their [`Recovery`] implementation.
    #[must_use]
    pub fn build(self) -> RetryExecutor<E> {
        self.recovery().into_executor()
    }
}

impl<E> RetryBuilder<E, Set> {
    /// Builds the executor with the configured classifier.
    #[must_use]
    pub fn build(self) -> RetryExecutor<E> {
        self.into_executor()
    }
}
