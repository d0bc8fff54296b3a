// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::{Attempt, RecoveryInfo};

/// Arguments passed to the error classifier of a [`RetryExecutor`][super::RetryExecutor].
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct RecoveryArgs {
    pub(crate) attempt: Attempt,
}

impl RecoveryArgs {
    /// Returns the attempt that produced the error being classified.
    #[must_use]
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }
}

/// Arguments passed to the [`on_retry`][super::RetryBuilder::on_retry] callback.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OnRetryArgs {
    pub(crate) attempt: Attempt,
    pub(crate) retry_delay: Duration,
    pub(crate) recovery: RecoveryInfo,
}

impl OnRetryArgs {
    /// Returns the attempt that just failed. Its index is zero-based.
    #[must_use]
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// Returns how long the executor waits before the next attempt.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the classification that made the error retryable.
    #[must_use]
    pub fn recovery(&self) -> &RecoveryInfo {
        &self.recovery
    }
}
