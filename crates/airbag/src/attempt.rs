// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

/// A single invocation of an operation driven by a [`RetryExecutor`][crate::retry::RetryExecutor].
///
/// Indexes are zero-based: the first invocation is attempt `0`. The last attempt is the one
/// after which the executor gives up, whatever the outcome.
///
/// # Examples
///
/// ```
/// use airbag::Attempt;
///
/// let attempt = Attempt::new(0, false);
/// assert!(attempt.is_first());
/// assert!(!attempt.is_last());
/// assert_eq!(attempt.index(), 0);
///
/// // A single-shot operation is both the first and the last attempt.
/// let single = Attempt::default();
/// assert!(single.is_first());
/// assert!(single.is_last());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attempt {
    index: u32,
    is_last: bool,
}

impl Default for Attempt {
    fn default() -> Self {
        Self::new(0, true)
    }
}

impl Attempt {
    /// Creates an attempt with the given zero-based index.
    #[must_use]
    pub fn new(index: u32, is_last: bool) -> Self {
        Self { index, is_last }
    }

    /// Returns `true` for attempt `0`.
    #[must_use]
    pub fn is_first(self) -> bool {
        self.index == 0
    }

    /// Returns `true` if no further attempt follows this one.
    #[must_use]
    pub fn is_last(self) -> bool {
        self.is_last
    }

    /// Returns the zero-based attempt index.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    pub(crate) fn first(max_attempts: u32) -> Self {
        Self::new(0, max_attempts <= 1)
    }

    /// Returns the next attempt, or `None` once `max_attempts` invocations have been made.
    pub(crate) fn increment(self, max_attempts: u32) -> Option<Self> {
        let next = self.index.saturating_add(1);

        if next >= max_attempts {
            return None;
        }

        Some(Self::new(next, next == max_attempts.saturating_sub(1)))
    }
}

impl Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.index.fmt(f)
    }
}
