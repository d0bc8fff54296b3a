// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::{Duration, SystemTime};

/// Which operation an [`AttemptRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum AttemptKind {
    /// The preferred operation, always run first.
    Primary,
    /// The alternate operation, run only after the primary failed.
    Fallback,
}

impl Display for AttemptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Outcome of one operation run by a [`RecoveryContext`][super::RecoveryContext].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttemptRecord {
    kind: AttemptKind,
    error: Option<String>,
    timestamp: SystemTime,
}

impl AttemptRecord {
    pub(super) fn new(kind: AttemptKind, error: Option<String>, timestamp: SystemTime) -> Self {
        Self { kind, error, timestamp }
    }

    /// Which operation ran.
    #[must_use]
    pub fn kind(&self) -> AttemptKind {
        self.kind
    }

    /// Returns `true` if the operation returned `Ok`.
    #[must_use]
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// The rendered error of a failed attempt.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// When the operation finished.
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

/// Audit trail of one recovery scope.
///
/// Holds when the scope started and finished, whether it succeeded, every attempt in order and
/// the entries the caller attached with [`RecoveryContext::insert`][super::RecoveryContext::insert].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RecoveryState {
    started_at: SystemTime,
    completed_at: Option<SystemTime>,
    success: Option<bool>,
    attempts: Vec<AttemptRecord>,
    entries: BTreeMap<String, String>,
}

impl RecoveryState {
    pub(super) fn new(started_at: SystemTime) -> Self {
        Self {
            started_at,
            completed_at: None,
            success: None,
            attempts: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    /// When the scope was created.
    #[must_use]
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// `None` until the scope has been completed.
    #[must_use]
    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    /// `None` until the scope has been completed.
    #[must_use]
    pub fn success(&self) -> Option<bool> {
        self.success
    }

    /// Returns `true` once the scope has been completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Time between start and completion, if completed.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at
            .map(|completed_at| completed_at.duration_since(self.started_at).unwrap_or_default())
    }

    /// Attempts in the order they finished.
    #[must_use]
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Key/value pairs attached by the caller.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Returns the entry stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub(super) fn push_attempt(&mut self, attempt: AttemptRecord) {
        self.attempts.push(attempt);
    }

    pub(super) fn insert(&mut self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    /// Returns `false` if the state was already completed; the first completion wins.
    pub(super) fn complete(&mut self, success: bool, now: SystemTime) -> bool {
        if self.is_completed() {
            return false;
        }

        self.completed_at = Some(now);
        self.success = Some(success);
        true
    }
}
