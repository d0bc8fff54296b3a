// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;

/// Source of jitter for backoff strategies.
///
/// Not cryptographically secure. Tests swap in a fixed or scripted source so that jittered
/// delays become deterministic.
#[derive(Clone, Default)]
pub(crate) enum Rnd {
    #[default]
    Real,

    #[cfg_attr(not(test), expect(dead_code, reason = "only constructed by tests"))]
    Fixed(Arc<dyn Fn() -> f64 + Send + Sync>),
}

impl Debug for Rnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real => write!(f, "Real"),
            Self::Fixed(_) => write!(f, "Fixed"),
        }
    }
}

impl Rnd {
    #[cfg(test)]
    pub fn new_fixed(value: f64) -> Self {
        Self::Fixed(Arc::new(move || value))
    }

    /// Returns a value in `[0.0, 1.0)`.
    pub fn next_f64(&self) -> f64 {
        match self {
            Self::Real => fastrand::f64(),
            Self::Fixed(generator) => generator(),
        }
    }
}
