// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{CircuitBreaker, CircuitSnapshot};
use crate::ResilienceContext;
use crate::config::BreakerConfig;

/// Named circuit breakers sharing one configuration, created on first use.
///
/// Use a registry when the set of downstreams is only known at runtime, for example one
/// breaker per payment provider. Every name maps to exactly one breaker for the lifetime of
/// the registry; clones of the registry share the same breakers.
///
/// # Examples
///
/// ```
/// use airbag::ResilienceContext;
/// use airbag::breaker::CircuitBreakerRegistry;
/// use airbag::config::BreakerConfig;
/// use tick::Clock;
///
/// let context = ResilienceContext::new(&Clock::new_frozen());
/// let registry = CircuitBreakerRegistry::new(&context, BreakerConfig::default());
///
/// let stripe = registry.get("stripe");
/// assert_eq!(stripe.name(), "stripe");
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreakerRegistry {
    context: ResilienceContext,
    config: BreakerConfig,
    breakers: Arc<Mutex<HashMap<String, CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    /// Creates an empty registry whose breakers use `config`.
    #[must_use]
    pub fn new(context: &ResilienceContext, config: BreakerConfig) -> Self {
        Self {
            context: context.clone(),
            config,
            breakers: Arc::default(),
        }
    }

    /// Returns the breaker registered under `name`, creating it if needed.
    #[must_use]
    pub fn get(&self, name: &str) -> CircuitBreaker {
        self.breakers
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                CircuitBreaker::builder(name.to_string(), &self.context)
                    .config(&self.config)
                    .build()
            })
            .clone()
    }

    /// Returns the number of registered breakers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakers.lock().len()
    }

    /// Returns `true` if no breaker has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakers.lock().is_empty()
    }

    /// Returns a snapshot of every registered breaker, sorted by name.
    #[must_use]
    pub fn snapshots(&self) -> Vec<(String, CircuitSnapshot)> {
        let mut snapshots: Vec<_> = self
            .breakers
            .lock()
            .iter()
            .map(|(name, breaker)| (name.clone(), breaker.snapshot()))
            .collect();

        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }

    /// Resets every registered breaker to closed.
    pub fn reset_all(&self) {
        let breakers: Vec<_> = self.breakers.lock().values().cloned().collect();

        for breaker in breakers {
            breaker.reset();
        }
    }
}
