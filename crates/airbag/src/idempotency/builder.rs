// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::time::Duration;

use super::IdempotencyManager;
use crate::ResilienceContext;
use crate::config::IdempotencyConfig;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Builder for [`IdempotencyManager`].
///
/// | Parameter | Default Value | Configured By |
/// |-----------|---------------|---------------|
/// | Cache TTL | `1h` | [`cache_ttl`][Self::cache_ttl] |
#[derive(Debug)]
pub struct IdempotencyBuilder<T> {
    name: Cow<'static, str>,
    context: ResilienceContext,
    cache_ttl: Duration,
    _value: PhantomData<fn() -> T>,
}

impl<T> IdempotencyBuilder<T> {
    pub(super) fn new(name: Cow<'static, str>, context: &ResilienceContext) -> Self {
        Self {
            name,
            context: context.clone(),
            cache_ttl: DEFAULT_CACHE_TTL,
            _value: PhantomData,
        }
    }

    /// Sets how long a successful result is replayed after it was produced.
    #[must_use]
    pub fn cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Applies the cache TTL from `config`.
    #[must_use]
    pub fn config(self, config: &IdempotencyConfig) -> Self {
        self.cache_ttl(config.cache_ttl)
    }

    /// Builds an empty manager.
    #[must_use]
    pub fn build(self) -> IdempotencyManager<T> {
        IdempotencyManager::new(
            self.context.get_clock().clone(),
            self.cache_ttl,
            self.context.create_telemetry(self.name),
        )
    }
}
