// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::lock::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use parking_lot::Mutex;
use tick::Clock;

use super::IdempotencyBuilder;
use super::entry::CacheEntry;
use crate::ResilienceContext;
use crate::telemetry::TelemetryHelper;

/// Runs keyed operations at most once per key and replays their successful results.
///
/// The first call for a key runs the operation; if it succeeds, the value is stored and every
/// later call with the same key returns a clone of it until the cache TTL has elapsed. Errors
/// are never stored, so a failed operation runs again on the next call.
///
/// Concurrent calls with the same key are serialized: while one call runs the operation, the
/// others wait and then receive the stored value instead of running it again. Calls with
/// different keys never wait for each other.
///
/// Expired results are removed lazily when their key is looked up, or in bulk by
/// [`cleanup_expired`][Self::cleanup_expired]. Clones share the same storage.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use tick::Clock;
/// use airbag::ResilienceContext;
/// use airbag::idempotency::IdempotencyManager;
///
/// # async fn example(clock: Clock) -> Result<(), std::io::Error> {
/// let context = ResilienceContext::new(&clock);
/// let payments = IdempotencyManager::builder("payments", &context)
///     .cache_ttl(Duration::from_secs(24 * 60 * 60))
///     .build();
///
/// // A client retrying with the same key is charged once.
/// let first = payments.ensure_idempotent("order-1001", || charge(4200)).await?;
/// let second = payments.ensure_idempotent("order-1001", || charge(4200)).await?;
/// assert_eq!(first, second);
/// # Ok(())
/// # }
/// # async fn charge(_amount: u64) -> Result<String, std::io::Error> { Ok("ch_1".to_string()) }
/// ```
pub struct IdempotencyManager<T> {
    shared: Arc<ManagerShared<T>>,
}

struct ManagerShared<T> {
    clock: Clock,
    cache_ttl: Duration,
    telemetry: TelemetryHelper,
    state: Mutex<State<T>>,
}

struct State<T> {
    entries: HashMap<String, CacheEntry<T>>,
    flights: HashMap<String, Weak<AsyncMutex<()>>>,
}

impl<T> Clone for IdempotencyManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Debug for IdempotencyManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyManager")
            .field("name", &self.shared.telemetry.strategy_name)
            .field("cache_ttl", &self.shared.cache_ttl)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<T> IdempotencyManager<T> {
    /// Starts configuring an idempotency manager.
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &ResilienceContext) -> IdempotencyBuilder<T> {
        IdempotencyBuilder::new(name.into(), context)
    }

    pub(super) fn new(clock: Clock, cache_ttl: Duration, telemetry: TelemetryHelper) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                clock,
                cache_ttl,
                telemetry,
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    flights: HashMap::new(),
                }),
            }),
        }
    }

    /// Returns how long successful results are replayed.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.shared.cache_ttl
    }

    /// Returns the number of stored results, including expired ones not yet removed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    /// Returns `true` if no result is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().entries.is_empty()
    }

    /// Removes the stored result for `key`. Returns `true` if one was present.
    ///
    /// The next call with `key` runs its operation again.
    pub fn invalidate(&self, key: &str) -> bool {
        self.shared.state.lock().entries.remove(key).is_some()
    }

    /// Removes every expired result and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.shared.clock.system_time();
        let ttl = self.shared.cache_ttl;

        let removed = {
            let mut state = self.shared.state.lock();
            let before = state.entries.len();
            state.entries.retain(|_, entry| !entry.is_expired(now, ttl));
            state.flights.retain(|_, flight| flight.strong_count() > 0);
            before - state.entries.len()
        };

        self.shared.emit_cleanup(removed);
        removed
    }
}

impl<T: Clone> IdempotencyManager<T> {
    /// Returns the stored result for `key`, or runs `operation` and stores its success.
    ///
    /// Only the first caller for a key runs its operation; concurrent callers with the same key
    /// wait for it to finish. If it succeeds they receive its value, if it fails the next
    /// waiting caller runs its own operation.
    ///
    /// # Errors
    ///
    /// Returns the error of `operation` unchanged. Errors are not stored.
    pub async fn ensure_idempotent<E, F, Fut>(&self, key: impl Into<String>, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.into();

        if let Some(value) = self.shared.lookup(&key) {
            return Ok(value);
        }

        let flight = self.shared.join_flight(&key);
        let _turn = flight.turn().await;

        // The previous holder of the flight may have stored a result while we waited.
        if let Some(value) = self.shared.lookup(&key) {
            return Ok(value);
        }

        let value = operation().await?;
        self.shared.store(key, value.clone());

        Ok(value)
    }
}

impl<T> ManagerShared<T> {
    fn join_flight(&self, key: &str) -> FlightGuard<'_, T> {
        let mut state = self.state.lock();

        let lock = match state.flights.get(key).and_then(Weak::upgrade) {
            Some(lock) => lock,
            None => {
                let lock = Arc::new(AsyncMutex::new(()));
                state.flights.insert(key.to_string(), Arc::downgrade(&lock));
                lock
            }
        };

        FlightGuard {
            key: key.to_string(),
            lock: Some(lock),
            shared: self,
        }
    }

    fn store(&self, key: String, value: T) {
        let entry = CacheEntry::new(value, self.clock.system_time());
        self.state.lock().entries.insert(key, entry);
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_hit(&self, key: &str) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            tracing::event!(
                name: "airbag.idempotency.hit",
                tracing::Level::DEBUG,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                idempotency.key = key,
                "replaying stored result",
            );
        }
    }

    #[cfg_attr(not(any(feature = "logs", test)), expect(unused_variables, reason = "unused without logs"))]
    fn emit_cleanup(&self, removed: usize) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled() {
            tracing::event!(
                name: "airbag.idempotency.cleanup",
                tracing::Level::DEBUG,
                pipeline.name = %self.telemetry.pipeline_name,
                strategy.name = %self.telemetry.strategy_name,
                idempotency.removed = removed,
                "removed expired results",
            );
        }
    }
}

impl<T: Clone> ManagerShared<T> {
    /// Returns a clone of the live result for `key`, removing it if it has expired.
    fn lookup(&self, key: &str) -> Option<T> {
        let now = self.clock.system_time();

        let value = {
            let mut state = self.state.lock();
            match state.entries.get(key) {
                Some(entry) if entry.is_expired(now, self.cache_ttl) => {
                    state.entries.remove(key);
                    None
                }
                Some(entry) => Some(entry.value().clone()),
                None => None,
            }
        };

        if value.is_some() {
            self.emit_hit(key);
        }

        value
    }
}

/// Membership in the flight of one key. The flight is removed once its last member leaves.
struct FlightGuard<'a, T> {
    key: String,
    // `None` only while the guard is dropped.
    lock: Option<Arc<AsyncMutex<()>>>,
    shared: &'a ManagerShared<T>,
}

impl<T> FlightGuard<'_, T> {
    /// Waits until this member is the only one of the flight running an operation.
    async fn turn(&self) -> Option<AsyncMutexGuard<'_, ()>> {
        Some(self.lock.as_deref()?.lock().await)
    }
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();

        // The membership is released under the same lock that upgrades happen under, so the
        // last member to leave always sees a dead flight.
        drop(self.lock.take());

        if state.flights.get(&self.key).is_some_and(|flight| flight.strong_count() == 0) {
            state.flights.remove(&self.key);
        }
    }
}
