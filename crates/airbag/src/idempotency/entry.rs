// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

/// A successful result and the time it was stored.
#[derive(Debug, Clone)]
pub(super) struct CacheEntry<T> {
    value: T,
    cached_at: SystemTime,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, cached_at: SystemTime) -> Self {
        Self { value, cached_at }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// An entry is expired once strictly more than `ttl` has passed since it was stored.
    pub fn is_expired(&self, now: SystemTime, ttl: Duration) -> bool {
        match now.duration_since(self.cached_at) {
            Ok(elapsed) => elapsed > ttl,
            // system time went backwards
            Err(_) => true,
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn expires_strictly_after_ttl() {
        let stored = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
        let entry = CacheEntry::new("result", stored);

        assert!(!entry.is_expired(stored, TTL));
        assert!(!entry.is_expired(stored + TTL, TTL));
        assert!(entry.is_expired(stored + TTL + Duration::from_nanos(1), TTL));
        assert_eq!(*entry.value(), "result");
    }

    #[test]
    fn time_going_backwards_expires() {
        let stored = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
        let entry = CacheEntry::new((), stored);

        assert!(entry.is_expired(stored - Duration::from_secs(1), TTL));
    }
}
