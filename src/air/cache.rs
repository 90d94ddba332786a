//! In-memory TTL cache holding a single shared entry.
//!
//! Stale entries are replaced synchronously on the next access; there is no
//! background refresh. The mutex is held across check, refresh and store so
//! concurrent callers never refresh the same entry twice.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CacheEntry<T> {
    payload: T,
    fetched_at: DateTime<Utc>,
}

/// A lazily populated, TTL-bounded slot.
pub struct TtlCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: Mutex<Option<CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entry: Mutex::new(None),
        }
    }

    /// Return the cached payload if still fresh, otherwise run `refresh`,
    /// store its result and return it. A failed refresh leaves the slot empty.
    pub fn get_or_try_refresh<E>(
        &self,
        refresh: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut slot = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        if let Some(entry) = slot.as_ref() {
            let age = (now - entry.fetched_at).to_std().unwrap_or_default();
            if age < self.ttl {
                tracing::debug!(age_secs = age.as_secs(), "cache hit");
                return Ok(entry.payload.clone());
            }
            tracing::debug!(age_secs = age.as_secs(), "cache entry expired");
        }

        let payload = refresh()?;
        *slot = Some(CacheEntry {
            payload: payload.clone(),
            fetched_at: now,
        });
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use crate::air::testing::ManualClock;
    use super::*;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(clock: Arc<ManualClock>) -> TtlCache<Vec<u32>> {
        TtlCache::new(Duration::from_secs(600), clock)
    }

    #[test]
    fn test_fresh_entry_served_without_refetch() {
        let clock = Arc::new(ManualClock::epoch());
        let cache = cache(clock.clone());
        let calls = Cell::new(0);
        let fetch = || {
            calls.set(calls.get() + 1);
            Ok::<_, ()>(vec![1, 2, 3])
        };

        assert_eq!(cache.get_or_try_refresh(fetch).unwrap(), vec![1, 2, 3]);
        clock.advance_secs(599);
        assert_eq!(cache.get_or_try_refresh(fetch).unwrap(), vec![1, 2, 3]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_expired_entry_refetched() {
        let clock = Arc::new(ManualClock::epoch());
        let cache = cache(clock.clone());
        let calls = Cell::new(0);

        cache
            .get_or_try_refresh(|| {
                calls.set(calls.get() + 1);
                Ok::<_, ()>(vec![1])
            })
            .unwrap();
        clock.advance_secs(600);
        let second = cache
            .get_or_try_refresh(|| {
                calls.set(calls.get() + 1);
                Ok::<_, ()>(vec![2])
            })
            .unwrap();

        assert_eq!(second, vec![2]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_failed_refresh_not_stored() {
        let clock = Arc::new(ManualClock::epoch());
        let cache = cache(clock);

        assert!(cache.get_or_try_refresh(|| Err::<Vec<u32>, _>("down")).is_err());
        let calls = Cell::new(0);
        cache
            .get_or_try_refresh(|| {
                calls.set(calls.get() + 1);
                Ok::<_, ()>(vec![7])
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_concurrent_callers_share_one_refresh() {
        let cache = Arc::new(cache(Arc::new(ManualClock::epoch())));
        let refreshes = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let cache = cache.clone();
                let refreshes = &refreshes;
                scope.spawn(move || {
                    let v = cache
                        .get_or_try_refresh(|| {
                            refreshes.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(50));
                            Ok::<_, ()>(vec![4, 2])
                        })
                        .unwrap();
                    assert_eq!(v, vec![4, 2]);
                });
            }
        });

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }
}
