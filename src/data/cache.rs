//! Memoized fetches.
//!
//! Each key owns a slot. Concurrent callers for the same key wait on the slot
//! while the first one fetches, so an upstream download happens at most once
//! per key. A failed fetch stores nothing and the next caller retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::FetchKey;
use crate::error::FetchError;
use crate::table::RawTable;

type Slot = Arc<Mutex<Option<Arc<RawTable>>>>;

#[derive(Default)]
pub struct FetchCache {
    slots: Mutex<HashMap<FetchKey, Slot>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `key`, fetching it with `fetch` on a miss.
    pub fn get_or_fetch<F>(&self, key: &FetchKey, fetch: F) -> Result<Arc<RawTable>, FetchError>
    where
        F: FnOnce(&FetchKey) -> Result<RawTable, FetchError>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut cached = lock(&slot);
        if let Some(table) = cached.as_ref() {
            debug!(instrument = %key.instrument, "fetch cache hit");
            return Ok(Arc::clone(table));
        }

        match fetch(key) {
            Ok(table) => {
                let table = Arc::new(table);
                *cached = Some(Arc::clone(&table));
                Ok(table)
            }
            Err(err) => {
                drop(cached);
                self.release_empty(key, &slot);
                Err(err)
            }
        }
    }

    // Drops the slot for a failed key unless another caller is waiting on it.
    fn release_empty(&self, key: &FetchKey, slot: &Slot) {
        let mut slots = lock(&self.slots);
        let unshared = slots
            .get(key)
            .is_some_and(|s| Arc::ptr_eq(s, slot) && Arc::strong_count(slot) == 2);
        if unshared {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| lock(slot).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A panic inside a fetch poisons only that slot's lock; the data is still
// either a complete table or empty.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Instrument;
    use crate::table::ColumnLabel;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn key(symbol: &str) -> FetchKey {
        FetchKey::new(
            Instrument::new(symbol).unwrap(),
            NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    fn table() -> RawTable {
        RawTable::new(vec![ColumnLabel::plain("Date")])
    }

    #[test]
    fn second_call_uses_cache() {
        let cache = FetchCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = |_: &FetchKey| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(table())
        };
        let a = cache.get_or_fetch(&key("TCS.NS"), fetch).unwrap();
        let b = cache.get_or_fetch(&key("TCS.NS"), fetch).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));

        cache.get_or_fetch(&key("INFY.NS"), fetch).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = FetchCache::new();
        let err = cache
            .get_or_fetch(&key("TCS.NS"), |_| Err(FetchError::Io("offline".to_string())))
            .unwrap_err();
        assert_eq!(err.to_string(), "offline");
        assert!(cache.is_empty());

        cache.get_or_fetch(&key("TCS.NS"), |_| Ok(table())).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_keys_do_not_accumulate() {
        let cache = FetchCache::new();
        for symbol in ["A.NS", "B.NS", "C.NS"] {
            cache
                .get_or_fetch(&key(symbol), |_| Err(FetchError::Io("offline".to_string())))
                .unwrap_err();
        }
        assert_eq!(cache.slot_count(), 0);

        cache.get_or_fetch(&key("A.NS"), |_| Ok(table())).unwrap();
        assert_eq!(cache.slot_count(), 1);
    }

    #[test]
    fn concurrent_callers_share_one_fetch() {
        let cache = Arc::new(FetchCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_fetch(&key("HDFCBANK.NS"), |_| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(table())
                        })
                        .unwrap()
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
