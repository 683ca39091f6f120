//! Per-key mutual exclusion for cache misses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::CacheKey;

/// Serialises work on equal keys while letting distinct keys proceed.
///
/// Slots are created on demand and dropped once no caller holds them, so the
/// map only grows with the number of keys in flight.
#[derive(Debug, Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Run `work` while holding the lock for `key`.
    pub(crate) fn with_lock<T>(&self, key: CacheKey, work: impl FnOnce() -> T) -> T {
        let slot = SlotGuard {
            locks: self,
            key,
            slot: self.acquire_slot(key),
        };
        // The guarded value is `()`, so a poisoned lock carries no broken
        // state.
        let _guard = slot.slot.lock().unwrap_or_else(PoisonError::into_inner);
        work()
    }

    fn acquire_slot(&self, key: CacheKey) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }

    fn release_slot(&self, key: CacheKey, slot: &Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map and one is ours.
        if Arc::strong_count(slot) <= 2 {
            slots.remove(&key);
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Returns a slot to the map when dropped, including during unwinding.
struct SlotGuard<'a> {
    locks: &'a KeyedLocks,
    key: CacheKey,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.locks.release_slot(self.key, &self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReachabilityQuery, TravelMode};
    use geo::Coord;
    use rstest::rstest;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn key(seconds: u32) -> CacheKey {
        ReachabilityQuery::new(Coord { x: 0.0, y: 0.0 }, TravelMode::Walk, seconds)
            .expect("valid query")
            .cache_key()
    }

    #[rstest]
    fn slots_are_released_after_use() {
        let locks = KeyedLocks::default();
        let value = locks.with_lock(key(60), || 7);
        assert_eq!(value, 7);
        assert_eq!(locks.in_flight(), 0);
    }

    #[rstest]
    fn slots_are_released_when_work_panics() {
        let locks = KeyedLocks::default();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            locks.with_lock(key(60), || panic!("routing collaborator failed"));
        }));

        assert!(outcome.is_err());
        assert_eq!(locks.in_flight(), 0);
        assert_eq!(locks.with_lock(key(60), || 3), 3);
        assert_eq!(locks.in_flight(), 0);
    }

    #[rstest]
    fn equal_keys_never_overlap() {
        let locks = KeyedLocks::default();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    locks.with_lock(key(60), || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.in_flight(), 0);
    }
}
