//! Per-key mutual exclusion.
//!
//! Slots are created on demand and dropped once no thread holds or waits
//! on them, so the map only grows with the number of keys in flight.

use crate::error::StoreResult;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

pub struct KeyLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> Default for KeyLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> KeyLocks<K> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> StoreResult<R>) -> StoreResult<R> {
        let slot = {
            let mut slots = self.slots.lock()?;
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let result = {
            let _guard = slot.lock()?;
            f()
        };

        let mut slots = self.slots.lock()?;
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
        result
    }

    /// Number of keys currently locked or waited on.
    pub fn in_flight(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyLocks::<String>::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks
                        .with_lock(&"k".to_string(), || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.in_flight(), 0);
    }

    #[test]
    fn test_result_is_passed_through() {
        let locks = KeyLocks::<u32>::new();
        assert_eq!(locks.with_lock(&1, || Ok(7)).unwrap(), 7);
        assert_eq!(locks.in_flight(), 0);
    }
}
