// src/cache.rs
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// In-process memo with a fixed time-to-live. Entries are checked lazily on
/// read; an expired entry is dropped and reported as a miss.
pub struct TtlCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (DateTime<Utc>, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock, entries: Mutex::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let (stored, v) = entries.get(key)?;
        if now - *stored < self.ttl {
            return Some(v.clone());
        }
        entries.remove(key);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        self.entries.lock().insert(key, (now, value));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()))
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let clock = clock();
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::minutes(10), clock.clone());
        cache.insert("usdc-v3".into(), 7);

        clock.advance(Duration::minutes(9));
        assert_eq!(cache.get(&"usdc-v3".to_string()), Some(7));

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get(&"usdc-v3".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_are_independent_and_reinsert_refreshes() {
        let clock = clock();
        let cache: TtlCache<&'static str, u32> = TtlCache::new(Duration::minutes(10), clock.clone());
        cache.insert("a", 1);
        clock.advance(Duration::minutes(5));
        cache.insert("b", 2);
        clock.advance(Duration::minutes(6));

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));

        cache.insert("b", 3);
        clock.advance(Duration::minutes(9));
        assert_eq!(cache.get(&"b"), Some(3));
        assert_eq!(cache.get(&"missing"), None);
    }
}
