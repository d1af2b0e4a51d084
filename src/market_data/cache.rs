use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::types::TickerSnapshot;

struct Entry {
    snapshot: TickerSnapshot,
    fetched_at: Instant,
}

/// Per-ticker TTL cache fronting the quote source cascade. Single `parking_lot::Mutex<HashMap>`
/// rather than a sharded cache, matching the scale a small in-memory repository operates at.
pub struct TickerCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl TickerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached snapshot for `symbol` if present and not yet expired.
    pub fn get(&self, symbol: &str) -> Option<TickerSnapshot> {
        let entries = self.entries.lock();
        entries.get(symbol).and_then(|entry| {
            if entry.fetched_at.elapsed() <= self.ttl {
                Some(entry.snapshot.clone())
            } else {
                None
            }
        })
    }

    pub fn put(&self, snapshot: TickerSnapshot) {
        self.entries.lock().insert(
            snapshot.symbol.clone(),
            Entry {
                snapshot,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Removes entries whose TTL has elapsed. Called opportunistically by the prefetch loop
    /// rather than on a dedicated timer, since a stale-but-unused entry costs only memory.
    pub fn evict_expired(&self) {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.fetched_at.elapsed() <= self.ttl);
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

    #[test]
    fn returns_fresh_entry() {
        let cache = TickerCache::new(Duration::from_secs(60));
        cache.put(TickerSnapshot::new("AAPL", 150.0));
        assert_eq!(cache.get("AAPL").unwrap().price, 150.0);
    }

    #[test]
    fn missing_entry_returns_none() {
        let cache = TickerCache::new(Duration::from_secs(60));
        assert!(cache.get("AAPL").is_none());
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = TickerCache::new(Duration::from_millis(0));
        cache.put(TickerSnapshot::new("AAPL", 150.0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("AAPL").is_none());
    }

    #[test]
    fn evict_expired_removes_stale_entries() {
        let cache = TickerCache::new(Duration::from_millis(0));
        cache.put(TickerSnapshot::new("AAPL", 150.0));
        std::thread::sleep(Duration::from_millis(5));
        cache.evict_expired();
        assert!(cache.is_empty());
    }
}
