//! Memoized dataset loading.
//!
//! Loaded tables are kept per source identity until their time-to-live
//! runs out, then reloaded on next access. The clock is injected so expiry
//! can be driven explicitly.

use crate::table::RecordTable;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Default time-to-live of a cached table, in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Longest accepted time-to-live (roughly a century).
const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 3600;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct CachedTable {
    table: Arc<RecordTable>,
    loaded_at: DateTime<Utc>,
}

/// Tables keyed by source identity, expiring after a TTL.
pub struct DatasetCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    entries: HashMap<String, CachedTable>,
}

impl DatasetCache<SystemClock> {
    /// Cache driven by the wall clock.
    pub fn new(ttl_seconds: u64) -> Self {
        Self::with_clock(SystemClock, ttl_seconds)
    }
}

impl<C: Clock> DatasetCache<C> {
    pub fn with_clock(clock: C, ttl_seconds: u64) -> Self {
        let ttl = Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64);

        Self {
            clock,
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached table for `key`, loading it when absent or expired.
    ///
    /// A failed load leaves any previous entry untouched.
    pub fn get_or_load<F>(&mut self, key: &str, load: F) -> Result<Arc<RecordTable>>
    where
        F: FnOnce() -> Result<RecordTable>,
    {
        let now = self.clock.now();

        if let Some(cached) = self.entries.get(key) {
            if now - cached.loaded_at < self.ttl {
                debug!("Dataset cache hit: {}", key);
                return Ok(Arc::clone(&cached.table));
            }
            info!("Dataset cache entry expired: {}", key);
        }

        let table = Arc::new(load()?);
        self.entries.insert(
            key.to_string(),
            CachedTable {
                table: Arc::clone(&table),
                loaded_at: now,
            },
        );

        Ok(table)
    }

    /// Drop one entry. Returns whether it was present.
    #[allow(dead_code)] // Cache maintenance for long-lived callers
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry.
    #[allow(dead_code)] // Cache maintenance for long-lived callers
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)] // Pairs with len(); read by tests
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for a set of dataset paths.
pub fn source_key(paths: &[std::path::PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::obs;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<DateTime<Utc>>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Rc::new(Cell::new(Utc::now())))
        }

        fn advance(&self, seconds: i64) {
            self.0.set(self.0.get() + Duration::seconds(seconds));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    fn table(value: f64) -> RecordTable {
        RecordTable::new(vec![obs(2024, "870323", "Turkey_to_Poland", value)])
    }

    #[test]
    fn test_hit_within_ttl() {
        let clock = ManualClock::new();
        let mut cache = DatasetCache::with_clock(clock.clone(), 3600);
        let loads = Cell::new(0);

        let first = cache
            .get_or_load("trade.csv", || {
                loads.set(loads.get() + 1);
                Ok(table(1.0))
            })
            .unwrap();
        clock.advance(3599);
        let second = cache
            .get_or_load("trade.csv", || {
                loads.set(loads.get() + 1);
                Ok(table(2.0))
            })
            .unwrap();

        assert_eq!(loads.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reload_after_expiry() {
        let clock = ManualClock::new();
        let mut cache = DatasetCache::with_clock(clock.clone(), 60);

        let first = cache.get_or_load("k", || Ok(table(1.0))).unwrap();
        clock.advance(60);
        let second = cache.get_or_load("k", || Ok(table(2.0))).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.rows().iter().next().unwrap().value, 2.0);
        // The old handle stays valid.
        assert_eq!(first.rows().iter().next().unwrap().value, 1.0);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = DatasetCache::with_clock(ManualClock::new(), 3600);
        cache.get_or_load("a", || Ok(table(1.0))).unwrap();
        cache.get_or_load("b", || Ok(table(1.0))).unwrap();
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        let reloaded = cache.get_or_load("a", || Ok(table(5.0))).unwrap();
        assert_eq!(reloaded.rows().iter().next().unwrap().value, 5.0);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut cache = DatasetCache::with_clock(ManualClock::new(), 3600);
        let result = cache.get_or_load("bad", || Err(anyhow::anyhow!("unreadable")));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_source_key() {
        let key = source_key(&["a.csv".into(), "b.csv".into()]);
        assert_eq!(key, "a.csv;b.csv");
    }
}
