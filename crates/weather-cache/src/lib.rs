//! Two-horizon (fresh/stale) TTL cache with oldest-first eviction.
//!
//! Callers see three windows of a cache entry's life:
//! - **fresh** (`age <= ttl`): returned by [`Cache::get_fresh`].
//! - **stale** (`ttl < age <= stale_max_age`): returned only by
//!   [`Cache::get_any`], with `stale: true` metadata, for use as a
//!   fallback when upstream is unavailable.
//! - **expired** (`age > stale_max_age`): invisible to every accessor, as
//!   if the entry did not exist. Cleanup happens lazily on access, which
//!   satisfies the visibility contract without a background sweep thread.

mod key;
mod store;

pub use key::CacheKey;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use weather_core::Clock;

use store::WriteOrderedStore;

/// Tunables for a [`Cache`] instance. Defaults match spec §4.6.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Window within which an entry is considered fresh.
    pub ttl: Duration,
    /// Window within which a stale entry may still be served as a fallback.
    pub stale_max_age: Duration,
    /// Maximum number of distinct keys retained at once.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            stale_max_age: Duration::from_secs(3600),
            max_entries: 1000,
        }
    }
}

struct Entry {
    payload: Value,
    created_at: f64,
}

/// Where a served payload came from, surfaced to clients in response
/// metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Served within the fresh (`ttl`) window.
    Cache,
    /// Served within the stale window, as a fallback.
    CacheFallback,
}

/// Freshness metadata accompanying a cache hit.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetadata {
    pub cached: bool,
    pub stale: bool,
    pub age_seconds: f64,
    pub source: CacheSource,
}

/// A key→entry store with dual fresh/stale horizons, bounded size, and
/// oldest-first eviction.
///
/// All operations take `&self` (interior mutability via a single mutex) so
/// the cache can be shared across request handlers behind an `Arc` without
/// an async lock — critical sections are short enough that blocking a
/// worker thread briefly is the pragmatic choice, matching spec §5's
/// "short critical sections" guarantee.
pub struct Cache<C: Clock> {
    clock: Arc<C>,
    config: CacheConfig,
    inner: Mutex<WriteOrderedStore<CacheKey, Entry>>,
}

impl<C: Clock> Cache<C> {
    /// Creates a cache with the given clock and configuration.
    pub fn new(clock: Arc<C>, config: CacheConfig) -> Self {
        Self {
            clock,
            inner: Mutex::new(WriteOrderedStore::new(config.max_entries)),
            config,
        }
    }

    /// Returns the payload for `key` if a fresh (`age <= ttl`) entry exists.
    pub fn get_fresh(&self, key: &CacheKey) -> Option<Value> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap();

        let entry = inner.get(key)?;
        let age = now - entry.created_at;

        if age > self.config.stale_max_age.as_secs_f64() {
            inner.remove(key);
            return None;
        }
        if age > self.config.ttl.as_secs_f64() {
            return None;
        }
        Some(inner.get(key).unwrap().payload.clone())
    }

    /// Returns the payload and freshness metadata for `key` if an entry
    /// exists within the stale window (`age <= stale_max_age`), fresh or
    /// not.
    pub fn get_any(&self, key: &CacheKey) -> Option<(Value, CacheMetadata)> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap();

        let entry = inner.get(key)?;
        let age = now - entry.created_at;

        if age > self.config.stale_max_age.as_secs_f64() {
            inner.remove(key);
            return None;
        }

        let stale = age > self.config.ttl.as_secs_f64();
        let entry = inner.get(key).unwrap();
        let metadata = CacheMetadata {
            cached: true,
            stale,
            age_seconds: age,
            source: if stale {
                CacheSource::CacheFallback
            } else {
                CacheSource::Cache
            },
        };
        Some((entry.payload.clone(), metadata))
    }

    /// Inserts `payload` under `key`, stamped with the current time.
    /// Replaces any prior entry for `key`. If the cache is at capacity and
    /// `key` is new, evicts the entry with the smallest `created_at`
    /// first.
    pub fn put(&self, key: CacheKey, payload: Value) {
        let created_at = self.clock.now();
        let mut inner = self.inner.lock().unwrap();
        let evicted = inner.insert(key, Entry { payload, created_at });
        if let Some((evicted_key, _)) = evicted {
            tracing::debug!(key = %evicted_key, "cache: evicted oldest entry");
        }
    }

    /// The current number of entries (including any not yet lazily
    /// cleaned up, though such entries are never observable via
    /// `get_fresh`/`get_any`).
    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::FakeClock;

    fn cache(config: CacheConfig) -> Cache<FakeClock> {
        Cache::new(Arc::new(FakeClock::new()), config)
    }

    #[test]
    fn fresh_hit_then_expiry_at_ttl_boundary() {
        let clock = Arc::new(FakeClock::new());
        let cache = Cache::new(
            Arc::clone(&clock),
            CacheConfig {
                ttl: Duration::from_secs(300),
                stale_max_age: Duration::from_secs(3600),
                max_entries: 10,
            },
        );
        let key = CacheKey::new("paris");
        cache.put(key.clone(), serde_json::json!({"temp": 20}));

        clock.set(300.0);
        assert!(cache.get_fresh(&key).is_some(), "exactly at ttl is still fresh");

        clock.set(300.001);
        assert!(cache.get_fresh(&key).is_none(), "just past ttl is not fresh");

        let (_, meta) = cache.get_any(&key).expect("still within stale window");
        assert!(meta.stale);
        assert_eq!(meta.source, CacheSource::CacheFallback);

        clock.set(3600.001);
        assert!(cache.get_any(&key).is_none(), "past stale_max_age is absent");
    }

    #[test]
    fn eviction_removes_exactly_the_oldest_entry() {
        let clock = Arc::new(FakeClock::new());
        let cache = Cache::new(
            Arc::clone(&clock),
            CacheConfig {
                ttl: Duration::from_secs(300),
                stale_max_age: Duration::from_secs(3600),
                max_entries: 3,
            },
        );

        for (i, city) in ["a", "b", "c"].iter().enumerate() {
            clock.set(i as f64);
            cache.put(CacheKey::new(city), serde_json::json!(i));
        }
        clock.set(10.0);
        cache.put(CacheKey::new("d"), serde_json::json!(3));

        assert_eq!(cache.size(), 3);
        assert!(cache.get_any(&CacheKey::new("a")).is_none());
        assert!(cache.get_any(&CacheKey::new("b")).is_some());
        assert!(cache.get_any(&CacheKey::new("c")).is_some());
        assert!(cache.get_any(&CacheKey::new("d")).is_some());
    }

    #[test]
    fn put_replaces_prior_entry_and_resets_age() {
        let clock = Arc::new(FakeClock::new());
        let cache = Cache::new(
            Arc::clone(&clock),
            CacheConfig {
                ttl: Duration::from_secs(10),
                stale_max_age: Duration::from_secs(100),
                max_entries: 10,
            },
        );
        let key = CacheKey::new("paris");
        cache.put(key.clone(), serde_json::json!({"temp": 10}));
        clock.set(20.0);
        assert!(cache.get_fresh(&key).is_none());

        cache.put(key.clone(), serde_json::json!({"temp": 30}));
        let fresh = cache.get_fresh(&key).unwrap();
        assert_eq!(fresh["temp"], 30);
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn idempotent_reads_do_not_mutate_state() {
        let cache = cache(CacheConfig::default());
        let key = CacheKey::new("paris");
        cache.put(key.clone(), serde_json::json!({"temp": 1}));
        let first = cache.get_fresh(&key);
        let second = cache.get_fresh(&key);
        assert_eq!(first, second);
    }
}
