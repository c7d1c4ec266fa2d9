//! TTL cache for verified results.
//!
//! Caches high-confidence verification records so repeated requests for the
//! same plan within the timeout skip the model round-trip entirely.
//!
//! Expiry is lazy: a stale entry is evicted by the lookup that finds it.
//! There is no size bound, so a stream of distinct keys grows the table until
//! those entries are looked up again after expiring.

use super::record::{PlanDescriptor, VerificationRecord};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for cached records (1 hour).
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Deterministic fingerprint of a verification request.
///
/// Joins provider URL, plan name, download and upload speed with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Fingerprint for verifying `plan` at `provider_url`.
    #[must_use]
    pub fn new(provider_url: &str, plan: &PlanDescriptor) -> Self {
        Self(format!(
            "{}_{}_{}_{}",
            provider_url, plan.providers_plan_name, plan.download_speed, plan.upload_speed
        ))
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct CacheEntry {
    record: VerificationRecord,
    stored_at: Instant,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Fresh entry found.
    Hit {
        /// The cached record.
        record: VerificationRecord,
        /// Age of the entry.
        age: Duration,
    },
    /// Stale entry found and evicted.
    Expired {
        /// Age of the evicted entry.
        age: Duration,
    },
    /// No entry.
    Miss,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries evicted because they expired.
    pub expirations: u64,
    /// Number of entries added.
    pub additions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Process-wide table of verified records.
///
/// Cloning shares the underlying table. Each operation holds the lock for its
/// whole read-evict or write, so concurrent calls never observe a torn entry.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
    stats: Arc<Mutex<CacheStats>>,
    timeout: Duration,
}

impl ResultCache {
    /// Create a cache with the default one-hour timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_CACHE_TIMEOUT)
    }

    /// Create a cache whose entries expire after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(Mutex::new(CacheStats::default())),
            timeout,
        }
    }

    /// Configured time-to-live.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up `key`, evicting the entry if it has expired.
    pub fn lookup(&self, key: &CacheKey) -> CacheLookup {
        let mut cache = self.inner.lock();
        let outcome = match cache.get(key) {
            Some(entry) => {
                let age = entry.stored_at.elapsed();
                if age < self.timeout {
                    CacheLookup::Hit {
                        record: entry.record.clone(),
                        age,
                    }
                } else {
                    cache.remove(key);
                    CacheLookup::Expired { age }
                }
            }
            None => CacheLookup::Miss,
        };
        drop(cache);

        let mut stats = self.stats.lock();
        match outcome {
            CacheLookup::Hit { .. } => stats.hits += 1,
            CacheLookup::Expired { .. } => {
                stats.misses += 1;
                stats.expirations += 1;
            }
            CacheLookup::Miss => stats.misses += 1,
        }

        outcome
    }

    /// Fresh record for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<VerificationRecord> {
        match self.lookup(key) {
            CacheLookup::Hit { record, .. } => Some(record),
            CacheLookup::Expired { .. } | CacheLookup::Miss => None,
        }
    }

    /// Store `record` under `key`, replacing any previous entry.
    ///
    /// Callers decide what qualifies; see [`VerificationRecord::is_cacheable`].
    pub fn put(&self, key: CacheKey, record: VerificationRecord) {
        let mut cache = self.inner.lock();
        cache.insert(
            key,
            CacheEntry {
                record,
                stored_at: Instant::now(),
            },
        );

        let mut stats = self.stats.lock();
        stats.additions += 1;
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Get the current number of entries in the cache, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
