//! Thread-safe watermark cache.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────┐
//!   │                      Cache<K, V, S, E>                            │
//!   │                                                                   │
//!   │   config: WatermarkConfig   (copied out, read without locking)    │
//!   │                                                                   │
//!   │   inner: Arc<RwLock<WatermarkCore<K, V, S, E>>>                   │
//!   │            │                                                      │
//!   │            ├── read  ─► peek, contains, visit, len, FIFO lookups  │
//!   │            └── write ─► inserts, erase, pop_front, clear,         │
//!   │                          LRU lookups with touch                   │
//!   └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every public operation takes the lock exactly once and holds it for the
//! whole call, so bulk operations are atomic with respect to other threads.
//! `parking_lot`'s `RwLock` is task-fair: a steady stream of readers cannot
//! starve a writer and vice versa.
//!
//! Values are shared as `Arc<V>`. A handle returned by a lookup stays valid
//! after the entry is evicted, erased or cleared.
//!
//! ## Lock mode of lookups
//!
//! | Policy | `touch` | Lock  | Reorders |
//! |--------|---------|-------|----------|
//! | LRU    | `true`  | write | yes      |
//! | LRU    | `false` | read  | no       |
//! | FIFO   | any     | read  | no       |
//!
//! ## Callbacks
//!
//! The post-eviction callback runs on the mutating thread while the write
//! lock is held. Calling back into the same cache from it deadlocks.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use watermark_cache::{Cache, EvictionPolicy};
//!
//! let cache: Cache<u32, String> = Cache::with_watermarks(EvictionPolicy::Lru, 64, 128).unwrap();
//!
//! let handles: Vec<_> = (0..4u32)
//!     .map(|t| {
//!         let cache = cache.clone();
//!         thread::spawn(move || {
//!             for i in 0..16 {
//!                 cache.insert(t * 100 + i, format!("t{t}-{i}"));
//!             }
//!         })
//!     })
//!     .collect();
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//!
//! assert_eq!(cache.len(), 64);
//! assert_eq!(cache.get(&301).as_deref().map(String::as_str), Some("t3-1"));
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::config::WatermarkConfig;
use crate::core::WatermarkCore;
use crate::error::{BulkInsertError, ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider};
use crate::policy::EvictionPolicy;
use crate::traits::{ConcurrentCache, DefaultEquality, KeyEquality, PostEvictionCallback};
use crate::DefaultHashBuilder;

/// Thread-safe key-value cache with low/high watermark eviction.
///
/// Cloning is cheap and yields another handle to the same cache.
pub struct Cache<K, V, S = DefaultHashBuilder, E = DefaultEquality> {
    inner: Arc<RwLock<WatermarkCore<K, V, S, E>>>,
    config: WatermarkConfig,
}

impl<K, V, S, E> Clone for Cache<K, V, S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config,
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq,
{
    /// Creates an LRU cache that never evicts.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::{Cache, EvictionPolicy};
    ///
    /// let cache: Cache<u32, u32> = Cache::new();
    /// assert_eq!(cache.eviction_policy(), EvictionPolicy::Lru);
    /// assert_eq!(cache.high_watermark(), usize::MAX);
    /// ```
    pub fn new() -> Self {
        Self::from_core(WatermarkCore::new())
    }

    /// Creates a cache with the given policy and watermarks.
    ///
    /// Fails unless `1 <= low_watermark <= high_watermark`.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::{Cache, EvictionPolicy};
    ///
    /// let cache: Cache<u32, u32> = Cache::with_watermarks(EvictionPolicy::Fifo, 2, 3).unwrap();
    /// assert_eq!(cache.low_watermark(), 2);
    ///
    /// assert!(Cache::<u32, u32>::with_watermarks(EvictionPolicy::Fifo, 0, 3).is_err());
    /// ```
    pub fn with_watermarks(
        policy: EvictionPolicy,
        low_watermark: usize,
        high_watermark: usize,
    ) -> Result<Self, ConfigError> {
        Self::with_config(WatermarkConfig::new(policy, low_watermark, high_watermark))
    }

    /// Creates a cache from a prepared configuration.
    pub fn with_config(config: WatermarkConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_core(WatermarkCore::with_config(config)?))
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, E> From<WatermarkCore<K, V, S, E>> for Cache<K, V, S, E> {
    fn from(core: WatermarkCore<K, V, S, E>) -> Self {
        Self::from_core(core)
    }
}

impl<K, V, S, E> Cache<K, V, S, E> {
    /// Creates a cache with an injected hasher and key equality.
    ///
    /// Keys that `equality` considers equal must hash equally under `hasher`.
    pub fn with_hasher_and_equality(
        policy: EvictionPolicy,
        low_watermark: usize,
        high_watermark: usize,
        hasher: S,
        equality: E,
    ) -> Result<Self, ConfigError> {
        let config = WatermarkConfig::new(policy, low_watermark, high_watermark);
        Ok(Self::from_core(WatermarkCore::with_hasher_and_equality(
            config, hasher, equality,
        )?))
    }

    /// Wraps an engine, keeping its entries and callback.
    pub fn from_core(core: WatermarkCore<K, V, S, E>) -> Self {
        let config = core.config();
        Self {
            inner: Arc::new(RwLock::new(core)),
            config,
        }
    }

    /// Eviction policy. Does not lock.
    #[inline]
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.config.policy
    }

    /// Low watermark. Does not lock.
    #[inline]
    pub fn low_watermark(&self) -> usize {
        self.config.low_watermark
    }

    /// High watermark. Does not lock.
    #[inline]
    pub fn high_watermark(&self) -> usize {
        self.config.high_watermark
    }

    /// Policy and watermarks. Does not lock.
    #[inline]
    pub fn config(&self) -> WatermarkConfig {
        self.config
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// A copy of the hasher.
    pub fn hash_function(&self) -> S
    where
        S: Clone,
    {
        self.inner.read().hasher().clone()
    }

    /// A copy of the key equality.
    pub fn equal_function(&self) -> E
    where
        E: Clone,
    {
        self.inner.read().key_equality().clone()
    }

    /// Installs the hook called for each value leaving through eviction,
    /// `erase`, `erase_bulk` or `pop_front`. Replaces any previous hook.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    /// use watermark_cache::{Cache, EvictionPolicy};
    ///
    /// let cache: Cache<u32, u32> = Cache::with_watermarks(EvictionPolicy::Fifo, 1, 1).unwrap();
    /// let evicted = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&evicted);
    /// cache.set_post_eviction_callback(move |_: &Arc<u32>| {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    /// });
    ///
    /// cache.insert(1, 10);
    /// cache.insert(2, 20);
    /// assert_eq!(evicted.load(Ordering::SeqCst), 1);
    /// ```
    pub fn set_post_eviction_callback<F>(&self, callback: F)
    where
        F: PostEvictionCallback<V> + 'static,
    {
        self.inner.write().set_post_eviction_callback(callback);
    }

    /// Removes the post-eviction hook.
    pub fn clear_post_eviction_callback(&self) {
        self.inner.write().clear_post_eviction_callback();
    }

    /// Drops every entry without calling the post-eviction hook.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Calls `visitor` on each entry in eviction order, stopping when it
    /// returns `false`. Holds the read lock for the whole walk.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::{Cache, EvictionPolicy};
    ///
    /// let cache: Cache<u32, u32> = Cache::with_watermarks(EvictionPolicy::Fifo, 8, 8).unwrap();
    /// for k in 0..5 {
    ///     cache.insert(k, k * k);
    /// }
    ///
    /// let mut firsts = Vec::new();
    /// cache.visit(|k, v| {
    ///     firsts.push((*k, *v));
    ///     firsts.len() < 2
    /// });
    /// assert_eq!(firsts, vec![(0, 0), (1, 1)]);
    /// ```
    pub fn visit<F>(&self, visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.inner.read().visit(visitor);
    }

    /// Keys in eviction order (next victim first).
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.read().iter().map(|(k, _)| k.clone()).collect()
    }
}

impl<K, V, S, E> Cache<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEquality<K>,
{
    /// Inserts or replaces `key`, returning `true` if it was not present.
    ///
    /// If the size has reached the high watermark, entries are evicted from
    /// the head of the queue until the size is below the low watermark,
    /// before the new entry is applied. This happens for replacements too.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::{Cache, EvictionPolicy};
    ///
    /// let cache: Cache<&str, i32> = Cache::with_watermarks(EvictionPolicy::Lru, 2, 3).unwrap();
    /// assert!(cache.insert("a", 1));
    /// assert!(!cache.insert("a", 2));
    /// assert_eq!(cache.peek(&"a").as_deref(), Some(&2));
    /// ```
    pub fn insert(&self, key: K, value: V) -> bool {
        let value = Arc::new(value);
        self.inner.write().insert(key, value)
    }

    /// Inserts an already shared value.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use watermark_cache::Cache;
    ///
    /// let cache: Cache<u32, String> = Cache::new();
    /// let shared = Arc::new("payload".to_string());
    /// cache.insert_arc(1, Arc::clone(&shared));
    /// assert!(Arc::ptr_eq(&cache.get(&1).unwrap(), &shared));
    /// ```
    pub fn insert_arc(&self, key: K, value: Arc<V>) -> bool {
        self.inner.write().insert(key, value)
    }

    /// Builds the value with `make` and inserts it.
    ///
    /// If `make` fails, the error is returned and the cache is untouched:
    /// no eviction runs and no entry changes. `make` runs before the lock is
    /// taken.
    pub fn try_insert_with<F, Err>(&self, key: K, make: F) -> Result<bool, Err>
    where
        F: FnOnce() -> Result<V, Err>,
    {
        let value = Arc::new(make()?);
        Ok(self.inner.write().insert(key, value))
    }

    /// Inserts every pair under one write lock, in iteration order, with the
    /// same eviction step per item as [`insert`](Self::insert).
    ///
    /// Returns the number of keys that were newly inserted.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use watermark_cache::Cache;
    ///
    /// let cache: Cache<u32, u32> = Cache::new();
    /// let added = cache.insert_bulk(vec![(1, Arc::new(1)), (2, Arc::new(2)), (1, Arc::new(3))]);
    /// assert_eq!(added, 2);
    /// assert_eq!(cache.len(), 2);
    /// ```
    pub fn insert_bulk<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = (K, Arc<V>)>,
    {
        let mut core = self.inner.write();
        let mut inserted = 0;
        for (key, value) in items {
            if core.insert(key, value) {
                inserted += 1;
            }
        }
        trace!(inserted, "bulk insert finished");
        inserted
    }

    /// Like [`insert_bulk`](Self::insert_bulk), copying keys out of a slice.
    pub fn insert_bulk_cloned(&self, items: &[(K, Arc<V>)]) -> usize
    where
        K: Clone,
    {
        self.insert_bulk(
            items
                .iter()
                .map(|(key, value)| (key.clone(), Arc::clone(value))),
        )
    }

    /// Inserts `(key, raw)` pairs, building each value with `make` under one
    /// write lock.
    ///
    /// Stops at the first `make` failure. Items before it stay inserted; the
    /// error reports how many new keys they added.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::Cache;
    ///
    /// let cache: Cache<u32, u32> = Cache::new();
    /// let items = vec![(1, "10"), (2, "x"), (3, "30")];
    /// let err = cache
    ///     .try_insert_bulk_with(items, |raw| raw.parse::<u32>())
    ///     .unwrap_err();
    /// assert_eq!(err.inserted(), 1);
    /// assert!(cache.contains(&1));
    /// assert!(!cache.contains(&3));
    /// ```
    pub fn try_insert_bulk_with<I, T, F, Err>(
        &self,
        items: I,
        mut make: F,
    ) -> Result<usize, BulkInsertError<Err>>
    where
        I: IntoIterator<Item = (K, T)>,
        F: FnMut(T) -> Result<V, Err>,
    {
        let mut core = self.inner.write();
        let mut inserted = 0;
        for (key, raw) in items {
            let value = match make(raw) {
                Ok(value) => Arc::new(value),
                Err(err) => return Err(BulkInsertError::new(inserted, err)),
            };
            if core.insert(key, value) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Looks up `key`.
    ///
    /// Under LRU with `touch` the entry moves to the tail and the call takes
    /// the write lock; every other combination takes the read lock.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::{Cache, EvictionPolicy};
    ///
    /// let cache: Cache<u32, &str> = Cache::with_watermarks(EvictionPolicy::Lru, 2, 3).unwrap();
    /// cache.insert(1, "a");
    /// cache.insert(2, "b");
    /// cache.insert(3, "c");
    ///
    /// assert!(cache.try_get_value(&1, true).is_some());
    /// cache.insert(4, "d");
    ///
    /// // 2 and 3 were drained; the touched key survived.
    /// assert_eq!(cache.keys(), vec![1, 4]);
    /// ```
    pub fn try_get_value(&self, key: &K, touch: bool) -> Option<Arc<V>> {
        if self.config.policy.reorders_on_lookup(touch) {
            self.inner.write().try_get_value(key, true).cloned()
        } else {
            self.inner.read().peek(key).cloned()
        }
    }

    /// Looks up `key`, touching it under LRU.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.try_get_value(key, true)
    }

    /// Looks up `key` without changing eviction order. Always a read lock.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.inner.read().peek(key).cloned()
    }

    /// Returns `true` if `key` is present. Never reorders.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().contains(key)
    }

    /// Removes `key`, calling the post-eviction hook with its value.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::Cache;
    ///
    /// let cache: Cache<u32, String> = Cache::new();
    /// cache.insert(1, "one".to_string());
    /// assert_eq!(cache.erase(&1).as_deref().map(String::as_str), Some("one"));
    /// assert!(cache.erase(&1).is_none());
    /// ```
    pub fn erase(&self, key: &K) -> Option<Arc<V>> {
        self.inner.write().remove(key)
    }

    /// Removes each key under one write lock; returns how many were present.
    ///
    /// A key listed twice is counted once.
    pub fn erase_bulk<'a, I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut core = self.inner.write();
        keys.into_iter()
            .filter(|key| core.remove(key).is_some())
            .count()
    }

    /// Removes the entry at the head of the eviction queue, calling the
    /// post-eviction hook with its value.
    ///
    /// # Example
    ///
    /// ```
    /// use watermark_cache::{Cache, EvictionPolicy};
    ///
    /// let cache: Cache<u32, u32> = Cache::with_watermarks(EvictionPolicy::Fifo, 4, 4).unwrap();
    /// cache.insert(1, 10);
    /// cache.insert(2, 20);
    /// let (key, value) = cache.pop_front().unwrap();
    /// assert_eq!((key, *value), (1, 10));
    /// ```
    pub fn pop_front(&self) -> Option<(K, Arc<V>)> {
        self.inner.write().pop_front()
    }

    /// Verifies the hash index and eviction queue agree. Takes the read lock.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants()
    }
}

impl<K, V, S, E> fmt::Debug for Cache<K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.read();
        f.debug_struct("Cache")
            .field("len", &core.len())
            .field("policy", &self.config.policy)
            .field("low_watermark", &self.config.low_watermark)
            .field("high_watermark", &self.config.high_watermark)
            .finish_non_exhaustive()
    }
}

impl<K, V, S, E> ConcurrentCache for Cache<K, V, S, E>
where
    K: Send + Sync,
    V: Send + Sync,
    S: Send + Sync,
    E: Send + Sync,
{
}

#[cfg(feature = "metrics")]
impl<K, V, S, E> Cache<K, V, S, E> {
    /// Current counters and gauges.
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.read().metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S, E> MetricsSnapshotProvider<CacheMetricsSnapshot> for Cache<K, V, S, E> {
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S, E> MetricsReset for Cache<K, V, S, E> {
    fn reset_metrics(&self) {
        self.inner.read().reset_metrics();
    }
}
