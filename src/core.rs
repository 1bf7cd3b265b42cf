//! # Watermark Cache Engine
//!
//! Single-threaded engine behind [`Cache`](crate::cache::Cache): a hash index
//! and an eviction queue kept in lockstep, plus the low/high watermark
//! eviction algorithm.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                     WatermarkCore<K, V, S, E>                        │
//!   │                                                                      │
//!   │   index: HashTable<SlotId>          queue: IntrusiveList<Entry>      │
//!   │   ┌──────────────────────┐          ┌──────────────────────────────┐ │
//!   │   │ hash(k1) ─► SlotId 0 │ ───────► │ 0: Entry { k1, Arc<V>, h1 }  │ │
//!   │   │ hash(k2) ─► SlotId 2 │ ───────► │ 2: Entry { k2, Arc<V>, h2 }  │ │
//!   │   │ hash(k3) ─► SlotId 1 │ ───────► │ 1: Entry { k3, Arc<V>, h3 }  │ │
//!   │   └──────────────────────┘          └──────────────────────────────┘ │
//!   │                                       head (victim) ─► ... ─► tail   │
//!   │                                                                      │
//!   │   hasher: S (BuildHasher)   equality: E (KeyEquality<K>)             │
//!   │   config: WatermarkConfig   callback: Option<Box<dyn ...>>           │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index stores only `SlotId`s; keys and values live in the queue nodes,
//! and lookups compare candidate keys through the queue with the injected
//! equality.
//!
//! ## Watermark eviction
//!
//! ```text
//!   insert(k, v)
//!     │
//!     ├─ len < high ─────────────────────────────┐
//!     │                                          │
//!     └─ len >= high ─► drain:                   │
//!          while len >= low && len > 0:          │
//!              pop queue head, notify callback   │
//!                                                ▼
//!                                   upsert k (new ─► tail, existing ─► tail)
//! ```
//!
//! The drain runs before the entry is applied, on every insertion call,
//! whether the key turns out to be new or not. Lookups, `remove`, and
//! `pop_front` never evict.
//!
//! ## Failure safety
//!
//! Every queue node caches the hash of its key. Growing or rehashing the
//! index and unlinking an entry read that cached hash, so the user hasher and
//! key equality only run before an operation has changed anything. A new key
//! is appended to the queue and then committed to the index under an
//! [`AppendGuard`](crate::ds::AppendGuard); unwinding between the two steps
//! pops the append. Values leave both structures before the callback runs, so
//! a panicking callback also leaves a consistent engine.
//!
//! ## Thread Safety
//!
//! `WatermarkCore` is **not** synchronized. Share it through
//! [`Cache`](crate::cache::Cache), which wraps it in a `parking_lot::RwLock`.

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use hashbrown::HashTable;
use tracing::{debug, trace, warn};

use crate::config::WatermarkConfig;
use crate::ds::{IntrusiveList, SlotId};
use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::WatermarkMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{
    CoreMetricsRecorder, MetricsReset, MetricsSnapshotProvider, WatermarkMetricsRecorder,
};
use crate::policy::EvictionPolicy;
use crate::traits::{DefaultEquality, KeyEquality, PostEvictionCallback};
use crate::DefaultHashBuilder;

/// One live cache entry, stored in the eviction queue.
#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: Arc<V>,
    /// `hasher.hash_one(&key)`, computed once on insertion.
    hash: u64,
}

type Queue<K, V> = IntrusiveList<Entry<K, V>>;

/// Single-threaded watermark cache engine.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use watermark_cache::{EvictionPolicy, WatermarkConfig, WatermarkCore};
///
/// let config = WatermarkConfig::new(EvictionPolicy::Fifo, 2, 3);
/// let mut core: WatermarkCore<&str, i32> = WatermarkCore::with_config(config).unwrap();
///
/// assert!(core.insert("a", Arc::new(1)));
/// assert!(core.insert("b", Arc::new(2)));
/// assert!(core.insert("c", Arc::new(3)));
///
/// // Size reached the high watermark: the next insert drains to below 2 first.
/// assert!(core.insert("d", Arc::new(4)));
/// assert_eq!(core.len(), 2);
/// assert!(!core.contains(&"a"));
/// assert!(!core.contains(&"b"));
/// ```
pub struct WatermarkCore<K, V, S = DefaultHashBuilder, E = DefaultEquality> {
    index: HashTable<SlotId>,
    queue: Queue<K, V>,
    hasher: S,
    equality: E,
    config: WatermarkConfig,
    callback: Option<Box<dyn PostEvictionCallback<V>>>,
    #[cfg(feature = "metrics")]
    metrics: WatermarkMetrics,
}

impl<K, V> WatermarkCore<K, V>
where
    K: Hash + Eq,
{
    /// Creates an unbounded LRU engine with the default hasher and `Eq`.
    pub fn new() -> Self {
        Self::from_parts(
            WatermarkConfig::default(),
            DefaultHashBuilder::default(),
            DefaultEquality,
        )
    }

    /// Creates an engine with the given policy and watermarks.
    pub fn with_config(config: WatermarkConfig) -> Result<Self, ConfigError> {
        Self::with_hasher_and_equality(config, DefaultHashBuilder::default(), DefaultEquality)
    }
}

impl<K, V> Default for WatermarkCore<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, E> WatermarkCore<K, V, S, E> {
    /// Creates an engine with an injected hasher and key equality.
    pub fn with_hasher_and_equality(
        config: WatermarkConfig,
        hasher: S,
        equality: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, hasher, equality))
    }

    fn from_parts(config: WatermarkConfig, hasher: S, equality: E) -> Self {
        Self {
            index: HashTable::new(),
            queue: IntrusiveList::new(),
            hasher,
            equality,
            config,
            callback: None,
            #[cfg(feature = "metrics")]
            metrics: WatermarkMetrics::new(),
        }
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if the engine holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Policy and watermarks fixed at construction.
    #[inline]
    pub fn config(&self) -> WatermarkConfig {
        self.config
    }

    #[inline]
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.config.policy
    }

    #[inline]
    pub fn low_watermark(&self) -> usize {
        self.config.low_watermark
    }

    #[inline]
    pub fn high_watermark(&self) -> usize {
        self.config.high_watermark
    }

    /// The hasher used by the index.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// The key equality used by the index.
    pub fn key_equality(&self) -> &E {
        &self.equality
    }

    /// Installs the hook called for every value leaving through eviction,
    /// `remove`, or `pop_front`. Replaces any previous hook.
    pub fn set_post_eviction_callback<F>(&mut self, callback: F)
    where
        F: PostEvictionCallback<V> + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub(crate) fn set_boxed_post_eviction_callback(
        &mut self,
        callback: Box<dyn PostEvictionCallback<V>>,
    ) {
        self.callback = Some(callback);
    }

    /// Removes the post-eviction hook.
    pub fn clear_post_eviction_callback(&mut self) {
        self.callback = None;
    }

    /// Returns `true` if a post-eviction hook is installed.
    pub fn has_post_eviction_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Drops every entry. The post-eviction hook is **not** called.
    pub fn clear(&mut self) {
        let dropped = self.len();
        self.index.clear();
        self.queue.clear();
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
        trace!(dropped, "cache cleared without eviction callbacks");
    }

    /// Iterates entries in eviction order (next victim first).
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Arc<V>)> {
        self.queue.iter().map(|entry| (&entry.key, &entry.value))
    }

    /// Calls `visitor` on each entry in eviction order until it returns `false`.
    pub fn visit<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for entry in self.queue.iter() {
            if !visitor(&entry.key, &entry.value) {
                break;
            }
        }
    }

    /// Key at the head of the eviction queue (the next victim).
    pub fn peek_front(&self) -> Option<(&K, &Arc<V>)> {
        self.queue.front().map(|entry| (&entry.key, &entry.value))
    }

    fn notify(&self, value: &Arc<V>) {
        if let Some(callback) = &self.callback {
            callback.on_evict(value);
        }
    }
}

/// Rehash callback for the index. Never calls back into user code.
fn slot_hash<K, V>(queue: &Queue<K, V>, id: SlotId) -> u64 {
    queue.get(id).map_or(0, |entry| entry.hash)
}

impl<K, V, S, E> WatermarkCore<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEquality<K>,
{
    fn find(&self, hash: u64, key: &K) -> Option<SlotId> {
        let queue = &self.queue;
        let equality = &self.equality;
        self.index
            .find(hash, |&id| {
                queue
                    .get(id)
                    .is_some_and(|entry| entry.hash == hash && equality.eq(&entry.key, key))
            })
            .copied()
    }

    /// Upserts `key`, returning `true` if it was not present.
    ///
    /// Runs the watermark drain first. An existing key gets the new value
    /// and moves to the tail under both policies.
    pub fn insert(&mut self, key: K, value: Arc<V>) -> bool {
        self.enforce_high_watermark();

        let hash = self.hasher.hash_one(&key);
        if let Some(id) = self.find(hash, &key) {
            if let Some(entry) = self.queue.get_mut(id) {
                entry.value = value;
            }
            self.queue.move_to_back(id);
            #[cfg(feature = "metrics")]
            self.metrics.record_insert_update();
            return false;
        }

        let mut guard = self.queue.append_guard();
        let id = guard.push_back(Entry { key, value, hash });
        self.index
            .insert_unique(hash, id, |&slot| slot_hash(&*guard, slot));
        guard.disarm();

        #[cfg(feature = "metrics")]
        self.metrics.record_insert_new();
        true
    }

    /// Looks up `key`; under LRU with `touch` the entry moves to the tail.
    pub fn try_get_value(&mut self, key: &K, touch: bool) -> Option<&Arc<V>> {
        if !self.config.policy.reorders_on_lookup(touch) {
            return self.peek(key);
        }

        let hash = self.hasher.hash_one(key);
        let Some(id) = self.find(hash, key) else {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
            return None;
        };
        self.queue.move_to_back(id);
        #[cfg(feature = "metrics")]
        {
            self.metrics.record_get_hit();
            self.metrics.record_touch();
        }
        self.queue.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key`, touching it under LRU.
    pub fn get(&mut self, key: &K) -> Option<&Arc<V>> {
        self.try_get_value(key, true)
    }

    /// Looks up `key` without changing eviction order.
    pub fn peek(&self, key: &K) -> Option<&Arc<V>> {
        let hash = self.hasher.hash_one(key);
        let found = self
            .find(hash, key)
            .and_then(|id| self.queue.get(id))
            .map(|entry| &entry.value);
        #[cfg(feature = "metrics")]
        {
            if found.is_some() {
                self.metrics.record_get_hit();
            } else {
                self.metrics.record_get_miss();
            }
        }
        found
    }

    /// Returns `true` if `key` is present. Does not count as a lookup.
    pub fn contains(&self, key: &K) -> bool {
        let hash = self.hasher.hash_one(key);
        self.find(hash, key).is_some()
    }

    /// Removes `key`, notifying the post-eviction hook.
    pub fn remove(&mut self, key: &K) -> Option<Arc<V>> {
        let hash = self.hasher.hash_one(key);
        let id = self.find(hash, key)?;
        let entry = self.unlink(id)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_erase();
        self.notify(&entry.value);
        Some(entry.value)
    }

    /// Removes the head of the eviction queue, notifying the hook.
    pub fn pop_front(&mut self) -> Option<(K, Arc<V>)> {
        let id = self.queue.front_id()?;
        let entry = self.unlink(id)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_pop_front();
        self.notify(&entry.value);
        Some((entry.key, entry.value))
    }

    /// Takes `id` out of the index, then out of the queue.
    ///
    /// Returns `None` only if `id` is not a live queue node. The queue node is
    /// always removed, so a drain makes progress even if the index lost track
    /// of it.
    fn unlink(&mut self, id: SlotId) -> Option<Entry<K, V>> {
        let hash = self.queue.get(id)?.hash;
        match self.index.find_entry(hash, |&slot| slot == id) {
            Ok(occupied) => {
                occupied.remove();
            },
            Err(_) => {
                warn!(slot = id.index(), "queue entry was missing from the index");
            },
        }
        self.queue.remove(id)
    }

    fn enforce_high_watermark(&mut self) {
        let high = self.config.high_watermark;
        let low = self.config.low_watermark;
        if self.len() < high {
            return;
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_drain();
        debug!(len = self.len(), low, high, "high watermark reached, draining");

        let mut evicted = 0usize;
        while self.len() >= low {
            // `len() >= low >= 1`, so the queue has a head.
            let Some(entry) = self.queue.front_id().and_then(|id| self.unlink(id)) else {
                break;
            };
            evicted += 1;
            #[cfg(feature = "metrics")]
            self.metrics.record_evicted_entry();
            self.notify(&entry.value);
        }

        debug!(evicted, len = self.len(), low, high, "watermark drain finished");
    }

    /// Verifies that index and queue describe the same entries.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.queue.len() {
            return Err(InvariantError::new(format!(
                "index holds {} entries but queue holds {}",
                self.index.len(),
                self.queue.len()
            )));
        }
        if self.len() > self.config.high_watermark {
            return Err(InvariantError::new(format!(
                "len {} exceeds high watermark {}",
                self.len(),
                self.config.high_watermark
            )));
        }
        for &id in self.index.iter() {
            if !self.queue.contains(id) {
                return Err(InvariantError::new(format!(
                    "index points at vacant queue slot {}",
                    id.index()
                )));
            }
        }
        for (id, entry) in self.queue.iter_entries() {
            let hash = self.hasher.hash_one(&entry.key);
            if entry.hash != hash {
                return Err(InvariantError::new(format!(
                    "queue slot {} caches a stale key hash",
                    id.index()
                )));
            }
            if self.index.find(hash, |&slot| slot == id).is_none() {
                return Err(InvariantError::new(format!(
                    "queue slot {} is not reachable through the index",
                    id.index()
                )));
            }
            if self.find(hash, &entry.key) != Some(id) {
                return Err(InvariantError::new(format!(
                    "queue slot {} holds a key that resolves elsewhere",
                    id.index()
                )));
            }
        }
        Ok(())
    }
}

impl<K, V, S, E> Extend<(K, Arc<V>)> for WatermarkCore<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEquality<K>,
{
    fn extend<T: IntoIterator<Item = (K, Arc<V>)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S, E> fmt::Debug for WatermarkCore<K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatermarkCore")
            .field("len", &self.len())
            .field("policy", &self.config.policy)
            .field("low_watermark", &self.config.low_watermark)
            .field("high_watermark", &self.config.high_watermark)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S, E> WatermarkCore<K, V, S, E> {
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot_with(
            self.len(),
            self.config.low_watermark,
            self.config.high_watermark,
        )
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S, E> MetricsSnapshotProvider<CacheMetricsSnapshot> for WatermarkCore<K, V, S, E> {
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S, E> MetricsReset for WatermarkCore<K, V, S, E> {
    fn reset_metrics(&self) {
        self.metrics.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use parking_lot::Mutex;

    fn make_core(policy: EvictionPolicy, low: usize, high: usize) -> WatermarkCore<u32, u32> {
        WatermarkCore::with_config(WatermarkConfig::new(policy, low, high)).unwrap()
    }

    fn keys(core: &WatermarkCore<u32, u32>) -> Vec<u32> {
        core.iter().map(|(k, _)| *k).collect()
    }

    fn recording_callback(core: &mut WatermarkCore<u32, u32>) -> Arc<Mutex<Vec<u32>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        core.set_post_eviction_callback(move |value: &Arc<u32>| {
            sink.lock().push(**value);
        });
        seen
    }

    // ==============================================
    // CORRECTNESS TESTS MODULE
    // ==============================================
    mod correctness {
        use super::*;

        mod basic_behavior {
            use super::*;

            #[test]
            fn test_new_core_is_unbounded_lru() {
                let core: WatermarkCore<u32, u32> = WatermarkCore::new();
                assert_eq!(core.eviction_policy(), EvictionPolicy::Lru);
                assert_eq!(core.low_watermark(), usize::MAX);
                assert_eq!(core.high_watermark(), usize::MAX);
                assert!(core.is_empty());
                assert!(!core.has_post_eviction_callback());
            }

            #[test]
            fn test_invalid_config_rejected() {
                let result: Result<WatermarkCore<u32, u32>, _> =
                    WatermarkCore::with_config(WatermarkConfig::new(EvictionPolicy::Lru, 3, 2));
                assert!(result.is_err());
            }

            #[test]
            fn test_insert_reports_new_vs_update() {
                let mut core = make_core(EvictionPolicy::Lru, 10, 10);
                assert!(core.insert(1, Arc::new(10)));
                assert!(!core.insert(1, Arc::new(11)));
                assert_eq!(core.len(), 1);
                assert_eq!(core.peek(&1).map(|v| **v), Some(11));
            }

            #[test]
            fn test_update_moves_to_tail_under_both_policies() {
                for policy in [EvictionPolicy::Lru, EvictionPolicy::Fifo] {
                    let mut core = make_core(policy, 10, 10);
                    for k in 1..=3 {
                        core.insert(k, Arc::new(k));
                    }
                    core.insert(1, Arc::new(100));
                    assert_eq!(keys(&core), vec![2, 3, 1], "{policy}");
                }
            }

            #[test]
            fn test_round_trip_returns_same_handle() {
                let mut core = make_core(EvictionPolicy::Fifo, 4, 4);
                let value = Arc::new(42);
                core.insert(7, Arc::clone(&value));
                assert!(Arc::ptr_eq(core.get(&7).unwrap(), &value));
                assert!(core.get(&8).is_none());
            }

            #[test]
            fn test_remove_and_contains() {
                let mut core = make_core(EvictionPolicy::Lru, 4, 4);
                core.insert(1, Arc::new(1));
                assert!(core.contains(&1));
                assert_eq!(core.remove(&1).map(|v| *v), Some(1));
                assert!(!core.contains(&1));
                assert!(core.remove(&1).is_none());
                core.check_invariants().unwrap();
            }

            #[test]
            fn test_extend_inserts_all() {
                let mut core = make_core(EvictionPolicy::Fifo, 100, 100);
                core.extend((0..5).map(|k| (k, Arc::new(k * 2))));
                assert_eq!(core.len(), 5);
                assert_eq!(core.peek(&4).map(|v| **v), Some(8));
            }

            #[test]
            fn test_debug_output() {
                let core = make_core(EvictionPolicy::Fifo, 2, 3);
                let dbg = format!("{:?}", core);
                assert!(dbg.contains("WatermarkCore"));
                assert!(dbg.contains("Fifo"));
            }
        }

        mod watermark_eviction {
            use super::*;

            #[test]
            fn test_no_eviction_below_high_watermark() {
                let mut core = make_core(EvictionPolicy::Lru, 2, 4);
                for k in 0..4 {
                    core.insert(k, Arc::new(k));
                }
                assert_eq!(core.len(), 4);
            }

            #[test]
            fn test_drain_goes_strictly_below_low_watermark() {
                let mut core = make_core(EvictionPolicy::Fifo, 2, 4);
                for k in 0..4 {
                    core.insert(k, Arc::new(k));
                }
                core.insert(4, Arc::new(4));
                // len 4 >= high: drain while len >= 2, leaving 1, then insert.
                assert_eq!(keys(&core), vec![3, 4]);
            }

            #[test]
            fn test_fixed_capacity_evicts_one_per_insert() {
                let mut core = make_core(EvictionPolicy::Fifo, 3, 3);
                let seen = recording_callback(&mut core);
                for k in 0..4 {
                    core.insert(k, Arc::new(k));
                }
                assert_eq!(core.len(), 3);
                assert_eq!(*seen.lock(), vec![0]);
                core.insert(4, Arc::new(4));
                assert_eq!(*seen.lock(), vec![0, 1]);
                assert_eq!(keys(&core), vec![2, 3, 4]);
            }

            #[test]
            fn test_low_watermark_of_one_empties_cache() {
                let mut core = make_core(EvictionPolicy::Lru, 1, 3);
                for k in 0..3 {
                    core.insert(k, Arc::new(k));
                }
                core.insert(3, Arc::new(3));
                assert_eq!(keys(&core), vec![3]);
            }

            #[test]
            fn test_update_at_high_watermark_still_drains() {
                let mut core = make_core(EvictionPolicy::Fifo, 2, 2);
                core.insert(1, Arc::new(1));
                core.insert(2, Arc::new(2));
                // Drain runs before the lookup and removes key 1 itself.
                assert!(core.insert(1, Arc::new(10)));
                assert_eq!(keys(&core), vec![2, 1]);
            }

            #[test]
            fn test_lru_touch_protects_entry() {
                let mut core = make_core(EvictionPolicy::Lru, 2, 3);
                for k in [1, 2, 3] {
                    core.insert(k, Arc::new(k));
                }
                assert!(core.get(&1).is_some());
                core.insert(4, Arc::new(4));
                assert_eq!(keys(&core), vec![1, 4]);
            }

            #[test]
            fn test_lru_peek_does_not_protect_entry() {
                let mut core = make_core(EvictionPolicy::Lru, 3, 3);
                for k in [1, 2, 3] {
                    core.insert(k, Arc::new(k));
                }
                assert!(core.try_get_value(&1, false).is_some());
                core.insert(4, Arc::new(4));
                assert!(!core.contains(&1));
            }

            #[test]
            fn test_fifo_lookup_never_reorders() {
                let mut core = make_core(EvictionPolicy::Fifo, 3, 3);
                for k in [1, 2, 3] {
                    core.insert(k, Arc::new(k));
                }
                assert!(core.get(&1).is_some());
                assert!(core.try_get_value(&1, true).is_some());
                assert_eq!(keys(&core), vec![1, 2, 3]);
                core.insert(4, Arc::new(4));
                assert_eq!(keys(&core), vec![2, 3, 4]);
            }

            #[test]
            fn test_lookup_and_remove_never_evict() {
                let mut core = make_core(EvictionPolicy::Lru, 1, 2);
                core.insert(1, Arc::new(1));
                core.insert(2, Arc::new(2));
                core.get(&1);
                core.get(&3);
                core.remove(&3);
                assert_eq!(core.len(), 2);
            }
        }

        mod removal {
            use super::*;

            #[test]
            fn test_pop_front_on_empty() {
                let mut core = make_core(EvictionPolicy::Lru, 2, 2);
                let seen = recording_callback(&mut core);
                assert!(core.pop_front().is_none());
                assert!(seen.lock().is_empty());
                assert!(core.is_empty());
            }

            #[test]
            fn test_pop_front_removes_head_and_notifies_once() {
                let mut core = make_core(EvictionPolicy::Lru, 10, 10);
                let seen = recording_callback(&mut core);
                for k in [5, 6, 7] {
                    core.insert(k, Arc::new(k * 10));
                }
                let (key, value) = core.pop_front().unwrap();
                assert_eq!((key, *value), (5, 50));
                assert_eq!(*seen.lock(), vec![50]);
                assert_eq!(keys(&core), vec![6, 7]);
            }

            #[test]
            fn test_clear_skips_callback() {
                let mut core = make_core(EvictionPolicy::Fifo, 10, 10);
                let seen = recording_callback(&mut core);
                for k in 0..5 {
                    core.insert(k, Arc::new(k));
                }
                core.clear();
                assert!(core.is_empty());
                assert!(seen.lock().is_empty());
                core.check_invariants().unwrap();
            }

            #[test]
            fn test_remove_notifies_with_removed_value() {
                let mut core = make_core(EvictionPolicy::Fifo, 10, 10);
                let seen = recording_callback(&mut core);
                core.insert(1, Arc::new(100));
                core.insert(2, Arc::new(200));
                core.remove(&2);
                assert_eq!(*seen.lock(), vec![200]);
            }

            #[test]
            fn test_cleared_callback_is_not_called() {
                let mut core = make_core(EvictionPolicy::Fifo, 10, 10);
                let seen = recording_callback(&mut core);
                core.clear_post_eviction_callback();
                core.insert(1, Arc::new(1));
                core.remove(&1);
                assert!(seen.lock().is_empty());
            }

            #[test]
            fn test_replaced_callback_takes_over() {
                let mut core = make_core(EvictionPolicy::Fifo, 10, 10);
                let first = recording_callback(&mut core);
                let second = recording_callback(&mut core);
                core.insert(1, Arc::new(1));
                core.pop_front();
                assert!(first.lock().is_empty());
                assert_eq!(*second.lock(), vec![1]);
            }
        }

        mod visitation {
            use super::*;

            #[test]
            fn test_visit_in_eviction_order() {
                let mut core = make_core(EvictionPolicy::Lru, 10, 10);
                for k in [1, 2, 3] {
                    core.insert(k, Arc::new(k * 10));
                }
                core.get(&1);
                let mut seen = Vec::new();
                core.visit(|k, v| {
                    seen.push((*k, *v));
                    true
                });
                assert_eq!(seen, vec![(2, 20), (3, 30), (1, 10)]);
            }

            #[test]
            fn test_visit_stops_early() {
                let mut core = make_core(EvictionPolicy::Fifo, 10, 10);
                for k in 0..5 {
                    core.insert(k, Arc::new(k));
                }
                let mut calls = 0;
                core.visit(|k, _| {
                    calls += 1;
                    *k < 1
                });
                assert_eq!(calls, 2);
            }

            #[test]
            fn test_peek_front_is_next_victim() {
                let mut core = make_core(EvictionPolicy::Lru, 10, 10);
                assert!(core.peek_front().is_none());
                core.insert(1, Arc::new(1));
                core.insert(2, Arc::new(2));
                core.get(&1);
                assert_eq!(core.peek_front().map(|(k, _)| *k), Some(2));
            }
        }

        mod custom_equality {
            use super::*;
            use std::hash::Hasher;

            #[derive(Clone, Default)]
            struct LowercaseHasher;

            struct LowercaseState(rustc_hash::FxHasher);

            impl Hasher for LowercaseState {
                fn finish(&self) -> u64 {
                    self.0.finish()
                }

                fn write(&mut self, bytes: &[u8]) {
                    for b in bytes {
                        self.0.write_u8(b.to_ascii_lowercase());
                    }
                }
            }

            impl BuildHasher for LowercaseHasher {
                type Hasher = LowercaseState;

                fn build_hasher(&self) -> LowercaseState {
                    LowercaseState(rustc_hash::FxHasher::default())
                }
            }

            #[test]
            fn test_injected_equality_merges_keys() {
                let mut core: WatermarkCore<String, u32, _, _> =
                    WatermarkCore::with_hasher_and_equality(
                        WatermarkConfig::default(),
                        LowercaseHasher,
                        |a: &String, b: &String| a.eq_ignore_ascii_case(b),
                    )
                    .unwrap();

                assert!(core.insert("Key".to_string(), Arc::new(1)));
                assert!(!core.insert("KEY".to_string(), Arc::new(2)));
                assert_eq!(core.len(), 1);
                assert_eq!(core.peek(&"key".to_string()).map(|v| **v), Some(2));
                // The first spelling of the key is retained.
                assert_eq!(core.iter().next().map(|(k, _)| k.as_str()), Some("Key"));
                core.check_invariants().unwrap();
            }
        }

        mod failure_safety {
            use super::*;
            use std::hash::Hasher;
            use std::panic::{catch_unwind, AssertUnwindSafe};

            /// Hasher that panics once its shared budget of calls is spent.
            #[derive(Clone)]
            struct BudgetHasher {
                budget: Arc<AtomicUsize>,
            }

            struct BudgetState {
                inner: rustc_hash::FxHasher,
                budget: Arc<AtomicUsize>,
            }

            impl Hasher for BudgetState {
                fn finish(&self) -> u64 {
                    let left = self.budget.load(Ordering::SeqCst);
                    if left == 0 {
                        panic!("hash budget exhausted");
                    }
                    self.budget.store(left - 1, Ordering::SeqCst);
                    self.inner.finish()
                }

                fn write(&mut self, bytes: &[u8]) {
                    self.inner.write(bytes);
                }
            }

            impl BuildHasher for BudgetHasher {
                type Hasher = BudgetState;

                fn build_hasher(&self) -> BudgetState {
                    BudgetState {
                        inner: rustc_hash::FxHasher::default(),
                        budget: Arc::clone(&self.budget),
                    }
                }
            }

            fn budget_core(
                config: WatermarkConfig,
                budget: &Arc<AtomicUsize>,
            ) -> WatermarkCore<u64, u64, BudgetHasher, DefaultEquality> {
                WatermarkCore::with_hasher_and_equality(
                    config,
                    BudgetHasher {
                        budget: Arc::clone(budget),
                    },
                    DefaultEquality,
                )
                .unwrap()
            }

            #[test]
            fn test_growth_hashes_only_the_new_key() {
                let budget = Arc::new(AtomicUsize::new(usize::MAX));
                let mut core = budget_core(WatermarkConfig::default(), &budget);

                for k in 0..500u64 {
                    budget.store(1, Ordering::SeqCst);
                    assert!(core.insert(k, Arc::new(k)));
                    budget.store(usize::MAX, Ordering::SeqCst);
                }
                assert_eq!(core.len(), 500);
                core.check_invariants().unwrap();
            }

            #[test]
            fn test_churn_at_fixed_capacity_never_rehashes_through_hasher() {
                let budget = Arc::new(AtomicUsize::new(usize::MAX));
                let mut core =
                    budget_core(WatermarkConfig::new(EvictionPolicy::Fifo, 27, 27), &budget);

                let mut state = 0x9e37_79b9_7f4a_7c15u64;
                for step in 0..4_000u64 {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    let key = state % 512;

                    // One hash per call: the argument key.
                    budget.store(1, Ordering::SeqCst);
                    if step % 5 == 0 {
                        core.remove(&key);
                    } else {
                        core.insert(key, Arc::new(step));
                    }
                    budget.store(usize::MAX, Ordering::SeqCst);

                    assert!(core.len() <= 27);
                    core.check_invariants().unwrap();
                }

                // Unlinking reads cached hashes only.
                let len = core.len();
                budget.store(0, Ordering::SeqCst);
                let mut popped = 0;
                while core.pop_front().is_some() {
                    popped += 1;
                }
                budget.store(usize::MAX, Ordering::SeqCst);
                assert_eq!(popped, len);
                assert!(core.is_empty());
                core.check_invariants().unwrap();
            }

            #[test]
            fn test_key_hash_panic_after_drain_keeps_drained_state() {
                let budget = Arc::new(AtomicUsize::new(usize::MAX));
                let mut core =
                    budget_core(WatermarkConfig::new(EvictionPolicy::Fifo, 2, 4), &budget);
                for k in 0..4u64 {
                    core.insert(k, Arc::new(k));
                }

                // The drain runs first and hashes nothing; hashing key 9 fails.
                budget.store(0, Ordering::SeqCst);
                let result = catch_unwind(AssertUnwindSafe(|| core.insert(9, Arc::new(9))));
                budget.store(usize::MAX, Ordering::SeqCst);

                assert!(result.is_err());
                assert_eq!(core.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![3]);
                assert!(!core.contains(&9));
                core.check_invariants().unwrap();
            }

            #[test]
            fn test_panicking_callback_leaves_consistent_state() {
                let mut core = make_core(EvictionPolicy::Fifo, 2, 2);
                core.set_post_eviction_callback(|_: &Arc<u32>| panic!("callback failed"));
                core.insert(1, Arc::new(1));
                core.insert(2, Arc::new(2));

                let result = catch_unwind(AssertUnwindSafe(|| core.insert(3, Arc::new(3))));
                assert!(result.is_err());
                // The victim was unlinked before the callback ran.
                assert!(!core.contains(&1));
                core.check_invariants().unwrap();
            }
        }
    }

    // ==============================================
    // PROPERTY TESTS MODULE
    // ==============================================
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(u8),
            Get(u8, bool),
            Remove(u8),
            PopFront,
            Clear,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                6 => any::<u8>().prop_map(|k| Op::Insert(k % 32)),
                3 => (any::<u8>(), any::<bool>()).prop_map(|(k, t)| Op::Get(k % 32, t)),
                2 => any::<u8>().prop_map(|k| Op::Remove(k % 32)),
                1 => Just(Op::PopFront),
                1 => Just(Op::Clear),
            ]
        }

        fn config_strategy() -> impl Strategy<Value = (EvictionPolicy, usize, usize)> {
            (
                prop_oneof![Just(EvictionPolicy::Lru), Just(EvictionPolicy::Fifo)],
                1usize..12,
                0usize..8,
            )
                .prop_map(|(policy, low, extra)| (policy, low, low + extra))
        }

        proptest! {
            /// Property: size never exceeds the high watermark and index/queue agree.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_bounded_and_consistent(
                (policy, low, high) in config_strategy(),
                ops in prop::collection::vec(op_strategy(), 0..200)
            ) {
                let mut core = make_core(policy, low, high);
                for op in ops {
                    match op {
                        Op::Insert(k) => { core.insert(u32::from(k), Arc::new(u32::from(k))); },
                        Op::Get(k, touch) => { core.try_get_value(&u32::from(k), touch); },
                        Op::Remove(k) => { core.remove(&u32::from(k)); },
                        Op::PopFront => { core.pop_front(); },
                        Op::Clear => core.clear(),
                    }
                    prop_assert!(core.len() <= high);
                    prop_assert!(core.check_invariants().is_ok());
                }
            }

            /// Property: every departure except clear reaches the callback exactly once.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_callback_accounts_for_departures(
                (policy, low, high) in config_strategy(),
                inserts in prop::collection::vec(0u32..64, 0..150)
            ) {
                let mut core = make_core(policy, low, high);
                let notified = Arc::new(AtomicUsize::new(0));
                let sink = Arc::clone(&notified);
                core.set_post_eviction_callback(move |_: &Arc<u32>| {
                    sink.fetch_add(1, Ordering::SeqCst);
                });

                let mut new_keys = 0usize;
                for k in inserts {
                    if core.insert(k, Arc::new(k)) {
                        new_keys += 1;
                    }
                }
                prop_assert_eq!(new_keys, core.len() + notified.load(Ordering::SeqCst));
            }

            /// Property: FIFO eviction order is insertion order regardless of lookups.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_fifo_order_ignores_lookups(
                lookups in prop::collection::vec((0u32..10, any::<bool>()), 0..40)
            ) {
                let mut core = make_core(EvictionPolicy::Fifo, 20, 20);
                for k in 0..10 {
                    core.insert(k, Arc::new(k));
                }
                for (k, touch) in lookups {
                    core.try_get_value(&k, touch);
                }
                prop_assert_eq!(keys(&core), (0..10).collect::<Vec<_>>());
            }
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn test_metrics_track_operations() {
            let mut core = make_core(EvictionPolicy::Lru, 2, 3);
            for k in 0..3 {
                core.insert(k, Arc::new(k));
            }
            core.insert(0, Arc::new(0));
            core.get(&0);
            core.peek(&99);
            core.pop_front();

            let snapshot = core.metrics_snapshot();
            assert_eq!(snapshot.insert_new, 4);
            assert_eq!(snapshot.drains, 1);
            assert_eq!(snapshot.evicted_entries, 2);
            assert_eq!(snapshot.get_hits, 1);
            assert_eq!(snapshot.get_misses, 1);
            assert_eq!(snapshot.touches, 1);
            assert_eq!(snapshot.popped_entries, 1);
            assert_eq!(snapshot.cache_len, 1);

            core.reset_metrics();
            assert_eq!(core.snapshot().insert_calls, 0);
        }
    }
}
