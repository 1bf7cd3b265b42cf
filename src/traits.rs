//! # Collaborator Traits
//!
//! The cache consumes two user-supplied behaviours and exposes one hook:
//!
//! ```text
//!   ┌──────────────────────────┐      ┌──────────────────────────────┐
//!   │  S: BuildHasher          │      │  E: KeyEquality<K>           │
//!   │  key ─► u64              │      │  (&K, &K) ─► bool            │
//!   └────────────┬─────────────┘      └──────────────┬───────────────┘
//!                │                                   │
//!                └──────────────┬────────────────────┘
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │   Cache<K, V, S, E>      │
//!                  └────────────┬─────────────┘
//!                               │ entry leaves (evict / erase / pop)
//!                               ▼
//!                  ┌──────────────────────────┐
//!                  │ PostEvictionCallback<V>  │
//!                  │  on_evict(&Arc<V>)       │
//!                  └──────────────────────────┘
//! ```
//!
//! Hashing uses the standard [`BuildHasher`](std::hash::BuildHasher) seam.
//! Equality is injectable through [`KeyEquality`] so keys can be compared by a
//! projection (case-insensitive strings, a subset of fields) without a newtype.
//! Both must agree: keys that compare equal must hash equally.
//!
//! Closures work directly for both [`KeyEquality`] and [`PostEvictionCallback`]:
//!
//! ```
//! use std::sync::Arc;
//! use watermark_cache::{Cache, DefaultHashBuilder, EvictionPolicy};
//!
//! let cache: Cache<String, u32, _, _> = Cache::with_hasher_and_equality(
//!     EvictionPolicy::Lru,
//!     4,
//!     8,
//!     DefaultHashBuilder::default(),
//!     |a: &String, b: &String| a == b,
//! )
//! .unwrap();
//! cache.set_post_eviction_callback(|value: &Arc<u32>| {
//!     let _ = **value;
//! });
//! ```

use std::sync::Arc;

/// Key equality used by the hash index.
///
/// Implementations must be an equivalence relation consistent with the
/// cache's hasher.
pub trait KeyEquality<K: ?Sized> {
    /// Returns `true` if `a` and `b` name the same cache entry.
    fn eq(&self, a: &K, b: &K) -> bool;
}

/// Equality through the key's own [`Eq`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultEquality;

impl<K: Eq + ?Sized> KeyEquality<K> for DefaultEquality {
    #[inline]
    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

impl<K: ?Sized, F> KeyEquality<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn eq(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// Hook invoked once for every value that leaves the cache through eviction,
/// `erase`, `erase_bulk` or `pop_front`. `clear` does not call it.
///
/// The hook runs on the calling thread while the cache's write lock is held.
/// It must not call back into the same cache: the lock is not reentrant and
/// doing so deadlocks.
pub trait PostEvictionCallback<V>: Send + Sync {
    /// Called with the departing value handle.
    fn on_evict(&self, value: &Arc<V>);
}

impl<V, F> PostEvictionCallback<V> for F
where
    F: Fn(&Arc<V>) + Send + Sync,
{
    #[inline]
    fn on_evict(&self, value: &Arc<V>) {
        self(value)
    }
}

/// Marker for cache handles that are safe to share between threads.
pub trait ConcurrentCache: Send + Sync {}
