//! Fluent construction of watermark caches.
//!
//! Collects the policy, watermarks, hasher, key equality and an initial
//! post-eviction callback, then validates everything once in
//! [`try_build`](CacheBuilder::try_build).
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use watermark_cache::{CacheBuilder, EvictionPolicy};
//!
//! let cache = CacheBuilder::<u64, String>::new()
//!     .policy(EvictionPolicy::Fifo)
//!     .watermarks(2, 4)
//!     .post_eviction_callback(|value: &Arc<String>| {
//!         let _ = value.len();
//!     })
//!     .try_build()
//!     .unwrap();
//!
//! cache.insert(1, "hello".to_string());
//! assert_eq!(cache.get(&1).as_deref().map(String::as_str), Some("hello"));
//! ```

use std::fmt;
use std::marker::PhantomData;

use tracing::warn;

use crate::cache::Cache;
use crate::config::WatermarkConfig;
use crate::core::WatermarkCore;
use crate::error::ConfigError;
use crate::policy::EvictionPolicy;
use crate::traits::{DefaultEquality, PostEvictionCallback};
use crate::DefaultHashBuilder;

/// Builder for [`Cache`] and [`WatermarkCore`].
pub struct CacheBuilder<K, V, S = DefaultHashBuilder, E = DefaultEquality> {
    config: WatermarkConfig,
    hasher: S,
    equality: E,
    callback: Option<Box<dyn PostEvictionCallback<V>>>,
    _key: PhantomData<fn() -> K>,
}

impl<K, V> CacheBuilder<K, V> {
    /// Starts from an unbounded LRU configuration with the default hasher and `Eq`.
    pub fn new() -> Self {
        Self {
            config: WatermarkConfig::default(),
            hasher: DefaultHashBuilder::default(),
            equality: DefaultEquality,
            callback: None,
            _key: PhantomData,
        }
    }
}

impl<K, V> Default for CacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, E> CacheBuilder<K, V, S, E> {
    /// Sets the eviction policy.
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Sets both watermarks. Checked in [`try_build`](Self::try_build).
    pub fn watermarks(mut self, low_watermark: usize, high_watermark: usize) -> Self {
        self.config.low_watermark = low_watermark;
        self.config.high_watermark = high_watermark;
        self
    }

    /// Fixed capacity: low and high watermark both set to `capacity`.
    pub fn capacity(self, capacity: usize) -> Self {
        self.watermarks(capacity, capacity)
    }

    /// Replaces policy and watermarks with a prepared configuration.
    pub fn config(mut self, config: WatermarkConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `hasher` for the index.
    pub fn hasher<S2>(self, hasher: S2) -> CacheBuilder<K, V, S2, E> {
        CacheBuilder {
            config: self.config,
            hasher,
            equality: self.equality,
            callback: self.callback,
            _key: PhantomData,
        }
    }

    /// Uses `equality` to compare keys.
    pub fn key_equality<E2>(self, equality: E2) -> CacheBuilder<K, V, S, E2> {
        CacheBuilder {
            config: self.config,
            hasher: self.hasher,
            equality,
            callback: self.callback,
            _key: PhantomData,
        }
    }

    /// Installs a post-eviction callback on the built cache.
    pub fn post_eviction_callback<F>(mut self, callback: F) -> Self
    where
        F: PostEvictionCallback<V> + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Builds the single-threaded engine.
    pub fn try_build_core(self) -> Result<WatermarkCore<K, V, S, E>, ConfigError> {
        let Self {
            config,
            hasher,
            equality,
            callback,
            ..
        } = self;

        let mut core = match WatermarkCore::with_hasher_and_equality(config, hasher, equality) {
            Ok(core) => core,
            Err(err) => {
                warn!(
                    low = config.low_watermark,
                    high = config.high_watermark,
                    error = %err,
                    "rejected cache watermarks"
                );
                return Err(err);
            },
        };
        if let Some(callback) = callback {
            core.set_boxed_post_eviction_callback(callback);
        }
        Ok(core)
    }

    /// Builds the thread-safe cache.
    pub fn try_build(self) -> Result<Cache<K, V, S, E>, ConfigError> {
        self.try_build_core().map(Cache::from_core)
    }
}

impl<K, V, S, E> fmt::Debug for CacheBuilder<K, V, S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("config", &self.config)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}
