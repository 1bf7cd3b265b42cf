//! watermark-cache: a thread-safe key-value cache with LRU/FIFO eviction
//! driven by low and high watermarks.
//!
//! When an insertion finds the cache at or above its high watermark, entries
//! are evicted from the head of the queue until the size falls below the low
//! watermark, and only then is the new entry applied. Evicted, erased and
//! popped values are passed to an optional post-eviction callback.
//!
//! ```
//! use watermark_cache::{Cache, EvictionPolicy};
//!
//! let cache: Cache<&str, u32> = Cache::with_watermarks(EvictionPolicy::Lru, 2, 3).unwrap();
//! cache.insert("a", 1);
//! cache.insert("b", 2);
//! cache.insert("c", 3);
//! cache.get(&"a");
//! cache.insert("d", 4);
//!
//! assert!(cache.contains(&"a"));
//! assert!(cache.contains(&"d"));
//! assert_eq!(cache.len(), 2);
//! ```
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod cache;
pub mod config;
pub mod core;
pub mod ds;
pub mod error;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;

/// Hasher used when none is supplied.
pub type DefaultHashBuilder = rustc_hash::FxBuildHasher;

pub use crate::builder::CacheBuilder;
pub use crate::cache::Cache;
pub use crate::config::WatermarkConfig;
pub use crate::core::WatermarkCore;
pub use crate::ds::{AppendGuard, IntrusiveList, SlotArena, SlotId};
pub use crate::error::{BulkInsertError, ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::CacheMetricsSnapshot;
pub use crate::policy::EvictionPolicy;
pub use crate::traits::{ConcurrentCache, DefaultEquality, KeyEquality, PostEvictionCallback};
