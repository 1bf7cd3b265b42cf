//! Common imports for working with watermark caches.
//!
//! ```
//! use watermark_cache::prelude::*;
//!
//! let cache: Cache<u32, u32> = CacheBuilder::new()
//!     .policy(EvictionPolicy::Fifo)
//!     .capacity(8)
//!     .try_build()
//!     .unwrap();
//! cache.insert(1, 1);
//! ```

pub use crate::builder::CacheBuilder;
pub use crate::cache::Cache;
pub use crate::config::WatermarkConfig;
pub use crate::core::WatermarkCore;
pub use crate::error::{BulkInsertError, ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::traits::{MetricsExporter, MetricsReset, MetricsSnapshotProvider};
pub use crate::policy::EvictionPolicy;
pub use crate::traits::{ConcurrentCache, DefaultEquality, KeyEquality, PostEvictionCallback};
pub use crate::DefaultHashBuilder;
