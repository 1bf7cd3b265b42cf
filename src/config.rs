//! Watermark configuration.
//!
//! | Field            | Type             | Default      | Description                       |
//! |------------------|------------------|--------------|-----------------------------------|
//! | `policy`         | `EvictionPolicy` | `Lru`        | Eviction ordering                 |
//! | `low_watermark`  | `usize`          | `usize::MAX` | Eviction drains to below this     |
//! | `high_watermark` | `usize`          | `usize::MAX` | Eviction starts when size reaches |
//!
//! The defaults never evict. Equal watermarks give a fixed-capacity cache.

use crate::error::ConfigError;
use crate::policy::EvictionPolicy;

/// Policy and watermark pair for a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkConfig {
    /// Eviction ordering.
    pub policy: EvictionPolicy,
    /// Target size; a drain stops once the size is strictly below this.
    pub low_watermark: usize,
    /// Size at which an insertion triggers a drain.
    pub high_watermark: usize,
}

impl WatermarkConfig {
    /// A configuration that never evicts.
    pub const fn unbounded(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            low_watermark: usize::MAX,
            high_watermark: usize::MAX,
        }
    }

    /// Low and high watermarks both set to `capacity`.
    pub const fn fixed_capacity(policy: EvictionPolicy, capacity: usize) -> Self {
        Self {
            policy,
            low_watermark: capacity,
            high_watermark: capacity,
        }
    }

    /// Explicit watermark pair. Call [`validate`](Self::validate) before use.
    pub const fn new(policy: EvictionPolicy, low_watermark: usize, high_watermark: usize) -> Self {
        Self {
            policy,
            low_watermark,
            high_watermark,
        }
    }

    /// Checks `1 <= low_watermark <= high_watermark`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_watermark < 1 {
            return Err(ConfigError::new("low_watermark must be >= 1"));
        }
        if self.high_watermark < 1 {
            return Err(ConfigError::new("high_watermark must be >= 1"));
        }
        if self.low_watermark > self.high_watermark {
            return Err(ConfigError::new(format!(
                "low_watermark ({}) must not exceed high_watermark ({})",
                self.low_watermark, self.high_watermark
            )));
        }
        Ok(())
    }

    /// Returns `true` if no insertion can ever trigger eviction.
    pub fn is_unbounded(&self) -> bool {
        self.high_watermark == usize::MAX
    }
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self::unbounded(EvictionPolicy::default())
    }
}
