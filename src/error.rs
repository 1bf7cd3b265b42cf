//! Error types for the watermark cache.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (zero or inverted watermarks).
//! - [`InvariantError`]: Returned by `check_invariants` when the hash index and
//!   the eviction queue disagree.
//! - [`BulkInsertError`]: Returned by fallible bulk insertion; carries the
//!   caller's error plus how many keys were inserted before it.
//!
//! A key that is simply absent is never an error: lookups and removals report
//! it through `Option`.
//!
//! ## Example Usage
//!
//! ```
//! use watermark_cache::{Cache, EvictionPolicy};
//! use watermark_cache::error::ConfigError;
//!
//! let cache: Result<Cache<u64, String>, ConfigError> =
//!     Cache::with_watermarks(EvictionPolicy::Lru, 8, 16);
//! assert!(cache.is_ok());
//!
//! let bad = Cache::<u64, String>::with_watermarks(EvictionPolicy::Lru, 16, 8);
//! assert!(bad.is_err());
//! ```

use std::error::Error;
use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`WatermarkConfig::validate`](crate::config::WatermarkConfig::validate),
/// the fallible `Cache` constructors and
/// [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build).
///
/// # Example
///
/// ```
/// use watermark_cache::{Cache, EvictionPolicy};
///
/// let err = Cache::<u64, u64>::with_watermarks(EvictionPolicy::Fifo, 0, 4).unwrap_err();
/// assert!(err.to_string().contains("low_watermark"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for InvariantError {}

// ---------------------------------------------------------------------------
// BulkInsertError
// ---------------------------------------------------------------------------

/// A bulk insertion stopped because constructing a value failed.
///
/// Items processed before the failure stay in the cache; nothing is rolled
/// back. Items after it are dropped unprocessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkInsertError<E> {
    inserted: usize,
    source: E,
}

impl<E> BulkInsertError<E> {
    /// Creates an error for a batch that inserted `inserted` new keys before `source`.
    pub fn new(inserted: usize, source: E) -> Self {
        Self { inserted, source }
    }

    /// Number of keys newly inserted before the failure.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// The value-construction error.
    pub fn source_error(&self) -> &E {
        &self.source
    }

    /// Consumes the error and returns the value-construction error.
    pub fn into_source(self) -> E {
        self.source
    }
}

impl<E: fmt::Display> fmt::Display for BulkInsertError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bulk insert stopped after {} new keys: {}",
            self.inserted, self.source
        )
    }
}

impl<E: Error + 'static> Error for BulkInsertError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
