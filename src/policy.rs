//! Eviction ordering policies.
//!
//! Both policies evict from the head of the same queue; they differ only in
//! whether a lookup moves the entry it finds.
//!
//! | Policy | Queue order              | Lookup with touch      |
//! |--------|--------------------------|------------------------|
//! | LRU    | least recently used first| moves entry to tail    |
//! | FIFO   | oldest insertion first   | never reorders         |
//!
//! Explicit re-insertion of an existing key moves it to the tail under both.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Which entry the cache evicts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPolicy {
    /// Least Recently Used: lookups that touch move the entry to the tail.
    #[default]
    Lru,
    /// First In, First Out: only insertion order matters.
    Fifo,
}

impl EvictionPolicy {
    /// Returns `true` if a lookup with `touch` reorders the eviction queue
    /// (and therefore needs exclusive access).
    #[inline]
    pub fn reorders_on_lookup(self, touch: bool) -> bool {
        matches!(self, EvictionPolicy::Lru) && touch
    }

    /// Lowercase name, as accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Fifo => "fifo",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("lru") {
            Ok(EvictionPolicy::Lru)
        } else if s.eq_ignore_ascii_case("fifo") {
            Ok(EvictionPolicy::Fifo)
        } else {
            Err(ConfigError::new(format!(
                "unknown eviction policy {s:?} (expected \"lru\" or \"fifo\")"
            )))
        }
    }
}
