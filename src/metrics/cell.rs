use std::sync::atomic::{AtomicU64, Ordering};

/// A metrics-only counter.
///
/// Counters are bumped from lookups that hold only the shared side of the
/// cache lock, so several threads may increment the same cell at once.
/// All accesses are `Relaxed`; counters never order cache state.
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct MetricsCell(AtomicU64);

impl MetricsCell {
    #[inline]
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}
