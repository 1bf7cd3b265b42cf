/// Point-in-time copy of a cache's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,
    pub touches: u64,

    pub insert_calls: u64,
    pub insert_new: u64,
    pub insert_updates: u64,

    pub drains: u64, // insertions that crossed the high watermark
    pub evicted_entries: u64,
    pub erased_entries: u64,
    pub popped_entries: u64,
    pub clears: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub low_watermark: usize,
    pub high_watermark: usize,
}

impl CacheMetricsSnapshot {
    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.get_calls as f64
        }
    }

    /// Values that left through any path that notifies the callback.
    pub fn departed_entries(&self) -> u64 {
        self.evicted_entries + self.erased_entries + self.popped_entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_handles_no_calls() {
        assert_eq!(CacheMetricsSnapshot::default().hit_ratio(), 0.0);
    }

    #[test]
    fn hit_ratio_and_departures() {
        let snapshot = CacheMetricsSnapshot {
            get_calls: 4,
            get_hits: 3,
            get_misses: 1,
            evicted_entries: 2,
            erased_entries: 1,
            popped_entries: 1,
            ..Default::default()
        };
        assert_eq!(snapshot.hit_ratio(), 0.75);
        assert_eq!(snapshot.departed_entries(), 4);
    }
}
