use crate::metrics::cell::MetricsCell;
use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::{CoreMetricsRecorder, MetricsReset, WatermarkMetricsRecorder};

/// Counters owned by a `WatermarkCore`.
#[derive(Debug, Default)]
pub struct WatermarkMetrics {
    pub get_calls: MetricsCell,
    pub get_hits: MetricsCell,
    pub get_misses: MetricsCell,
    pub touches: MetricsCell,
    pub insert_calls: MetricsCell,
    pub insert_new: MetricsCell,
    pub insert_updates: MetricsCell,
    pub drains: MetricsCell,
    pub evicted_entries: MetricsCell,
    pub erased_entries: MetricsCell,
    pub popped_entries: MetricsCell,
    pub clears: MetricsCell,
}

impl WatermarkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the counters and attaches the supplied gauges.
    pub fn snapshot_with(
        &self,
        cache_len: usize,
        low_watermark: usize,
        high_watermark: usize,
    ) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            get_calls: self.get_calls.get(),
            get_hits: self.get_hits.get(),
            get_misses: self.get_misses.get(),
            touches: self.touches.get(),
            insert_calls: self.insert_calls.get(),
            insert_new: self.insert_new.get(),
            insert_updates: self.insert_updates.get(),
            drains: self.drains.get(),
            evicted_entries: self.evicted_entries.get(),
            erased_entries: self.erased_entries.get(),
            popped_entries: self.popped_entries.get(),
            clears: self.clears.get(),
            cache_len,
            low_watermark,
            high_watermark,
        }
    }
}

impl CoreMetricsRecorder for WatermarkMetrics {
    fn record_get_hit(&self) {
        self.get_calls.incr();
        self.get_hits.incr();
    }

    fn record_get_miss(&self) {
        self.get_calls.incr();
        self.get_misses.incr();
    }

    fn record_insert_new(&self) {
        self.insert_calls.incr();
        self.insert_new.incr();
    }

    fn record_insert_update(&self) {
        self.insert_calls.incr();
        self.insert_updates.incr();
    }

    fn record_evicted_entry(&self) {
        self.evicted_entries.incr();
    }

    fn record_clear(&self) {
        self.clears.incr();
    }
}

impl WatermarkMetricsRecorder for WatermarkMetrics {
    fn record_touch(&self) {
        self.touches.incr();
    }

    fn record_drain(&self) {
        self.drains.incr();
    }

    fn record_erase(&self) {
        self.erased_entries.incr();
    }

    fn record_pop_front(&self) {
        self.popped_entries.incr();
    }
}

impl MetricsReset for WatermarkMetrics {
    fn reset_metrics(&self) {
        for cell in [
            &self.get_calls,
            &self.get_hits,
            &self.get_misses,
            &self.touches,
            &self.insert_calls,
            &self.insert_new,
            &self.insert_updates,
            &self.drains,
            &self.evicted_entries,
            &self.erased_entries,
            &self.popped_entries,
            &self.clears,
        ] {
            cell.reset();
        }
    }
}
