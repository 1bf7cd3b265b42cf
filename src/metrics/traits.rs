//! # Metrics Trait Hierarchy
//!
//! Recording, snapshotting and export are separate, composable traits so
//! cache logic never depends on how metrics are consumed.
//!
//! ```text
//!            ┌─────────────────────────────┐
//!            │     CoreMetricsRecorder     │
//!            │  get_hit/get_miss/insert    │
//!            │  evicted_entry/clear        │
//!            └──────────────┬──────────────┘
//!                           │
//!                           ▼
//!            ┌─────────────────────────────┐
//!            │  WatermarkMetricsRecorder   │
//!            │  touch/drain/erase/pop      │
//!            └─────────────────────────────┘
//!
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Recorders take `&self`: lookups record hits and misses while holding only
//! the shared side of the cache lock.

/// Common counters for any cache.
pub trait CoreMetricsRecorder {
    fn record_get_hit(&self);
    fn record_get_miss(&self);
    fn record_insert_new(&self);
    fn record_insert_update(&self);
    fn record_evicted_entry(&self);
    fn record_clear(&self);
}

/// Counters specific to watermark eviction and explicit removal.
pub trait WatermarkMetricsRecorder: CoreMetricsRecorder {
    fn record_touch(&self);
    fn record_drain(&self);
    fn record_erase(&self);
    fn record_pop_front(&self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
