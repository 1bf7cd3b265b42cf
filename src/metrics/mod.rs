//! Optional counters for cache behaviour (feature `metrics`).

pub mod cell;
pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::WatermarkMetrics;
pub use snapshot::CacheMetricsSnapshot;
