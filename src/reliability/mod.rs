#[cfg(feature = "metrics")]
pub mod exporter;
pub mod metrics;
pub mod retry;

#[cfg(feature = "metrics")]
pub use exporter::{MetricsError, PrometheusExporter};
pub use metrics::{FAILED_EVENTS_CAPACITY, FailedEvent, MetricsRecorder, MetricsSnapshot};
pub use retry::{RetryConfig, RetryPolicy};
