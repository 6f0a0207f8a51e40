use super::metrics::MetricsSnapshot;
use prometheus::{Encoder, Gauge, IntGauge, Registry, TextEncoder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Prometheus error: {0}")]
    PrometheusError(#[from] prometheus::Error),
    #[error("Metrics encoding error: {0}")]
    EncodingError(String),
}

/// Renders [`MetricsSnapshot`]s in the Prometheus text exposition format.
pub struct PrometheusExporter {
    registry: Registry,
    events_enqueued: IntGauge,
    events_flushed: IntGauge,
    events_succeeded: IntGauge,
    events_failed: IntGauge,
    events_dropped: IntGauge,
    flush_count: IntGauge,
    retry_count: IntGauge,
    failed_event_count: IntGauge,
    last_flush_timestamp: Gauge,
    success_rate: Gauge,
    drop_rate: Gauge,
}

impl PrometheusExporter {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let int_gauge = |name: &str, help: &str| -> Result<IntGauge, MetricsError> {
            let gauge = IntGauge::new(name, help)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };
        let events_enqueued =
            int_gauge("langfuse_events_enqueued_total", "Events accepted into the queue")?;
        let events_flushed =
            int_gauge("langfuse_events_flushed_total", "Events reported by the ingestion API")?;
        let events_succeeded = int_gauge(
            "langfuse_events_succeeded_total",
            "Events the ingestion API accepted",
        )?;
        let events_failed = int_gauge(
            "langfuse_events_failed_total",
            "Events the ingestion API rejected",
        )?;
        let events_dropped = int_gauge(
            "langfuse_events_dropped_total",
            "Events rejected because the queue was full",
        )?;
        let flush_count = int_gauge("langfuse_flushes_total", "Completed flushes")?;
        let retry_count = int_gauge("langfuse_retries_total", "Flushes that failed and were requeued")?;
        let failed_event_count = int_gauge(
            "langfuse_failed_events",
            "Failed events currently held for inspection",
        )?;

        let gauge = |name: &str, help: &str| -> Result<Gauge, MetricsError> {
            let gauge = Gauge::new(name, help)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };
        let last_flush_timestamp = gauge(
            "langfuse_last_flush_timestamp_seconds",
            "Unix time of the last completed flush",
        )?;
        let success_rate = gauge(
            "langfuse_events_success_rate_percent",
            "Share of flushed events the API accepted",
        )?;
        let drop_rate = gauge(
            "langfuse_events_drop_rate_percent",
            "Share of offered events rejected by a full queue",
        )?;

        Ok(Self {
            registry,
            events_enqueued,
            events_flushed,
            events_succeeded,
            events_failed,
            events_dropped,
            flush_count,
            retry_count,
            failed_event_count,
            last_flush_timestamp,
            success_rate,
            drop_rate,
        })
    }

    pub fn render(&self, snapshot: &MetricsSnapshot) -> Result<String, MetricsError> {
        self.events_enqueued.set(clamp(snapshot.events_enqueued));
        self.events_flushed.set(clamp(snapshot.events_flushed));
        self.events_succeeded.set(clamp(snapshot.events_succeeded));
        self.events_failed.set(clamp(snapshot.events_failed));
        self.events_dropped.set(clamp(snapshot.events_dropped));
        self.flush_count.set(clamp(snapshot.flush_count));
        self.retry_count.set(clamp(snapshot.retry_count));
        self.failed_event_count
            .set(clamp(snapshot.failed_event_count as u64));
        self.last_flush_timestamp.set(
            snapshot
                .last_flush_time
                .map(|t| t.timestamp_millis() as f64 / 1000.0)
                .unwrap_or(0.0),
        );
        self.success_rate.set(snapshot.success_rate());
        self.drop_rate.set(snapshot.drop_rate());

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
