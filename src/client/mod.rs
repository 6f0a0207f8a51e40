//! Client lifecycle: construction, enqueue, flush and shutdown.

mod state;

pub use state::ClientState;

use crate::buffer::{BatchConfig, Batcher, FlushTrigger};
use crate::config::Config;
use crate::domain::{Event, IngestError};
use crate::reliability::{FailedEvent, MetricsRecorder, MetricsSnapshot};
use crate::sender::{
    BatchTransmitter, FetchClient, HttpClient, ListTracesParams, PaginatedTraces,
    SessionWithTraces, TraceWithFullDetails, Transport, TransportConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Upper bound for the final flush performed by [`Client::close`].
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to one ingestion pipeline. Cheap to clone; clones share the queue.
///
/// Construction of an enabled client spawns the periodic flush task and so
/// must happen inside a Tokio runtime.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    state: RwLock<ClientState>,
    batcher: Option<Arc<Batcher>>,
    metrics: Arc<MetricsRecorder>,
    fetch: FetchClient,
}

impl Client {
    /// Validates `config` and starts delivery over HTTP.
    pub fn new(config: Config) -> Result<Self, IngestError> {
        config.validate()?;
        let http = HttpClient::new(TransportConfig::from(&config))?;
        let transport = Arc::new(BatchTransmitter::new(http.clone())?);
        Self::build(config, http, transport)
    }

    /// Like [`Client::new`] but sends batches through `transport`.
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, IngestError> {
        config.validate()?;
        let http = HttpClient::new(TransportConfig::from(&config))?;
        Self::build(config, http, transport)
    }

    fn build(
        config: Config,
        http: HttpClient,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, IngestError> {
        let metrics = Arc::new(MetricsRecorder::new(config.metrics_enabled));

        let (batcher, state) = if config.enabled {
            let batcher = Arc::new(Batcher::new(
                BatchConfig::from(&config),
                transport,
                Arc::clone(&metrics),
            )?);
            batcher.start();
            (Some(batcher), ClientState::Running)
        } else {
            debug!("Client disabled, events will be discarded");
            (None, ClientState::Created)
        };

        info!(
            base_url = %config.base_url,
            enabled = config.enabled,
            flush_at = config.flush_at,
            flush_interval_ms = config.flush_interval_ms,
            max_queue_size = config.max_queue_size,
            "Ingestion client started"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                state: RwLock::new(state),
                batcher,
                metrics,
                fetch: FetchClient::new(http),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    pub async fn state(&self) -> ClientState {
        *self.inner.state.read().await
    }

    /// Queues an event for delivery.
    ///
    /// Fails with [`IngestError::Closed`] after `close` and with
    /// [`IngestError::QueueFull`] when the queue is at capacity. A disabled
    /// client accepts and discards everything.
    pub async fn enqueue(&self, event: Event) -> Result<(), IngestError> {
        // Held for the whole add so that close waits for in-flight enqueues.
        let state = self.inner.state.read().await;
        if !state.accepts_events() {
            return Err(IngestError::Closed);
        }

        match &self.inner.batcher {
            Some(batcher) => batcher.add(event).await,
            None => Ok(()),
        }
    }

    /// Sends everything queued now, bounded by the configured request timeout.
    pub async fn flush(&self) -> Result<(), IngestError> {
        match &self.inner.batcher {
            Some(batcher) => batcher.flush(FlushTrigger::Manual).await,
            None => Ok(()),
        }
    }

    pub async fn flush_with_timeout(&self, timeout: Duration) -> Result<(), IngestError> {
        match &self.inner.batcher {
            Some(batcher) => {
                batcher
                    .flush_with_deadline(FlushTrigger::Manual, timeout)
                    .await
            }
            None => Ok(()),
        }
    }

    /// Stops background flushing and makes one last delivery attempt.
    ///
    /// Only the first call does any work; later calls return `Ok(())`.
    pub async fn close(&self) -> Result<(), IngestError> {
        {
            let mut state = self.inner.state.write().await;
            if *state == ClientState::Closed {
                return Ok(());
            }
            *state = ClientState::Closed;
        }

        info!("Closing ingestion client");
        match &self.inner.batcher {
            Some(batcher) => batcher.shutdown(SHUTDOWN_TIMEOUT).await,
            None => Ok(()),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.inner
            .batcher
            .as_ref()
            .map(|batcher| batcher.len())
            .unwrap_or(0)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn failed_events(&self) -> Vec<FailedEvent> {
        self.inner.metrics.failed_events()
    }

    pub fn reset_metrics(&self) {
        self.inner.metrics.reset();
    }

    /// Current metrics in the Prometheus text format.
    #[cfg(feature = "metrics")]
    pub fn export_prometheus(&self) -> Result<String, crate::reliability::MetricsError> {
        crate::reliability::PrometheusExporter::new()?.render(&self.metrics())
    }

    pub async fn get_trace(&self, trace_id: &str) -> Result<TraceWithFullDetails, IngestError> {
        self.ensure_enabled()?;
        self.inner.fetch.get_trace(trace_id).await
    }

    pub async fn list_traces(
        &self,
        params: &ListTracesParams,
    ) -> Result<PaginatedTraces, IngestError> {
        self.ensure_enabled()?;
        self.inner.fetch.list_traces(params).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionWithTraces, IngestError> {
        self.ensure_enabled()?;
        self.inner.fetch.get_session(session_id).await
    }

    fn ensure_enabled(&self) -> Result<(), IngestError> {
        if self.inner.config.enabled {
            Ok(())
        } else {
            Err(IngestError::Disabled)
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        // Dropped without close: stop the timer, abandon queued events.
        if let Some(batcher) = &self.batcher {
            batcher.cancel();
            if !batcher.is_empty() {
                debug!(
                    leftover = batcher.len(),
                    "Client dropped without close, queued events discarded"
                );
            }
        }
    }
}
