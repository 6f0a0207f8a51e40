use super::batch::{Batch, FlushTrigger};
use super::queue::{EventQueue, RequeueOutcome};
use crate::config::{Callbacks, Config, ConfigError};
use crate::domain::{Event, IngestError, IngestionResponse};
use crate::reliability::{MetricsRecorder, RetryConfig, RetryPolicy};
use crate::sender::Transport;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub flush_at: usize,
    pub max_queue_size: usize,
    pub flush_interval: Duration,
    /// Upper bound for one send, including the response body.
    pub flush_timeout: Duration,
    pub retry: RetryConfig,
    pub debug: bool,
    pub callbacks: Callbacks,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_at: 15,
            max_queue_size: 1000,
            flush_interval: Duration::from_secs(1),
            flush_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            debug: false,
            callbacks: Callbacks::default(),
        }
    }
}

impl From<&Config> for BatchConfig {
    fn from(config: &Config) -> Self {
        Self {
            flush_at: config.flush_at,
            max_queue_size: config.max_queue_size,
            flush_interval: config.flush_interval(),
            flush_timeout: config.timeout(),
            retry: config.retry_config(),
            debug: config.debug,
            callbacks: config.callbacks.clone(),
        }
    }
}

impl BatchConfig {
    /// Rejects thresholds the queue and the interval timer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &'static str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    field,
                    message: "must be greater than 0".to_string(),
                })
            }
        };

        positive("flush_at", self.flush_at > 0)?;
        positive("max_queue_size", self.max_queue_size > 0)?;
        positive("flush_interval", !self.flush_interval.is_zero())?;
        positive("flush_timeout", !self.flush_timeout.is_zero())
    }
}

struct BackgroundTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the event queue and decides when and how batches are sent.
pub struct Batcher {
    queue: EventQueue,
    transport: Arc<dyn Transport>,
    metrics: Arc<MetricsRecorder>,
    retry: Mutex<RetryPolicy>,
    config: BatchConfig,
    background: Mutex<Option<BackgroundTask>>,
}

impl Batcher {
    pub fn new(
        config: BatchConfig,
        transport: Arc<dyn Transport>,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            queue: EventQueue::new(config.max_queue_size),
            transport,
            metrics,
            retry: Mutex::new(RetryPolicy::new(config.retry.clone())),
            config,
            background: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues an event, flushing on this call path once `flush_at` is reached.
    ///
    /// Only a full queue is reported; errors of the size-triggered flush are
    /// absorbed.
    pub async fn add(&self, event: Event) -> Result<(), IngestError> {
        let len = match self.queue.push(event) {
            Ok(len) => len,
            Err(rejected) => {
                self.metrics.record_dropped(1);
                if self.config.debug {
                    warn!(
                        event_id = rejected.id(),
                        max_size = self.config.max_queue_size,
                        "Queue is full, dropping event"
                    );
                } else {
                    debug!(
                        event_id = rejected.id(),
                        max_size = self.config.max_queue_size,
                        "Queue is full, dropping event"
                    );
                }
                if let Some(callback) = &self.config.callbacks.on_event_dropped {
                    let callback = Arc::clone(callback);
                    tokio::spawn(async move { callback(1) });
                }
                return Err(IngestError::QueueFull {
                    max_size: self.config.max_queue_size,
                });
            }
        };

        self.metrics.record_enqueued(1);

        if len >= self.config.flush_at
            && let Err(e) = self.flush(FlushTrigger::Size).await
        {
            self.log_absorbed(FlushTrigger::Size, &e);
        }

        Ok(())
    }

    pub async fn flush(&self, trigger: FlushTrigger) -> Result<(), IngestError> {
        self.flush_with_deadline(trigger, self.config.flush_timeout)
            .await
    }

    /// Sends everything queued right now as one batch.
    ///
    /// Interval ticks are skipped while a retry backoff is running. An empty
    /// queue never reaches the transport.
    pub async fn flush_with_deadline(
        &self,
        trigger: FlushTrigger,
        deadline: Duration,
    ) -> Result<(), IngestError> {
        if trigger.waits_for_backoff() {
            let remaining = self.retry.lock().remaining_backoff();
            if let Some(remaining) = remaining {
                debug!(%trigger, ?remaining, "Skipping flush during retry backoff");
                return Ok(());
            }
        }

        let events = self.queue.drain();
        if events.is_empty() {
            return Ok(());
        }

        let batch = Batch::new(events, trigger);
        debug!(
            batch_id = %batch.id(),
            batch_size = batch.size(),
            %trigger,
            "Flushing batch"
        );

        let result = match tokio::time::timeout(deadline, self.transport.send(&batch)).await {
            Ok(result) => result,
            Err(_) => Err(IngestError::Network(format!(
                "flush deadline of {deadline:?} exceeded"
            ))),
        };

        match result {
            Ok(response) => {
                self.handle_success(&batch, &response);
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                self.handle_retryable(batch, &e);
                Err(e)
            }
            Err(e) => {
                self.handle_permanent(batch, &e);
                Err(e)
            }
        }
    }

    fn handle_success(&self, batch: &Batch, response: &IngestionResponse) {
        self.queue.settle(batch.events());
        self.retry.lock().record_success();

        let success = response.success_count();
        let errors = response.error_count();
        self.metrics.record_flush(success, errors);

        if let Some(callback) = &self.config.callbacks.on_event_flushed {
            let callback = Arc::clone(callback);
            tokio::spawn(async move { callback(success, errors) });
        }

        if errors > 0 && self.config.debug {
            warn!(
                batch_id = %batch.id(),
                "Ingestion API returned {} errors out of {} events",
                errors,
                batch.size()
            );
        }
    }

    fn handle_retryable(&self, batch: Batch, error: &IngestError) {
        let batch_id = batch.id().to_string();
        let batch_size = batch.size();
        self.metrics.record_retry();

        let (delay, outcome) = {
            let mut retry = self.retry.lock();
            let delay = retry.record_failure();
            let outcome = self
                .queue
                .requeue_front(batch.into_events(), |attempts| retry.should_give_up(attempts));
            (delay, outcome)
        };

        let RequeueOutcome {
            restored,
            exhausted,
            overflowed,
        } = outcome;

        if self.config.debug {
            warn!(
                batch_id = %batch_id,
                batch_size,
                restored,
                ?delay,
                "Retryable flush error, events requeued: {}",
                error
            );
        } else {
            debug!(
                batch_id = %batch_id,
                batch_size,
                restored,
                ?delay,
                "Retryable flush error, events requeued: {}",
                error
            );
        }

        if !exhausted.is_empty() {
            warn!(
                batch_id = %batch_id,
                count = exhausted.len(),
                "Giving up on events after repeated delivery failures"
            );
            for (event, attempts) in exhausted {
                self.metrics.record_failed_event(event, error, attempts);
            }
        }

        if !overflowed.is_empty() {
            warn!(
                batch_id = %batch_id,
                count = overflowed.len(),
                "Queue bound reached while requeueing, dropping oldest events"
            );
            let overflow_error = IngestError::QueueFull {
                max_size: self.config.max_queue_size,
            };
            for (event, attempts) in overflowed {
                self.metrics
                    .record_failed_event(event, &overflow_error, attempts);
            }
        }
    }

    fn handle_permanent(&self, batch: Batch, error: &IngestError) {
        let prior_attempts = self.queue.settle(batch.events());

        warn!(
            batch_id = %batch.id(),
            batch_size = batch.size(),
            "Non-retryable flush error, dropping batch: {}",
            error
        );

        for (event, prior) in batch.into_events().into_iter().zip(prior_attempts) {
            self.metrics
                .record_failed_event(event, error, prior.saturating_add(1));
        }
    }

    fn log_absorbed(&self, trigger: FlushTrigger, error: &IngestError) {
        if self.config.debug {
            warn!(%trigger, "Error flushing events: {}", error);
        } else {
            debug!(%trigger, "Error flushing events: {}", error);
        }
    }

    /// Starts the periodic flush task. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut background = self.background.lock();
        if background.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let batcher = Arc::clone(self);
        let handle = tokio::spawn(async move {
            batcher.run_interval(token).await;
        });

        *background = Some(BackgroundTask { cancel, handle });
    }

    async fn run_interval(&self, cancel: CancellationToken) {
        let period = self.config.flush_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?period, "Background flush task started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.flush(FlushTrigger::Interval).await {
                        self.log_absorbed(FlushTrigger::Interval, &e);
                    }
                }
            }
        }

        debug!("Background flush task stopped");
    }

    pub fn is_running(&self) -> bool {
        self.background.lock().is_some()
    }

    /// Signals the periodic task to stop and waits for it to finish.
    pub async fn stop(&self) {
        let task = self.background.lock().take();
        if let Some(task) = task {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!("Background flush task ended abnormally: {}", e);
            }
        }
    }

    /// Signals the periodic task to stop without waiting.
    pub fn cancel(&self) {
        if let Some(task) = self.background.lock().as_ref() {
            task.cancel.cancel();
        }
    }

    /// Stops the periodic task, then runs the final flush within `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), IngestError> {
        self.stop().await;
        let result = self
            .flush_with_deadline(FlushTrigger::Shutdown, timeout)
            .await;

        let leftover = self.queue.len();
        if leftover > 0 {
            warn!(leftover, "Events left undelivered at shutdown");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventType, SuccessResult};
    use crate::sender::MockTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event() -> Event {
        Event::new(EventType::EventCreate, serde_json::Map::new())
    }

    fn config(flush_at: usize, max_queue_size: usize) -> BatchConfig {
        BatchConfig {
            flush_at,
            max_queue_size,
            flush_interval: Duration::from_secs(3600),
            retry: RetryConfig {
                max_attempts: 0,
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(1),
                jitter: false,
                ..RetryConfig::default()
            },
            ..BatchConfig::default()
        }
    }

    fn accept_all(batch: &Batch) -> Result<IngestionResponse, IngestError> {
        Ok(IngestionResponse {
            successes: batch
                .events()
                .iter()
                .map(|e| SuccessResult {
                    id: e.id().to_string(),
                    status: 201,
                    message: None,
                })
                .collect(),
            errors: Vec::new(),
        })
    }

    fn batcher(config: BatchConfig, transport: MockTransport) -> (Batcher, Arc<MetricsRecorder>) {
        let metrics = Arc::new(MetricsRecorder::new(true));
        (
            Batcher::new(config, Arc::new(transport), Arc::clone(&metrics)).unwrap(),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_flush_on_empty_queue_skips_transport() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let (batcher, _) = batcher(config(10, 10), transport);

        assert!(batcher.flush(FlushTrigger::Manual).await.is_ok());
    }

    #[tokio::test]
    async fn test_size_trigger_flushes_on_add() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|batch| {
                assert_eq!(batch.trigger(), FlushTrigger::Size);
                accept_all(batch)
            });
        let (batcher, metrics) = batcher(config(2, 10), transport);

        batcher.add(event()).await.unwrap();
        assert_eq!(batcher.len(), 1);
        batcher.add(event()).await.unwrap();
        assert_eq!(batcher.len(), 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.flush_count, 1);
        assert_eq!(snapshot.events_succeeded, 2);
        assert_eq!(snapshot.events_enqueued, 2);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_and_counts_drop() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let (batcher, metrics) = batcher(config(10, 2), transport);

        batcher.add(event()).await.unwrap();
        batcher.add(event()).await.unwrap();
        let err = batcher.add(event()).await.unwrap_err();

        assert!(matches!(err, IngestError::QueueFull { max_size: 2 }));
        assert_eq!(batcher.len(), 2);
        assert_eq!(metrics.snapshot().events_dropped, 1);
    }

    #[tokio::test]
    async fn test_retryable_failure_requeues_and_backs_off() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(IngestError::Server {
                status: 503,
                body: "unavailable".into(),
            })
        });
        let (batcher, metrics) = batcher(config(10, 10), transport);

        batcher.add(event()).await.unwrap();
        batcher.add(event()).await.unwrap();
        let before = batcher.queue().ids();

        let err = batcher.flush(FlushTrigger::Manual).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(batcher.queue().ids(), before);
        assert_eq!(metrics.snapshot().retry_count, 1);

        // Backoff is active: interval ticks do not reach the transport.
        assert!(batcher.flush(FlushTrigger::Interval).await.is_ok());
        assert_eq!(batcher.len(), 2);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let mut cfg = config(10, 10);
        cfg.flush_interval = Duration::ZERO;

        let result = Batcher::new(cfg, Arc::new(transport), Arc::new(MetricsRecorder::new(true)));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "flush_interval",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_permanent_failure_records_failed_events() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Err(IngestError::Client {
                status: 400,
                body: "bad request".into(),
            })
        });
        let (batcher, metrics) = batcher(config(10, 10), transport);

        batcher.add(event()).await.unwrap();
        batcher.add(event()).await.unwrap();
        assert!(batcher.flush(FlushTrigger::Manual).await.is_err());

        assert_eq!(batcher.len(), 0);
        let failed = metrics.failed_events();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|f| f.attempt == 1));
    }

    #[tokio::test]
    async fn test_attempt_limit_gives_up_on_events() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(2)
            .returning(|_| Err(IngestError::Network("connection reset".into())));
        let mut cfg = config(10, 10);
        cfg.retry.max_attempts = 2;
        let (batcher, metrics) = batcher(cfg, transport);

        batcher.add(event()).await.unwrap();
        assert!(batcher.flush(FlushTrigger::Manual).await.is_err());
        assert_eq!(batcher.len(), 1);
        assert!(batcher.flush(FlushTrigger::Manual).await.is_err());
        assert_eq!(batcher.len(), 0);

        let failed = metrics.failed_events();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempt, 2);
        assert_eq!(metrics.snapshot().retry_count, 2);
    }

    #[tokio::test]
    async fn test_success_invokes_flush_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut cfg = config(10, 10);
        cfg.callbacks.on_event_flushed = Some(Arc::new(move |success: usize, errors: usize| {
            assert_eq!((success, errors), (1, 0));
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(accept_all);
        let (batcher, _) = batcher(cfg, transport);

        batcher.add(event()).await.unwrap();
        batcher.flush(FlushTrigger::Manual).await.unwrap();

        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_task_flushes_on_interval() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|batch| {
                assert_eq!(batch.trigger(), FlushTrigger::Interval);
                accept_all(batch)
            });
        let mut cfg = config(10, 10);
        cfg.flush_interval = Duration::from_millis(500);
        let (batcher, _) = batcher(cfg, transport);
        let batcher = Arc::new(batcher);

        batcher.add(event()).await.unwrap();
        batcher.start();
        assert!(batcher.is_running());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(batcher.len(), 0);

        batcher.stop().await;
        assert!(!batcher.is_running());
    }
}
