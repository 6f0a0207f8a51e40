use crate::domain::{ErrorKind, Event, IngestError};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Maximum number of failed events kept for inspection.
pub const FAILED_EVENTS_CAPACITY: usize = 1000;

/// An event that was given up on, with the reason.
#[derive(Debug, Clone)]
pub struct FailedEvent {
    pub event: Event,
    pub error_kind: ErrorKind,
    pub message: String,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub events_enqueued: u64,
    pub events_flushed: u64,
    pub events_succeeded: u64,
    pub events_failed: u64,
    pub events_dropped: u64,
    pub flush_count: u64,
    pub retry_count: u64,
    pub last_flush_time: Option<DateTime<Utc>>,
    pub failed_event_count: usize,
}

impl MetricsSnapshot {
    /// Percentage of flushed events the API accepted. 100 when nothing was flushed.
    pub fn success_rate(&self) -> f64 {
        if self.events_flushed == 0 {
            return 100.0;
        }
        self.events_succeeded as f64 / self.events_flushed as f64 * 100.0
    }

    /// Percentage of offered events rejected by a full queue.
    pub fn drop_rate(&self) -> f64 {
        let offered = self.events_enqueued + self.events_dropped;
        if offered == 0 {
            return 0.0;
        }
        self.events_dropped as f64 / offered as f64 * 100.0
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last_flush = self
            .last_flush_time
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "never".to_string());

        write!(
            f,
            "Enqueued: {}, Flushed: {} (Success: {}, Failed: {}), Dropped: {}, Retries: {}, Flushes: {}, LastFlush: {}",
            self.events_enqueued,
            self.events_flushed,
            self.events_succeeded,
            self.events_failed,
            self.events_dropped,
            self.retry_count,
            self.flush_count,
            last_flush
        )
    }
}

/// Delivery counters for one client.
///
/// Counters are independent atomics; the failed-event ring buffer has its own
/// lock. When constructed disabled every `record_*` call is a no-op.
#[derive(Debug)]
pub struct MetricsRecorder {
    enabled: bool,
    events_enqueued: AtomicU64,
    events_flushed: AtomicU64,
    events_succeeded: AtomicU64,
    events_failed: AtomicU64,
    events_dropped: AtomicU64,
    flush_count: AtomicU64,
    retry_count: AtomicU64,
    // Unix nanos, 0 = never
    last_flush_nanos: AtomicI64,
    failed_events: Mutex<VecDeque<FailedEvent>>,
}

impl MetricsRecorder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events_enqueued: AtomicU64::new(0),
            events_flushed: AtomicU64::new(0),
            events_succeeded: AtomicU64::new(0),
            events_failed: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            retry_count: AtomicU64::new(0),
            last_flush_nanos: AtomicI64::new(0),
            failed_events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_enqueued(&self, count: usize) {
        if !self.enabled {
            return;
        }
        self.events_enqueued
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Records one completed flush with the API's per-item result counts.
    pub fn record_flush(&self, success: usize, failed: usize) {
        if !self.enabled {
            return;
        }
        self.events_flushed
            .fetch_add((success + failed) as u64, Ordering::Relaxed);
        self.events_succeeded
            .fetch_add(success as u64, Ordering::Relaxed);
        self.events_failed.fetch_add(failed as u64, Ordering::Relaxed);
        self.flush_count.fetch_add(1, Ordering::Relaxed);

        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        self.last_flush_nanos.store(now, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: usize) {
        if !self.enabled {
            return;
        }
        self.events_dropped
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        if !self.enabled {
            return;
        }
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_event(&self, event: Event, error: &IngestError, attempt: u32) {
        if !self.enabled {
            return;
        }

        let failed = FailedEvent {
            event,
            error_kind: error.kind(),
            message: error.to_string(),
            attempt,
            timestamp: Utc::now(),
        };

        let mut events = self.failed_events.lock();
        if events.len() >= FAILED_EVENTS_CAPACITY {
            events.pop_front();
        }
        events.push_back(failed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let nanos = self.last_flush_nanos.load(Ordering::Relaxed);
        let last_flush_time = (nanos > 0).then(|| DateTime::from_timestamp_nanos(nanos));

        MetricsSnapshot {
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            events_flushed: self.events_flushed.load(Ordering::Relaxed),
            events_succeeded: self.events_succeeded.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
            retry_count: self.retry_count.load(Ordering::Relaxed),
            last_flush_time,
            failed_event_count: self.failed_events.lock().len(),
        }
    }

    pub fn failed_events(&self) -> Vec<FailedEvent> {
        self.failed_events.lock().iter().cloned().collect()
    }

    pub fn reset(&self) {
        self.events_enqueued.store(0, Ordering::Relaxed);
        self.events_flushed.store(0, Ordering::Relaxed);
        self.events_succeeded.store(0, Ordering::Relaxed);
        self.events_failed.store(0, Ordering::Relaxed);
        self.events_dropped.store(0, Ordering::Relaxed);
        self.flush_count.store(0, Ordering::Relaxed);
        self.retry_count.store(0, Ordering::Relaxed);
        self.last_flush_nanos.store(0, Ordering::Relaxed);
        self.failed_events.lock().clear();
    }
}
