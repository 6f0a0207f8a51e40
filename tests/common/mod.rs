#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use langfuse_ingest::buffer::{Batch, BatchConfig};
use langfuse_ingest::domain::{Body, Event, EventType, IngestError, IngestionResponse, SuccessResult};
use langfuse_ingest::reliability::RetryConfig;
use langfuse_ingest::sender::Transport;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;

/// What the fake transport does with one send.
#[derive(Debug, Clone)]
pub enum Outcome {
    Accept,
    Network,
    RateLimited,
    Server(u16),
    Client(u16),
    /// Accept, after holding the request for the given time.
    Slow(Duration),
    /// Fail with a server status, after holding the request for the given time.
    SlowServer(Duration, u16),
}

impl Outcome {
    fn into_error(self) -> Option<IngestError> {
        match self {
            Outcome::Accept | Outcome::Slow(_) => None,
            Outcome::Network => Some(IngestError::Network("connection refused".to_string())),
            Outcome::RateLimited => Some(IngestError::RateLimited {
                body: "slow down".to_string(),
            }),
            Outcome::Server(status) | Outcome::SlowServer(_, status) => Some(IngestError::Server {
                status,
                body: "unavailable".to_string(),
            }),
            Outcome::Client(status) => Some(IngestError::Client {
                status,
                body: "bad request".to_string(),
            }),
        }
    }
}

/// Transport that plays back scripted outcomes and records every batch it saw.
/// Once the script runs out every send is accepted.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    sent: Mutex<Vec<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, outcome: Outcome) {
        self.script.lock().push_back(outcome);
    }

    /// Event ids of every batch handed to `send`, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.sent.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn sent_ids(&self) -> Vec<String> {
        self.sent.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, batch: &Batch) -> Result<IngestionResponse, IngestError> {
        let ids: Vec<String> = batch.events().iter().map(|e| e.id().to_string()).collect();
        self.sent.lock().push(ids.clone());

        let outcome = self.script.lock().pop_front().unwrap_or(Outcome::Accept);
        if let Outcome::Slow(delay) | Outcome::SlowServer(delay, _) = outcome {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = outcome.into_error() {
            return Err(error);
        }

        Ok(IngestionResponse {
            successes: ids
                .into_iter()
                .map(|id| SuccessResult {
                    id,
                    status: 201,
                    message: None,
                })
                .collect(),
            errors: Vec::new(),
        })
    }
}

pub fn event(id: &str) -> Event {
    let mut body = Body::new();
    body.insert("name".to_string(), json!(format!("event {id}")));
    Event::with_id(
        id,
        EventType::EventCreate,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        body,
    )
}

pub fn events(prefix: &str, count: usize) -> Vec<Event> {
    (0..count).map(|i| event(&format!("{prefix}{i}"))).collect()
}

/// Batch settings with the timer effectively off and fast, jitter-free retries.
pub fn batch_config(flush_at: usize, max_queue_size: usize) -> BatchConfig {
    BatchConfig {
        flush_at,
        max_queue_size,
        flush_interval: Duration::from_secs(3600),
        flush_timeout: Duration::from_secs(5),
        retry: RetryConfig {
            max_attempts: 0,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(200),
            jitter: false,
            ..RetryConfig::default()
        },
        ..BatchConfig::default()
    }
}
