use crate::domain::Event;
use std::fmt;
use uuid::Uuid;

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Queue length reached `flush_at`.
    Size,
    /// Background timer tick.
    Interval,
    /// Explicit `flush` call.
    Manual,
    /// Final flush during `close`.
    Shutdown,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Interval => "interval",
            FlushTrigger::Manual => "manual",
            FlushTrigger::Shutdown => "shutdown",
        }
    }

    /// Only the background timer waits out a retry backoff. Size flushes run
    /// as soon as `flush_at` is reached.
    pub fn waits_for_backoff(&self) -> bool {
        matches!(self, FlushTrigger::Interval)
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of the queue claimed by one flush.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    events: Vec<Event>,
    trigger: FlushTrigger,
}

impl Batch {
    pub fn new(events: Vec<Event>, trigger: FlushTrigger) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            events,
            trigger,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn trigger(&self) -> FlushTrigger {
        self.trigger
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
