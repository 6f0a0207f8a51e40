use crate::domain::Event;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Result of restoring a failed snapshot to the queue.
#[derive(Debug, Default)]
pub struct RequeueOutcome {
    /// Events put back at the front of the queue.
    pub restored: usize,
    /// Events that reached the attempt limit, with their attempt count.
    pub exhausted: Vec<(Event, u32)>,
    /// Events that no longer fit under the queue bound, with their attempt count.
    pub overflowed: Vec<(Event, u32)>,
}

struct QueueInner {
    events: VecDeque<Event>,
    // Failed flush attempts per event id, for events that have failed at least once.
    attempts: HashMap<String, u32>,
}

/// Bounded FIFO of pending events.
///
/// Every operation takes one short `parking_lot` critical section; callers
/// never hold it across an `.await`.
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    max_size: usize,
}

impl EventQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                events: VecDeque::with_capacity(max_size.min(4096)),
                attempts: HashMap::new(),
            }),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends an event and returns the new length, or hands the event back
    /// when the queue is full.
    pub fn push(&self, event: Event) -> Result<usize, Event> {
        let mut inner = self.inner.lock();
        if inner.events.len() >= self.max_size {
            return Err(event);
        }
        inner.events.push_back(event);
        Ok(inner.events.len())
    }

    /// Moves every queued event out, in queue order.
    pub fn drain(&self) -> Vec<Event> {
        let mut inner = self.inner.lock();
        inner.events.drain(..).collect()
    }

    /// Restores a failed snapshot ahead of anything queued since it was taken.
    ///
    /// Each event's attempt count is incremented first; events for which
    /// `give_up` returns true are handed back instead of restored. If the
    /// remaining events do not fit under the bound, the oldest are handed back.
    pub fn requeue_front<F>(&self, snapshot: Vec<Event>, give_up: F) -> RequeueOutcome
    where
        F: Fn(u32) -> bool,
    {
        let mut outcome = RequeueOutcome::default();
        let mut inner = self.inner.lock();

        let mut retained = Vec::with_capacity(snapshot.len());
        for event in snapshot {
            let attempts = {
                let count = inner.attempts.entry(event.id().to_string()).or_insert(0);
                *count = count.saturating_add(1);
                *count
            };
            if give_up(attempts) {
                inner.attempts.remove(event.id());
                outcome.exhausted.push((event, attempts));
            } else {
                retained.push((event, attempts));
            }
        }

        let room = self.max_size.saturating_sub(inner.events.len());
        if retained.len() > room {
            let excess = retained.len() - room;
            for (event, attempts) in retained.drain(..excess) {
                inner.attempts.remove(event.id());
                outcome.overflowed.push((event, attempts));
            }
        }

        outcome.restored = retained.len();
        for (event, _) in retained.into_iter().rev() {
            inner.events.push_front(event);
        }

        outcome
    }

    /// Forgets retry state for events that left the queue for good and returns
    /// the failed attempts each had accumulated.
    pub fn settle(&self, events: &[Event]) -> Vec<u32> {
        let mut inner = self.inner.lock();
        if inner.attempts.is_empty() {
            return vec![0; events.len()];
        }
        events
            .iter()
            .map(|event| inner.attempts.remove(event.id()).unwrap_or(0))
            .collect()
    }

    pub fn attempts(&self, event_id: &str) -> u32 {
        self.inner
            .lock()
            .attempts
            .get(event_id)
            .copied()
            .unwrap_or(0)
    }

    /// Ids of the queued events, front first.
    pub fn ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .events
            .iter()
            .map(|e| e.id().to_string())
            .collect()
    }
}
