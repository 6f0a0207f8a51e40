use std::fmt;

/// Lifecycle of a [`Client`](super::Client). Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Constructed without a running background task (disabled clients stay here).
    Created,
    /// Background flushing is active.
    Running,
    /// `close` has begun; no further events are accepted.
    Closed,
}

impl ClientState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::Created => "created",
            ClientState::Running => "running",
            ClientState::Closed => "closed",
        }
    }

    pub fn accepts_events(&self) -> bool {
        !matches!(self, ClientState::Closed)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
