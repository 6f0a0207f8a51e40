use crate::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Top-level error type for the ingestion pipeline.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event queue is full ({max_size} events)")]
    QueueFull { max_size: usize },

    #[error("Client is closed")]
    Closed,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited (HTTP 429): {body}")]
    RateLimited { body: String },

    #[error("Server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Client error (HTTP {status}): {body}")]
    Client { status: u16, body: String },

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to encode ingestion request: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Client is disabled")]
    Disabled,

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Coarse classification of an [`IngestError`], used for metrics and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    QueueFull,
    Closed,
    Network,
    RateLimited,
    ServerError,
    ClientError,
    Http,
    Serialization,
    InvalidResponse,
    Disabled,
    MissingParameter,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::RateLimited | ErrorKind::ServerError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::QueueFull => "QUEUE_FULL",
            ErrorKind::Closed => "CLIENT_CLOSED",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::ClientError => "CLIENT_ERROR",
            ErrorKind::Http => "HTTP_ERROR",
            ErrorKind::Serialization => "SERIALIZATION_ERROR",
            ErrorKind::InvalidResponse => "INVALID_RESPONSE",
            ErrorKind::Disabled => "DISABLED",
            ErrorKind::MissingParameter => "MISSING_PARAMETER",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Config(_) => ErrorKind::Config,
            IngestError::QueueFull { .. } => ErrorKind::QueueFull,
            IngestError::Closed => ErrorKind::Closed,
            IngestError::Network(_) => ErrorKind::Network,
            IngestError::RateLimited { .. } => ErrorKind::RateLimited,
            IngestError::Server { .. } => ErrorKind::ServerError,
            IngestError::Client { .. } => ErrorKind::ClientError,
            IngestError::Http { .. } => ErrorKind::Http,
            IngestError::Serialization(_) => ErrorKind::Serialization,
            IngestError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            IngestError::Disabled => ErrorKind::Disabled,
            IngestError::MissingParameter(_) => ErrorKind::MissingParameter,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            IngestError::RateLimited { .. } => Some(429),
            IngestError::Server { status, .. }
            | IngestError::Client { status, .. }
            | IngestError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Network(err.to_string())
    }
}
