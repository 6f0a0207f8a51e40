//! Maps transport outcomes onto [`IngestError`] variants.
//!
//! The classification is the single source of truth for what the batcher
//! retries: `Network`, `RateLimited` and `Server` are retryable, everything
//! else is a permanent failure.

use crate::domain::IngestError;

/// Status codes the ingestion endpoint uses for a processed batch.
pub fn is_success_status(status: u16) -> bool {
    matches!(status, 200 | 207)
}

/// Classifies an HTTP response. `Ok(())` means the body should be parsed.
pub fn classify_status(status: u16, body: impl Into<String>) -> Result<(), IngestError> {
    if is_success_status(status) {
        return Ok(());
    }

    let body = body.into();
    Err(match status {
        429 => IngestError::RateLimited { body },
        500..=599 => IngestError::Server { status, body },
        400..=499 => IngestError::Client { status, body },
        _ => IngestError::Http { status, body },
    })
}

/// Classifies a failure that happened before any response arrived.
pub fn classify_network(err: &reqwest::Error) -> IngestError {
    if err.is_timeout() {
        IngestError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        IngestError::Network(format!("connection failed: {err}"))
    } else {
        IngestError::Network(err.to_string())
    }
}
