//! Domain layer for langfuse-ingest.
//!
//! Contains the canonical types shared across all modules:
//! - `Event`: the unit of work carried through the queue
//! - `IngestionRequest` / `IngestionResponse`: wire DTOs
//! - `IngestError`: top-level error type

pub mod error;
pub mod event;
pub mod ingestion;

pub use error::{ErrorKind, IngestError};
pub use event::{Body, Event, EventType, format_timestamp};
pub use ingestion::{ErrorResult, IngestionRequest, IngestionResponse, SuccessResult};
