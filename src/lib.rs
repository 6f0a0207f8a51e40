#![deny(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Counters and durations stay far below the limits
    clippy::cast_precision_loss,      // Acceptable for rates and gauges
    clippy::missing_errors_doc,       // Error enums document themselves
    clippy::module_name_repetitions,  // e.g. MetricsError in the metrics exporter
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

pub mod app;
pub mod buffer;
pub mod client;
pub mod config;
pub mod domain;
pub mod records;
pub mod reliability;
pub mod sender;

// Re-export main types for easy access
pub use client::{Client, ClientState, SHUTDOWN_TIMEOUT};
pub use config::{Config, ConfigError};
pub use domain::{Body, Event, EventType, IngestError};
pub use records::{
    EmbeddingParams, GenerationParams, ObservationLevel, ObservationParams, ScoreDataType,
    ScoreParams, SpanParams, Trace, TraceParams, Usage,
};
pub use reliability::{FailedEvent, MetricsSnapshot};
pub use sender::Transport;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
