pub mod classify;
pub mod client;
pub mod fetch;
pub mod transmission;

pub use classify::{classify_network, classify_status, is_success_status};
pub use client::{HttpClient, INGESTION_PATH, SDK_NAME, TransportConfig};
pub use fetch::{
    FetchClient, ListTracesParams, ObservationDetails, PaginatedTraces, PaginationMeta,
    ScoreData, SessionWithTraces, TraceWithFullDetails,
};
pub use transmission::{BatchTransmitter, Transport};

#[cfg(test)]
pub use transmission::MockTransport;
