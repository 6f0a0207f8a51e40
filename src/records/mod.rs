//! Typed builders for the records the ingestion API understands.
//!
//! Each builder turns a parameter struct into an [`Event`] body with camelCase
//! keys, leaving out every field that was not set.

pub mod observation;
pub mod score;
pub mod trace;

pub use observation::{
    EmbeddingParams, GenerationParams, ObservationLevel, ObservationParams, SpanParams, Usage,
};
pub use score::{ScoreDataType, ScoreParams};
pub use trace::{Trace, TraceParams};

use crate::domain::{Body, Event, EventType, IngestError};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds an event whose body is `{"id": id, ...params}`.
pub(crate) fn record_event<P: Serialize>(
    event_type: EventType,
    id: &str,
    params: &P,
) -> Result<Event, IngestError> {
    let mut body = Body::new();
    body.insert("id".to_string(), Value::String(id.to_string()));
    body.extend(to_body(params)?);
    Ok(Event::new(event_type, body))
}

fn to_body<P: Serialize>(params: &P) -> Result<Body, IngestError> {
    match serde_json::to_value(params)? {
        Value::Object(map) => Ok(map),
        _ => Err(IngestError::Serialization(serde::ser::Error::custom(
            "record parameters must serialize to a JSON object",
        ))),
    }
}

/// Optional timestamps in the wire format (RFC 3339, nanoseconds, `Z`).
pub(crate) mod opt_timestamp {
    use crate::domain::format_timestamp;
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }
}
