use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Ordered JSON object used for event bodies and metadata.
pub type Body = Map<String, Value>;

/// Ingestion event type tag, serialized in kebab-case (`trace-create`, `sdk-log`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    TraceCreate,
    ScoreCreate,
    EventCreate,
    SpanCreate,
    SpanUpdate,
    GenerationCreate,
    GenerationUpdate,
    AgentCreate,
    ToolCreate,
    ChainCreate,
    RetrieverCreate,
    EvaluatorCreate,
    EmbeddingCreate,
    GuardrailCreate,
    SdkLog,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TraceCreate => "trace-create",
            EventType::ScoreCreate => "score-create",
            EventType::EventCreate => "event-create",
            EventType::SpanCreate => "span-create",
            EventType::SpanUpdate => "span-update",
            EventType::GenerationCreate => "generation-create",
            EventType::GenerationUpdate => "generation-update",
            EventType::AgentCreate => "agent-create",
            EventType::ToolCreate => "tool-create",
            EventType::ChainCreate => "chain-create",
            EventType::RetrieverCreate => "retriever-create",
            EventType::EvaluatorCreate => "evaluator-create",
            EventType::EmbeddingCreate => "embedding-create",
            EventType::GuardrailCreate => "guardrail-create",
            EventType::SdkLog => "sdk-log",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single telemetry record queued for delivery.
///
/// Events are immutable once built: the queue owns them until they are sent
/// or dropped, and a retried batch resends exactly the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: String,
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(with = "rfc3339_nanos")]
    timestamp: DateTime<Utc>,
    body: Body,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Body>,
}

impl Event {
    /// Creates an event with a fresh uuid and the current time.
    pub fn new(event_type: EventType, body: Body) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            body,
            metadata: None,
        }
    }

    pub fn with_id(
        id: impl Into<String>,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        body: Body,
    ) -> Self {
        Self {
            id: id.into(),
            event_type,
            timestamp,
            body,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Body) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn metadata(&self) -> Option<&Body> {
        self.metadata.as_ref()
    }
}

/// Formats a timestamp the way the ingestion API expects it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

mod rfc3339_nanos {
    use super::*;

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_event_serializes_wire_shape() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let mut body = Body::new();
        body.insert("name".to_string(), json!("checkout"));
        body.insert("id".to_string(), json!("trace-1"));

        let event = Event::with_id("evt-1", EventType::TraceCreate, ts, body);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["id"], "evt-1");
        assert_eq!(value["type"], "trace-create");
        assert_eq!(value["timestamp"], "2024-05-01T12:30:00.000000000Z");
        assert!(value.get("metadata").is_none());

        // Body keys keep insertion order on the wire.
        let keys: Vec<_> = value["body"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "id"]);
    }

    #[test]
    fn test_event_type_tags() {
        assert_eq!(EventType::SdkLog.as_str(), "sdk-log");
        assert_eq!(
            serde_json::to_value(EventType::GenerationUpdate).unwrap(),
            json!("generation-update")
        );
        let parsed: EventType = serde_json::from_value(json!("guardrail-create")).unwrap();
        assert_eq!(parsed, EventType::GuardrailCreate);
    }

    #[test]
    fn test_event_parses_with_metadata() {
        let raw = json!({
            "id": "evt-2",
            "type": "span-update",
            "timestamp": "2024-05-01T12:30:00.123456789+02:00",
            "body": {"id": "span-1"},
            "metadata": {"sdk": "test"}
        });
        let event: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(event.event_type(), EventType::SpanUpdate);
        assert_eq!(event.timestamp().timestamp_subsec_nanos(), 123_456_789);
        assert_eq!(event.metadata().unwrap()["sdk"], "test");
    }

    #[test]
    fn test_new_events_get_unique_ids() {
        let a = Event::new(EventType::SdkLog, Body::new());
        let b = Event::new(EventType::SdkLog, Body::new());
        assert_ne!(a.id(), b.id());
    }
}
