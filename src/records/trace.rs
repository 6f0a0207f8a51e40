use super::observation::{EmbeddingParams, GenerationParams, ObservationParams, SpanParams};
use super::score::ScoreParams;
use super::{new_id, opt_timestamp, record_event};
use crate::client::Client;
use crate::domain::{Body, EventType, IngestError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceParams {
    /// Trace id; a uuid is generated when unset.
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "opt_timestamp::serialize"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Body>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
}

impl TraceParams {
    /// Overlays every field set in `update`; metadata keys are merged.
    fn merge(&mut self, update: TraceParams) {
        fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *target = value;
            }
        }

        overlay(&mut self.name, update.name);
        overlay(&mut self.timestamp, update.timestamp);
        overlay(&mut self.input, update.input);
        overlay(&mut self.output, update.output);
        overlay(&mut self.user_id, update.user_id);
        overlay(&mut self.session_id, update.session_id);
        overlay(&mut self.environment, update.environment);
        overlay(&mut self.version, update.version);
        overlay(&mut self.release, update.release);
        overlay(&mut self.public, update.public);

        if let Some(metadata) = update.metadata {
            self.metadata.get_or_insert_with(Body::new).extend(metadata);
        }
        if !update.tags.is_empty() {
            self.tags = update.tags;
        }
    }
}

/// Handle to a trace that has been queued.
///
/// Observations created through the handle are bound to its id.
#[derive(Clone)]
pub struct Trace {
    client: Client,
    id: String,
    params: TraceParams,
}

impl Trace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn params(&self) -> &TraceParams {
        &self.params
    }

    /// Merges `params` into the trace and re-emits `trace-create`, which the
    /// server treats as an upsert.
    pub async fn update(&mut self, params: TraceParams) -> Result<(), IngestError> {
        self.params.merge(params);
        self.client
            .enqueue(record_event(EventType::TraceCreate, &self.id, &self.params)?)
            .await
    }

    pub async fn create_span(&self, params: SpanParams) -> Result<String, IngestError> {
        self.client.create_span(&self.id, params).await
    }

    pub async fn create_event(&self, params: ObservationParams) -> Result<String, IngestError> {
        self.client.create_event(&self.id, params).await
    }

    pub async fn create_generation(&self, params: GenerationParams) -> Result<String, IngestError> {
        self.client.create_generation(&self.id, params).await
    }

    pub async fn create_agent(&self, params: SpanParams) -> Result<String, IngestError> {
        self.client.create_agent(&self.id, params).await
    }

    pub async fn create_tool(&self, params: SpanParams) -> Result<String, IngestError> {
        self.client.create_tool(&self.id, params).await
    }

    pub async fn create_chain(&self, params: SpanParams) -> Result<String, IngestError> {
        self.client.create_chain(&self.id, params).await
    }

    pub async fn create_retriever(&self, params: SpanParams) -> Result<String, IngestError> {
        self.client.create_retriever(&self.id, params).await
    }

    pub async fn create_evaluator(&self, params: SpanParams) -> Result<String, IngestError> {
        self.client.create_evaluator(&self.id, params).await
    }

    pub async fn create_embedding(&self, params: EmbeddingParams) -> Result<String, IngestError> {
        self.client.create_embedding(&self.id, params).await
    }

    pub async fn create_guardrail(&self, params: ObservationParams) -> Result<String, IngestError> {
        self.client.create_guardrail(&self.id, params).await
    }

    pub async fn create_score(&self, mut params: ScoreParams) -> Result<String, IngestError> {
        params.trace_id = Some(self.id.clone());
        self.client.create_score(params).await
    }
}

impl Client {
    pub async fn create_trace(&self, params: TraceParams) -> Result<Trace, IngestError> {
        let id = params.id.clone().unwrap_or_else(new_id);
        self.enqueue(record_event(EventType::TraceCreate, &id, &params)?)
            .await?;

        Ok(Trace {
            client: self.clone(),
            id,
            params,
        })
    }
}
