use super::{new_id, opt_timestamp, record_event};
use crate::client::Client;
use crate::domain::{Body, EventType, IngestError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationLevel {
    Debug,
    Default,
    Warning,
    Error,
}

/// Token usage and cost of a generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
}

/// Fields shared by every observation kind.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationParams {
    /// Observation id; a uuid is generated when unset.
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_observation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "opt_timestamp::serialize"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Body>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ObservationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Span-shaped observations: spans, agents, tools, chains, retrievers, evaluators.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanParams {
    #[serde(flatten)]
    pub observation: ObservationParams,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "opt_timestamp::serialize"
    )]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(flatten)]
    pub span: SpanParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<Body>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "opt_timestamp::serialize"
    )]
    pub completion_start_time: Option<DateTime<Utc>>,
}

/// Embedding calls report their model under the generation field names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmbeddingParams {
    #[serde(flatten)]
    pub span: SpanParams,
    #[serde(rename = "model", skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(rename = "modelParameters", skip_serializing_if = "Option::is_none")]
    pub embedding_model_parameters: Option<Body>,
}

impl ObservationParams {
    fn bind(&mut self, trace_id: &str) -> String {
        self.trace_id = Some(trace_id.to_string());
        self.id.clone().unwrap_or_else(new_id)
    }
}

impl Client {
    async fn create_observation<P: Serialize>(
        &self,
        event_type: EventType,
        id: String,
        params: &P,
    ) -> Result<String, IngestError> {
        self.enqueue(record_event(event_type, &id, params)?).await?;
        Ok(id)
    }

    async fn create_span_like(
        &self,
        event_type: EventType,
        trace_id: &str,
        mut params: SpanParams,
    ) -> Result<String, IngestError> {
        let id = params.observation.bind(trace_id);
        self.create_observation(event_type, id, &params).await
    }

    pub async fn create_span(
        &self,
        trace_id: &str,
        params: SpanParams,
    ) -> Result<String, IngestError> {
        self.create_span_like(EventType::SpanCreate, trace_id, params)
            .await
    }

    /// Emits `span-update` for an existing span.
    pub async fn update_span(&self, span_id: &str, params: SpanParams) -> Result<(), IngestError> {
        self.create_observation(EventType::SpanUpdate, span_id.to_string(), &params)
            .await
            .map(|_| ())
    }

    pub async fn create_event(
        &self,
        trace_id: &str,
        mut params: ObservationParams,
    ) -> Result<String, IngestError> {
        let id = params.bind(trace_id);
        self.create_observation(EventType::EventCreate, id, &params)
            .await
    }

    pub async fn create_generation(
        &self,
        trace_id: &str,
        mut params: GenerationParams,
    ) -> Result<String, IngestError> {
        let id = params.span.observation.bind(trace_id);
        self.create_observation(EventType::GenerationCreate, id, &params)
            .await
    }

    pub async fn update_generation(
        &self,
        generation_id: &str,
        params: GenerationParams,
    ) -> Result<(), IngestError> {
        self.create_observation(
            EventType::GenerationUpdate,
            generation_id.to_string(),
            &params,
        )
        .await
        .map(|_| ())
    }

    pub async fn create_agent(
        &self,
        trace_id: &str,
        params: SpanParams,
    ) -> Result<String, IngestError> {
        self.create_span_like(EventType::AgentCreate, trace_id, params)
            .await
    }

    pub async fn create_tool(
        &self,
        trace_id: &str,
        params: SpanParams,
    ) -> Result<String, IngestError> {
        self.create_span_like(EventType::ToolCreate, trace_id, params)
            .await
    }

    /// Tools are spans on the server side, so updates use `span-update`.
    pub async fn update_tool(&self, tool_id: &str, params: SpanParams) -> Result<(), IngestError> {
        self.update_span(tool_id, params).await
    }

    pub async fn create_chain(
        &self,
        trace_id: &str,
        params: SpanParams,
    ) -> Result<String, IngestError> {
        self.create_span_like(EventType::ChainCreate, trace_id, params)
            .await
    }

    pub async fn create_retriever(
        &self,
        trace_id: &str,
        params: SpanParams,
    ) -> Result<String, IngestError> {
        self.create_span_like(EventType::RetrieverCreate, trace_id, params)
            .await
    }

    pub async fn create_evaluator(
        &self,
        trace_id: &str,
        params: SpanParams,
    ) -> Result<String, IngestError> {
        self.create_span_like(EventType::EvaluatorCreate, trace_id, params)
            .await
    }

    pub async fn create_embedding(
        &self,
        trace_id: &str,
        mut params: EmbeddingParams,
    ) -> Result<String, IngestError> {
        let id = params.span.observation.bind(trace_id);
        self.create_observation(EventType::EmbeddingCreate, id, &params)
            .await
    }

    pub async fn create_guardrail(
        &self,
        trace_id: &str,
        mut params: ObservationParams,
    ) -> Result<String, IngestError> {
        let id = params.bind(trace_id);
        self.create_observation(EventType::GuardrailCreate, id, &params)
            .await
    }

    /// Ships an arbitrary JSON value as an `sdk-log` event.
    pub async fn create_sdk_log(&self, log: Value) -> Result<(), IngestError> {
        let mut body = Body::new();
        body.insert("log".to_string(), log);
        self.enqueue(crate::domain::Event::new(EventType::SdkLog, body))
            .await
    }
}
