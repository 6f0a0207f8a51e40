//! Read-side API: traces and sessions over authenticated GET requests.

use super::HttpClient;
use super::classify::{classify_network, classify_status};
use crate::domain::IngestError;
use crate::records::Usage;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use reqwest::header::ACCEPT;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceWithFullDetails {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_observations")]
    pub observations: Vec<ObservationDetails>,
    #[serde(default)]
    pub scores: Vec<ScoreData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDetails {
    pub id: String,
    #[serde(default)]
    pub trace_id: String,
    /// SPAN, GENERATION, EVENT, TOOL, ...
    #[serde(rename = "type", default)]
    pub observation_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub completion_start_time: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub parent_observation_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub model_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreData {
    pub id: String,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub observation_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithTraces {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub traces: Vec<TraceWithFullDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedTraces {
    #[serde(default)]
    pub data: Vec<TraceWithFullDetails>,
    #[serde(default)]
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ListTracesParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub session_id: Option<String>,
    pub from_timestamp: Option<String>,
    pub to_timestamp: Option<String>,
    pub tags: Vec<String>,
}

impl ListTracesParams {
    fn apply(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        if let Some(page) = self.page {
            query.append_pair("page", &page.to_string());
        }
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.to_string());
        }
        if let Some(user_id) = &self.user_id {
            query.append_pair("userId", user_id);
        }
        if let Some(name) = &self.name {
            query.append_pair("name", name);
        }
        if let Some(session_id) = &self.session_id {
            query.append_pair("sessionId", session_id);
        }
        if let Some(from) = &self.from_timestamp {
            query.append_pair("fromTimestamp", from);
        }
        if let Some(to) = &self.to_timestamp {
            query.append_pair("toTimestamp", to);
        }
        for tag in &self.tags {
            query.append_pair("tags", tag);
        }
    }
}

// Observations may arrive as an array, null, or some other shape; only an
// array of well-formed observations is kept.
fn lenient_observations<'de, D>(deserializer: D) -> Result<Vec<ObservationDetails>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct FetchClient {
    http: HttpClient,
}

impl FetchClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn get_trace(&self, trace_id: &str) -> Result<TraceWithFullDetails, IngestError> {
        if trace_id.is_empty() {
            return Err(IngestError::MissingParameter("trace_id"));
        }
        let url = self.http.endpoint(&format!("/api/public/traces/{trace_id}"));
        self.fetch_json(url).await
    }

    pub async fn list_traces(
        &self,
        params: &ListTracesParams,
    ) -> Result<PaginatedTraces, IngestError> {
        let mut url = self.http.endpoint("/api/public/traces");
        params.apply(&mut url);
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.fetch_json(url).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionWithTraces, IngestError> {
        if session_id.is_empty() {
            return Err(IngestError::MissingParameter("session_id"));
        }
        let url = self
            .http
            .endpoint(&format!("/api/public/sessions/{session_id}"));
        self.fetch_json(url).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, IngestError> {
        debug!("GET {}", url);

        let request = self
            .http
            .client
            .get(url)
            .header(ACCEPT, "application/json");

        let response = self
            .http
            .authorize(request)
            .send()
            .await
            .map_err(|e| classify_network(&e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify_network(&e))?;

        // Only 200 is a successful read.
        if status != 200 {
            classify_status(status, body.as_str())?;
            return Err(IngestError::Http { status, body });
        }

        serde_json::from_str(&body).map_err(|e| IngestError::InvalidResponse(e.to_string()))
    }
}
