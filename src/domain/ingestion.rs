use super::event::{Body, Event};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/public/ingestion`.
#[derive(Debug, Serialize)]
pub struct IngestionRequest<'a> {
    pub batch: &'a [Event],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Body>,
}

/// Per-item outcome of an accepted ingestion batch (HTTP 200 / 207).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionResponse {
    #[serde(default)]
    pub successes: Vec<SuccessResult>,
    #[serde(default)]
    pub errors: Vec<ErrorResult>,
}

impl IngestionResponse {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResult {
    pub id: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: u16,
    // The API sends either a string or a structured object here.
    #[serde(default)]
    pub error: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
