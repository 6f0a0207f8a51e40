use super::{new_id, record_event};
use crate::client::Client;
use crate::domain::{EventType, IngestError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreDataType {
    #[default]
    Numeric,
    Categorical,
    Boolean,
}

/// A score attached to a trace or to one of its observations.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreParams {
    /// Score id; a uuid is generated when unset.
    #[serde(skip)]
    pub id: Option<String>,
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub data_type: ScoreDataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
}

impl Client {
    pub async fn create_score(&self, params: ScoreParams) -> Result<String, IngestError> {
        let id = params.id.clone().unwrap_or_else(new_id);
        self.enqueue(record_event(EventType::ScoreCreate, &id, &params)?)
            .await?;
        Ok(id)
    }
}
