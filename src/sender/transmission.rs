use super::HttpClient;
use super::classify::{classify_network, classify_status};
use crate::buffer::Batch;
use crate::domain::{IngestError, IngestionRequest, IngestionResponse};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::Instant;
use tracing::{debug, warn};

/// Sends one batch to the ingestion endpoint. Implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, batch: &Batch) -> Result<IngestionResponse, IngestError>;
}

#[derive(Clone)]
pub struct BatchTransmitter {
    pub client: HttpClient,
    headers: HeaderMap,
}

impl BatchTransmitter {
    pub fn new(client: HttpClient) -> Result<Self, IngestError> {
        let headers = build_headers(&client)?;
        Ok(Self { client, headers })
    }

    pub fn prepare_payload(&self, batch: &Batch) -> Result<Vec<u8>, IngestError> {
        let request = IngestionRequest {
            batch: batch.events(),
            metadata: None,
        };
        Ok(serde_json::to_vec(&request)?)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn log_item_errors(&self, batch: &Batch, response: &IngestionResponse) {
        if response.errors.is_empty() {
            return;
        }

        for item in &response.errors {
            let id = item.id.as_deref().unwrap_or("-");
            let message = item.message.as_deref().unwrap_or("");
            if self.client.config.debug {
                warn!(
                    batch_id = %batch.id(),
                    event_id = id,
                    status = item.status,
                    "Ingestion API rejected event: {} {}",
                    item.error,
                    message
                );
            } else {
                debug!(
                    batch_id = %batch.id(),
                    event_id = id,
                    status = item.status,
                    "Ingestion API rejected event: {} {}",
                    item.error,
                    message
                );
            }
        }
    }
}

#[async_trait]
impl Transport for BatchTransmitter {
    async fn send(&self, batch: &Batch) -> Result<IngestionResponse, IngestError> {
        let start = Instant::now();
        let payload = self.prepare_payload(batch)?;

        debug!(
            batch_id = %batch.id(),
            batch_size = batch.size(),
            trigger = %batch.trigger(),
            bytes = payload.len(),
            "Sending batch to {}",
            self.client.ingestion_url
        );

        let request = self
            .client
            .client
            .post(self.client.ingestion_url.clone())
            .headers(self.headers.clone())
            .body(payload);

        let response = self
            .client
            .authorize(request)
            .send()
            .await
            .map_err(|e| classify_network(&e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify_network(&e))?;
        let latency = start.elapsed();

        if let Err(e) = classify_status(status, body.as_str()) {
            warn!(
                batch_id = %batch.id(),
                status,
                retryable = e.is_retryable(),
                "Ingestion request failed"
            );
            return Err(e);
        }

        let parsed = if body.trim().is_empty() {
            IngestionResponse::default()
        } else {
            serde_json::from_str::<IngestionResponse>(&body)
                .map_err(|e| IngestError::InvalidResponse(format!("{e}: {body}")))?
        };

        debug!(
            batch_id = %batch.id(),
            status,
            successes = parsed.success_count(),
            errors = parsed.error_count(),
            "Batch delivered in {:?}",
            latency
        );
        self.log_item_errors(batch, &parsed);

        Ok(parsed)
    }
}

fn build_headers(client: &HttpClient) -> Result<HeaderMap, IngestError> {
    let config = &client.config;
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-sdk-name"),
        header_value("sdk name", &config.sdk_name)?,
    );
    headers.insert(
        HeaderName::from_static("x-sdk-version"),
        header_value("sdk version", &config.sdk_version)?,
    );
    if let Some(integration) = &config.sdk_integration {
        headers.insert(
            HeaderName::from_static("x-sdk-integration"),
            header_value("sdk integration", integration)?,
        );
    }

    Ok(headers)
}

fn header_value(field: &'static str, value: &str) -> Result<HeaderValue, IngestError> {
    HeaderValue::from_str(value).map_err(|e| {
        crate::config::ConfigError::InvalidValue {
            field,
            message: format!("not a valid header value: {e}"),
        }
        .into()
    })
}
