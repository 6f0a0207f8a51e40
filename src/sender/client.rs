use crate::config::{Config, ConfigError};
use crate::domain::IngestError;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::time::Duration;
use url::Url;

pub const INGESTION_PATH: &str = "/api/public/ingestion";
pub const SDK_NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub public_key: String,
    pub secret_key: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub sdk_name: String,
    pub sdk_version: String,
    pub sdk_integration: Option<String>,
    pub user_agent: String,
    pub debug: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            public_key: String::new(),
            secret_key: String::new(),
            timeout: Duration::from_secs(10),
            connection_timeout: Duration::from_secs(5),
            sdk_name: SDK_NAME.to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            sdk_integration: None,
            user_agent: format!("{}/{}", SDK_NAME, env!("CARGO_PKG_VERSION")),
            debug: false,
        }
    }
}

impl From<&Config> for TransportConfig {
    fn from(config: &Config) -> Self {
        let timeout = config.timeout();
        Self {
            base_url: config.base_url.clone(),
            public_key: config.public_key.clone(),
            secret_key: config.secret_key.clone(),
            timeout,
            connection_timeout: std::cmp::min(timeout, Duration::from_secs(5)),
            sdk_version: config.sdk_version.clone(),
            sdk_integration: config.sdk_integration.clone(),
            debug: config.debug,
            ..Self::default()
        }
    }
}

/// Shared HTTP plumbing for the ingestion transport and the fetch API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub config: TransportConfig,
    base_url: Url,
    pub ingestion_url: Url,
}

impl HttpClient {
    pub fn new(config: TransportConfig) -> Result<Self, IngestError> {
        let base_url: Url = config
            .base_url
            .trim_end_matches('/')
            .parse()
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base URL: {e}")))?;
        let ingestion_url = join_path(&base_url, INGESTION_PATH);

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| {
                ConfigError::InvalidValue {
                    field: "http_client",
                    message: format!("Failed to build HTTP client: {e}"),
                }
            })?;

        Ok(Self {
            client,
            config,
            base_url,
            ingestion_url,
        })
    }

    /// Resolves an API path (e.g. `/api/public/traces/abc`) against the base URL,
    /// keeping any path prefix the base URL carries.
    pub fn endpoint(&self, path: &str) -> Url {
        join_path(&self.base_url, path)
    }

    /// Attaches Basic authentication for the project keys.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.public_key, Some(&self.config.secret_key))
    }
}

fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}{path}"));
    url
}
