use super::env::{
    load_env_bool, load_env_path_opt, load_env_string, load_env_string_opt, load_env_var,
};
use super::{Callbacks, ConfigError, LogLevel};
use crate::reliability::RetryConfig;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://cloud.langfuse.com";

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Project public key
    #[arg(long, env = "LANGFUSE_PUBLIC_KEY", default_value = "")]
    pub public_key: String,

    /// Project secret key
    #[arg(
        long,
        env = "LANGFUSE_SECRET_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub secret_key: String,

    /// API base URL
    #[arg(long, env = "LANGFUSE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Flush interval in milliseconds
    #[arg(long, env = "LANGFUSE_FLUSH_INTERVAL_MS", default_value = "1000")]
    pub flush_interval_ms: u64,

    /// Number of queued events that triggers an immediate flush
    #[arg(long, env = "LANGFUSE_FLUSH_AT", default_value = "15")]
    pub flush_at: usize,

    /// Maximum number of queued events before new events are rejected
    #[arg(long, env = "LANGFUSE_MAX_QUEUE_SIZE", default_value = "1000")]
    pub max_queue_size: usize,

    /// HTTP request timeout in milliseconds
    #[arg(long, env = "LANGFUSE_TIMEOUT_MS", default_value = "10000")]
    pub timeout_ms: u64,

    /// Integration name reported in the X-Sdk-Integration header
    #[arg(long, env = "LANGFUSE_SDK_INTEGRATION")]
    pub sdk_integration: Option<String>,

    /// SDK version reported in the X-Sdk-Version header
    #[arg(long, env = "LANGFUSE_SDK_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub sdk_version: String,

    /// Enable event delivery (when false every operation is a no-op)
    #[arg(
        long,
        env = "LANGFUSE_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enabled: bool,

    /// Log flush diagnostics at warn level
    #[arg(long, env = "LANGFUSE_DEBUG")]
    pub debug: bool,

    /// Collect delivery metrics
    #[arg(long, env = "LANGFUSE_METRICS_ENABLED")]
    pub metrics_enabled: bool,

    /// Failed flush attempts after which an event is dropped (0 = retry until delivered)
    #[arg(long, env = "LANGFUSE_MAX_RETRY_ATTEMPTS", default_value = "0")]
    pub max_retry_attempts: u32,

    /// Base delay for retry backoff in milliseconds
    #[arg(long, env = "LANGFUSE_RETRY_BASE_DELAY_MS", default_value = "5000")]
    pub retry_base_delay_ms: u64,

    /// Maximum delay for retry backoff in milliseconds
    #[arg(long, env = "LANGFUSE_RETRY_MAX_DELAY_MS", default_value = "30000")]
    pub retry_max_delay_ms: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Configuration file path (optional)
    #[arg(long, env = "LANGFUSE_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Runtime hooks (not exposed as CLI args or file keys)
    #[serde(skip)]
    #[arg(skip)]
    pub callbacks: Callbacks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            secret_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            flush_interval_ms: 1000,
            flush_at: 15,
            max_queue_size: 1000,
            timeout_ms: 10_000,
            sdk_integration: None,
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            enabled: true,
            debug: false,
            metrics_enabled: false,
            max_retry_attempts: 0,
            retry_base_delay_ms: 5000,
            retry_max_delay_ms: 30_000,
            log_level: LogLevel::Info,
            log_json: false,
            config_file: None,
            callbacks: Callbacks::default(),
        }
    }
}

impl Config {
    /// Default configuration with the given project keys.
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn on_event_flushed<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.callbacks.on_event_flushed = Some(Arc::new(callback));
        self
    }

    pub fn on_event_dropped<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.callbacks.on_event_dropped = Some(Arc::new(callback));
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            jitter: true,
        }
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Config::try_parse_from(args)
            .map_err(|e| ConfigError::ArgsError(e.to_string()))?
            .resolve()
    }

    /// Finishes parsed arguments: a config file, when named, replaces the
    /// argument values entirely. The result is validated.
    pub fn resolve(self) -> Result<Self, ConfigError> {
        if let Some(path) = &self.config_file {
            return Self::from_file(path);
        }

        self.validate()?;
        Ok(self)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("LANGFUSE_PUBLIC_KEY", &mut config.public_key);
        load_env_string("LANGFUSE_SECRET_KEY", &mut config.secret_key);
        load_env_string("LANGFUSE_BASE_URL", &mut config.base_url);
        load_env_var("LANGFUSE_FLUSH_INTERVAL_MS", &mut config.flush_interval_ms)?;
        load_env_var("LANGFUSE_FLUSH_AT", &mut config.flush_at)?;
        load_env_var("LANGFUSE_MAX_QUEUE_SIZE", &mut config.max_queue_size)?;
        load_env_var("LANGFUSE_TIMEOUT_MS", &mut config.timeout_ms)?;
        load_env_string_opt("LANGFUSE_SDK_INTEGRATION", &mut config.sdk_integration);
        load_env_string("LANGFUSE_SDK_VERSION", &mut config.sdk_version);
        load_env_bool("LANGFUSE_ENABLED", &mut config.enabled)?;
        load_env_bool("LANGFUSE_DEBUG", &mut config.debug)?;
        load_env_bool("LANGFUSE_METRICS_ENABLED", &mut config.metrics_enabled)?;
        load_env_var("LANGFUSE_MAX_RETRY_ATTEMPTS", &mut config.max_retry_attempts)?;
        load_env_var("LANGFUSE_RETRY_BASE_DELAY_MS", &mut config.retry_base_delay_ms)?;
        load_env_var("LANGFUSE_RETRY_MAX_DELAY_MS", &mut config.retry_max_delay_ms)?;

        // LogLevel requires special handling for case-insensitive parsing
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.log_level = LogLevel::from_str(&log_level, true)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {log_level}")))?;
        }
        load_env_bool("LOG_JSON", &mut config.log_json)?;
        load_env_path_opt("LANGFUSE_CONFIG_FILE", &mut config.config_file);

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
