mod env;
mod settings;
mod validation;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use settings::{Config, DEFAULT_BASE_URL};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
    #[error("Argument error: {0}")]
    ArgsError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Called after each flush with the per-item success and error counts.
pub type FlushCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Called when events are rejected because the queue is full.
pub type DropCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Runtime hooks. Not part of any serialized or CLI configuration.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_event_flushed: Option<FlushCallback>,
    pub on_event_dropped: Option<DropCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_event_flushed", &self.on_event_flushed.is_some())
            .field("on_event_dropped", &self.on_event_dropped.is_some())
            .finish()
    }
}
