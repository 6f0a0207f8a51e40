use crate::config::LogLevel;
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::{Mutex, Once};
use thiserror::Error;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose request-level chatter is capped at `warn`.
const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "reqwest=warn", "h2=warn", "rustls=warn"];

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid filter directive '{directive}': {message}")]
    InvalidDirective { directive: String, message: String },
    #[error("Failed to build filter '{filter}': {message}")]
    FilterFailed { filter: String, message: String },
    #[error("Failed to install global subscriber: {0}")]
    InstallFailed(String),
}

pub struct LoggingSystem {
    directives: RwLock<Vec<Directive>>,
    json: bool,
}

impl LoggingSystem {
    pub fn new(json: bool) -> Self {
        Self {
            directives: RwLock::new(Vec::new()),
            json,
        }
    }

    pub fn add_directive(&self, directive: &str) -> Result<(), LoggingError> {
        let parsed =
            Directive::from_str(directive).map_err(|e| LoggingError::InvalidDirective {
                directive: directive.to_string(),
                message: e.to_string(),
            })?;
        self.directives.write().push(parsed);
        Ok(())
    }

    pub fn add_default_directives(&self) -> Result<(), LoggingError> {
        for directive in DEFAULT_DIRECTIVES {
            self.add_directive(directive)?;
        }
        Ok(())
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();
        let mut parts = Vec::with_capacity(directives.len() + 1);
        parts.push(default_level.as_str().to_string());
        parts.extend(directives.iter().map(ToString::to_string));
        parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    /// Installs the global subscriber. `RUST_LOG`, when set, replaces the
    /// configured level.
    pub fn initialize_tracing(&self, default_level: LogLevel) -> Result<(), LoggingError> {
        let filter = match std::env::var("RUST_LOG") {
            Ok(from_env) if !from_env.trim().is_empty() => from_env,
            _ => self.build_filter_string(default_level),
        };
        let env_filter = EnvFilter::try_new(&filter).map_err(|e| LoggingError::FilterFailed {
            filter: filter.clone(),
            message: e.to_string(),
        })?;

        let result = if self.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr)
                        .compact(),
                )
                .try_init()
        };

        result.map_err(|e| LoggingError::InstallFailed(e.to_string()))
    }
}

/// Installs logging once per process; later calls report the first outcome.
pub fn setup_logging(level: LogLevel, json: bool) -> Result<(), LoggingError> {
    static INIT: Once = Once::new();
    static INIT_ERROR: Mutex<Option<String>> = Mutex::new(None);

    INIT.call_once(|| {
        let logging_system = LoggingSystem::new(json);
        let result = logging_system
            .add_default_directives()
            .and_then(|()| logging_system.initialize_tracing(level));

        if let Err(e) = result
            && let Ok(mut slot) = INIT_ERROR.lock()
        {
            *slot = Some(e.to_string());
        }
    });

    match INIT_ERROR.lock() {
        Ok(slot) => match slot.as_ref() {
            Some(message) => Err(LoggingError::InstallFailed(message.clone())),
            None => Ok(()),
        },
        Err(_) => Err(LoggingError::InstallFailed(
            "logging state poisoned".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let logging_system = LoggingSystem::new(false);
        logging_system.add_default_directives().unwrap();
        assert_eq!(logging_system.directive_count(), DEFAULT_DIRECTIVES.len());

        let filter = logging_system.build_filter_string(LogLevel::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        let logging_system = LoggingSystem::new(false);
        let result = logging_system.add_directive("reqwest=loud");
        assert!(matches!(
            result,
            Err(LoggingError::InvalidDirective { .. })
        ));
        assert_eq!(logging_system.directive_count(), 0);
    }

    #[test]
    fn test_empty_filter_is_just_the_level() {
        let logging_system = LoggingSystem::new(true);
        assert_eq!(logging_system.build_filter_string(LogLevel::Warn), "warn");
    }

    #[test]
    fn test_setup_logging_is_repeatable() {
        // Another test binary may already own the global subscriber.
        let first = setup_logging(LogLevel::Info, false);
        let second = setup_logging(LogLevel::Debug, true);
        assert_eq!(first.is_ok(), second.is_ok());
    }
}
