use super::{Config, ConfigError};
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Credentials
        if self.public_key.is_empty() {
            return Err(ConfigError::MissingField {
                field: "public_key",
            });
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::MissingField {
                field: "secret_key",
            });
        }

        // Base URL
        if self.base_url.is_empty() {
            return Err(ConfigError::MissingField { field: "base_url" });
        }
        Url::parse(&self.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;

        // Batch thresholds
        if self.flush_at == 0 {
            return Err(ConfigError::InvalidValue {
                field: "flush_at",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_queue_size",
                message: "must be greater than 0".to_string(),
            });
        }

        // Timers
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "flush_interval_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::new("pk-lf-test", "sk-lf-test")
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_keys_rejected() {
        let mut config = valid();
        config.public_key.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField {
                field: "public_key"
            })
        ));

        let mut config = valid();
        config.secret_key.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField {
                field: "secret_key"
            })
        ));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = valid().with_base_url("not a url");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_zero_thresholds_rejected() {
        let mut config = valid();
        config.flush_at = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "flush_at",
                ..
            })
        ));

        let mut config = valid();
        config.max_queue_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "max_queue_size",
                ..
            })
        ));

        let mut config = valid();
        config.flush_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
