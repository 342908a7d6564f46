use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - API key is present and non-empty
/// - Quota ceilings and window lengths are non-zero
/// - Worker pool, poll cadence and retry budget are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.service.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "service.api_key cannot be empty".to_string(),
        ));
    }

    if config.quota.rapid_ceiling == 0 || config.quota.prolonged_ceiling == 0 {
        return Err(ConfigError::ValidationError(
            "quota ceilings cannot be 0".to_string(),
        ));
    }
    if config.quota.rapid_window_secs == 0 || config.quota.prolonged_window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "quota window lengths cannot be 0".to_string(),
        ));
    }

    if config.batch.worker_count == 0 {
        return Err(ConfigError::ValidationError(
            "batch.worker_count cannot be 0".to_string(),
        ));
    }
    if config.batch.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "batch.poll_interval_ms cannot be 0".to_string(),
        ));
    }
    if config.batch.max_poll_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "batch.max_poll_attempts cannot be 0".to_string(),
        ));
    }
    if config.batch.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "batch.retry.max_attempts cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[service]
api_key = "test-key"

[output]
root = "/data/models"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_api_key_fails() {
        let mut config = valid_config();
        config.service.api_key = "  ".to_string();
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_ceiling_fails() {
        let mut config = valid_config();
        config.quota.rapid_ceiling = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_window_fails() {
        let mut config = valid_config();
        config.quota.prolonged_window_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = valid_config();
        config.batch.worker_count = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_retry_budget_fails() {
        let mut config = valid_config();
        config.batch.retry.max_attempts = 0;
        assert!(validate_config(&config).is_err());
    }
}
