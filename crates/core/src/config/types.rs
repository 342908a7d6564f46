use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::batch::BatchConfig;
use crate::quota::QuotaConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    pub output: OutputConfig,
}

/// Remote modeling service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API token, attached as `Authorization: Token {api_key}`
    pub api_key: String,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_base_url() -> String {
    "https://swissmodel.expasy.org".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Root directory model artifacts are filed under
    pub root: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[service]
api_key = "test-key"

[output]
root = "/data/models"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.service.api_key, "test-key");
        assert_eq!(config.service.base_url, "https://swissmodel.expasy.org");
        assert_eq!(config.service.timeout_secs, 30);
        assert_eq!(config.output.root.to_str().unwrap(), "/data/models");
        // Defaulted sections.
        assert_eq!(config.quota.rapid_ceiling, 100);
        assert_eq!(config.batch.worker_count, 5);
    }

    #[test]
    fn test_deserialize_missing_api_key_fails() {
        let toml = r#"
[service]
base_url = "https://example.org"

[output]
root = "/data/models"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_missing_output_fails() {
        let toml = r#"
[service]
api_key = "test-key"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[service]
base_url = "https://staging.example.org/"
api_key = "test-key"
timeout_secs = 60

[quota]
rapid_ceiling = 50
rapid_window_secs = 30
prolonged_ceiling = 500
prolonged_window_secs = 7200

[batch]
worker_count = 3
poll_interval_ms = 5000
max_poll_attempts = 100

[output]
root = "/srv/models"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.service.timeout_secs, 60);
        assert_eq!(config.quota.rapid_ceiling, 50);
        assert_eq!(config.quota.prolonged_window_secs, 7200);
        assert_eq!(config.batch.worker_count, 3);
        assert_eq!(config.batch.max_poll_attempts, 100);
    }
}
