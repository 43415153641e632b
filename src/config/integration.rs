//! Integration descriptor for the tracing network.
//!
//! Persisted by the settings surface as camelCase JSON. Missing or
//! unreadable settings fall back to the disconnected default, which puts
//! the gateway in simulation mode.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STATION_CODE: &str = "JED";
pub const DEFAULT_AGENT_ID: &str = "SGS_SYS";
pub const DEFAULT_AIRLINE_CODE: &str = "SV";
pub const DEFAULT_BASE_URL: &str = "https://api.worldtracer.aero/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrationConfig {
    #[serde(rename = "isConnected")]
    pub connected: bool,
    pub api_key: String,
    pub station_code: String,
    pub agent_id: String,
    pub airline_code: String,
    pub base_url: String,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            connected: false,
            api_key: String::new(),
            station_code: DEFAULT_STATION_CODE.to_string(),
            agent_id: DEFAULT_AGENT_ID.to_string(),
            airline_code: DEFAULT_AIRLINE_CODE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl IntegrationConfig {
    /// Live mode descriptor pointing at `base_url`.
    pub fn connected_to(base_url: &str, api_key: &str) -> Self {
        Self {
            connected: true,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw, &path.display().to_string())
    }

    /// Load persisted settings, or the default when absent or corrupt.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!(
                "INTEGRATION_CONFIG_DEFAULT reason=missing path={}",
                path.display()
            );
            return Self::default();
        }
        match Self::from_json_file(path) {
            Ok(config) => {
                log::info!(
                    "INTEGRATION_CONFIG_LOADED connected={} station={} airline={}",
                    config.connected,
                    config.station_code,
                    config.airline_code
                );
                config
            }
            Err(e) => {
                log::warn!("INTEGRATION_CONFIG_DEFAULT reason=unreadable error={}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// The descriptor with the API key hidden, for logs and admin views.
    pub fn redacted(&self) -> Self {
        let api_key = if self.api_key.is_empty() {
            String::new()
        } else {
            "***".to_string()
        };
        Self {
            api_key,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_simulation_mode() {
        let config = IntegrationConfig::default();
        assert!(!config.connected);
        assert_eq!(config.station_code, "JED");
        assert_eq!(config.agent_id, "SGS_SYS");
        assert_eq!(config.airline_code, "SV");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_parse_persisted_camel_case() {
        let raw = r#"{
            "isConnected": true,
            "apiKey": "k-123",
            "stationCode": "RUH",
            "agentId": "AGENT7",
            "airlineCode": "SV",
            "baseUrl": "https://wt.example/v1"
        }"#;
        let config = IntegrationConfig::from_json_str(raw, "inline").unwrap();
        assert!(config.connected);
        assert_eq!(config.api_key, "k-123");
        assert_eq!(config.station_code, "RUH");
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let config = IntegrationConfig::from_json_str(r#"{"isConnected": true}"#, "inline").unwrap();
        assert!(config.connected);
        assert_eq!(config.station_code, "JED");
    }

    #[test]
    fn test_corrupt_settings_rejected() {
        let result = IntegrationConfig::from_json_str("{not json", "inline");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_or_default_on_missing_and_corrupt_file() {
        let dir = std::env::temp_dir().join(format!("wt-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.json");
        assert_eq!(IntegrationConfig::load_or_default(&missing), IntegrationConfig::default());

        let corrupt = dir.join("corrupt.json");
        fs::write(&corrupt, "][").unwrap();
        assert_eq!(IntegrationConfig::load_or_default(&corrupt), IntegrationConfig::default());

        let saved = dir.join("saved.json");
        let config = IntegrationConfig::connected_to("https://wt.example/v1/", "secret");
        config.save(&saved).unwrap();
        assert_eq!(IntegrationConfig::load_or_default(&saved), config);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_redacted_hides_key() {
        let config = IntegrationConfig::connected_to("https://wt.example", "secret");
        assert_eq!(config.redacted().api_key, "***");
        assert_eq!(config.base_url, "https://wt.example");
    }
}
