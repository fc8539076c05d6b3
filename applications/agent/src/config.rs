/// Agent configuration
use crate::error::{AgentError, Result};
use meterline_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    pub backend: BackendSettings,

    pub operator: OperatorSettings,

    #[serde(default = "default_sync")]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendSettings {
    /// Base URL of the billing backend (e.g., "https://portal.example.com")
    pub url: String,

    /// File the host app writes the current access token into.
    pub token_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperatorSettings {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: u64,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_multiplier")]
    pub retry_multiplier: u32,

    #[serde(default = "default_periodic_interval_secs")]
    pub periodic_interval_secs: u64,

    #[serde(default = "default_enabled")]
    pub sync_on_wifi: bool,
}

impl AgentConfig {
    /// Load configuration from file and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("meterline.toml"));
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        }

        // Override with environment variables (prefixed with METERLINE_)
        settings = settings.add_source(
            config::Environment::with_prefix("METERLINE")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.url.is_empty() {
            return Err(AgentError::Config(
                "Backend URL is required (set METERLINE__BACKEND__URL)".to_string(),
            ));
        }

        if self.operator.id.is_empty() {
            return Err(AgentError::Config(
                "Operator id is required (set METERLINE__OPERATOR__ID)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            sync_enabled: self.sync.enabled,
            periodic_interval: Duration::from_secs(self.sync.periodic_interval_secs),
            batch_threshold: self.sync.batch_threshold,
            sync_on_wifi: self.sync.sync_on_wifi,
            max_retry_attempts: self.sync.max_retry_attempts,
            retry_base_delay: Duration::from_millis(self.sync.retry_base_delay_ms),
            retry_multiplier: self.sync.retry_multiplier,
        }
    }
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/meterline.db".to_string()
}

fn default_sync() -> SyncSettings {
    SyncSettings {
        enabled: default_enabled(),
        batch_threshold: default_batch_threshold(),
        max_retry_attempts: default_max_retry_attempts(),
        retry_base_delay_ms: default_retry_base_delay_ms(),
        retry_multiplier: default_retry_multiplier(),
        periodic_interval_secs: default_periodic_interval_secs(),
        sync_on_wifi: default_enabled(),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_batch_threshold() -> u64 {
    50
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

fn default_retry_multiplier() -> u32 {
    2
}

fn default_periodic_interval_secs() -> u64 {
    60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AgentConfig {
        AgentConfig {
            storage: default_storage(),
            backend: BackendSettings {
                url: "https://portal.example.com".to_string(),
                token_file: PathBuf::from("/tmp/token"),
            },
            operator: OperatorSettings {
                id: "op-1".to_string(),
                name: String::new(),
            },
            sync: default_sync(),
        }
    }

    #[test]
    fn validate_accepts_minimal_config() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_backend_url() {
        let mut config = minimal();
        config.backend.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn sync_defaults_match_production_policy() {
        let sync = minimal().sync_config();
        assert_eq!(sync.batch_threshold, 50);
        assert_eq!(sync.max_retry_attempts, 3);
        assert_eq!(sync.retry_base_delay, Duration::from_millis(2000));
        assert_eq!(sync.periodic_interval, Duration::from_secs(3600));
    }
}
