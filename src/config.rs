//! Configuration for the ListGenie analytics collector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the collector CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Collection endpoint events are POSTed to
    pub endpoint: String,

    /// Per-request timeout
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// Period of time-on-page reports
    #[serde(with = "duration_serde")]
    pub time_on_page_interval: Duration,

    /// Directory holding the pending queue, session and delivery stats
    pub data_path: PathBuf,

    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_filter: String,

    /// Whether recording is currently paused
    pub paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("listgenie-analytics");

        Self {
            endpoint: "http://127.0.0.1:8080/collect".to_string(),
            request_timeout: Duration::from_secs(10),
            time_on_page_interval: Duration::from_secs(30),
            data_path: data_dir,
            log_filter: "listgenie_analytics=info,listgenie_beacon=info".to_string(),
            paused: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("listgenie-analytics")
            .join("config.json")
    }

    /// Durable store holding the pending queue.
    pub fn local_store_path(&self) -> PathBuf {
        self.data_path.join("local_storage.json")
    }

    /// Session-scoped store holding the session id.
    pub fn session_store_path(&self) -> PathBuf {
        self.data_path.join("session_storage.json")
    }

    /// Accumulated delivery statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("delivery_stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
