use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BANKFORM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "bankform.json";

/// Path of the config file, honouring `BANKFORM_CONFIG`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid config - {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where session data (user, cards, selected card) is kept.
    pub session_file: PathBuf,
    /// Log output; the terminal itself is taken by the UI.
    pub log_file: PathBuf,
    /// Target of the payment history export.
    pub export_file: PathBuf,
    /// Simulated round-trip time of the mock bank.
    pub api_latency_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_file: PathBuf::from("bankform-session.json"),
            log_file: PathBuf::from("bankform.log"),
            export_file: PathBuf::from("payments.csv"),
            api_latency_ms: 500,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads the config from `BANKFORM_CONFIG` or `bankform.json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_if_present(config_path())
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    /// An unreadable or invalid file is still an error, so the caller can
    /// report it once logging is up.
    pub fn load_if_present(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            result => result,
        }
    }

    pub fn api_latency(&self) -> Duration {
        Duration::from_millis(self.api_latency_ms)
    }
}
