//! Wizard host settings
//!
//! ```yaml
//! config_dir: /config
//! connect_timeout_secs: 5
//! log_level: debug
//! ```
//!
//! Every key is optional. A missing settings file yields the defaults.

use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Settings for the wizard host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WizardSettings {
    /// Directory holding `.storage/`
    pub config_dir: PathBuf,
    /// Upper bound for the gateway reachability probe
    pub connect_timeout_secs: u64,
    /// Default tracing level when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("."),
            connect_timeout_secs: 5,
            log_level: "info".to_string(),
        }
    }
}

impl WizardSettings {
    /// Load settings from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {:?} not found, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        Self::from_yaml(&content, path)
    }

    /// Parse settings from YAML text; `source_path` is only used in errors
    pub fn from_yaml(content: &str, source_path: &Path) -> ConfigResult<Self> {
        // An empty document parses as null rather than an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
                path: source_path.to_path_buf(),
                source: e,
            })?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "connect_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "log_level".to_string(),
                reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
            });
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
