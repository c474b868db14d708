use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::normalize::DenyList;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HarnessConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    /// hourly | daily | never
    pub rotation: String,
    pub suite: SuiteSettings,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "simclimat_parity.log".to_string(),
            use_json: false,
            rotation: "never".to_string(),
            suite: SuiteSettings::default(),
        }
    }
}

/// Suite execution settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SuiteSettings {
    /// Overrides the horizon of every scenario when set
    pub horizon_years: Option<f64>,
    pub reference_timeout_ms: u64,
    /// Input/output channel capacity of the reference engine
    pub channel_capacity: usize,
    /// Pin a historical deny-list revision; latest when unset
    pub deny_list_version: Option<u32>,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            horizon_years: None,
            reference_timeout_ms: 30_000,
            channel_capacity: 4,
            deny_list_version: None,
        }
    }
}

impl SuiteSettings {
    /// Deny-list this suite normalizes under
    pub fn deny_list(&self) -> Result<DenyList, ConfigError> {
        match self.deny_list_version {
            None => Ok(DenyList::current().clone()),
            Some(v) => DenyList::revision(v)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown deny_list_version {}", v))),
        }
    }
}

impl HarnessConfig {
    /// Load `config/{env}.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(format!("config/{}.yaml", env))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.rotation.as_str(), "hourly" | "daily" | "never") {
            return Err(ConfigError::Invalid(format!(
                "rotation must be hourly, daily or never, got {:?}",
                self.rotation
            )));
        }
        if self.suite.reference_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "suite.reference_timeout_ms must be positive".to_string(),
            ));
        }
        if self.suite.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "suite.channel_capacity must be positive".to_string(),
            ));
        }
        if let Some(years) = self.suite.horizon_years {
            if !(years.is_finite() && years > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "suite.horizon_years must be a positive number, got {}",
                    years
                )));
            }
        }
        self.suite.deny_list()?;
        Ok(())
    }
}
