//! ScenarioBuilder - preset + overrides into a Configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::configuration::{Configuration, OverrideValue, Preset};
use crate::error::HarnessError;

/// Ordered field overrides applied on top of a preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    entries: Vec<(String, OverrideValue)>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override (later entries win for the same key)
    pub fn set(mut self, key: impl Into<String>, value: impl Into<OverrideValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, OverrideValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

pub struct ScenarioBuilder;

impl ScenarioBuilder {
    /// Build a Configuration from a preset and overrides.
    ///
    /// Every override key is checked against the documented schema before any
    /// field is written, so a bad key never yields a half-applied record.
    pub fn build(preset: Preset, overrides: &Overrides) -> Result<Configuration, HarnessError> {
        for (key, value) in overrides.iter() {
            match Configuration::field_kind(key) {
                None => {
                    return Err(HarnessError::Configuration(format!(
                        "unknown configuration field `{}` (preset {})",
                        key, preset
                    )));
                }
                Some(kind) if kind != value.kind() => {
                    return Err(HarnessError::Configuration(format!(
                        "field `{}` expects a {:?} value, got `{}`",
                        key, kind, value
                    )));
                }
                Some(_) => {}
            }
        }

        let mut config = Configuration::preset(preset);
        for (key, value) in overrides.iter() {
            config.set(key, value)?;
        }

        debug!(
            preset = %preset,
            overrides = overrides.len(),
            start_year = config.start_year,
            "Configuration built"
        );
        Ok(config)
    }
}
